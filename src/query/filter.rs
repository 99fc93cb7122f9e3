use std::str::FromStr;

use sea_orm::{
    ColumnTrait, Condition, Value,
    sea_query::{Expr, LikeExpr, SimpleExpr},
};
use serde_json::{Map, Value as JsonValue};

use super::value::{compare_json, json_eq, json_scalar, json_to_value, value_to_json};
use crate::error::{ClientError, ClientResult};

/// A predicate on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(Value),
    Not(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    IsNull,
    IsNotNull,
}

impl Filter {
    fn into_expr<C: ColumnTrait>(self, column: C) -> SimpleExpr {
        match self {
            Filter::Equals(v) => column.eq(v),
            Filter::Not(v) => column.ne(v),
            Filter::In(values) if values.is_empty() => never(),
            Filter::In(values) => column.is_in(values),
            Filter::NotIn(values) if values.is_empty() => Expr::cust("1 = 1"),
            Filter::NotIn(values) => column.is_not_in(values),
            Filter::Lt(v) => column.lt(v),
            Filter::Lte(v) => column.lte(v),
            Filter::Gt(v) => column.gt(v),
            Filter::Gte(v) => column.gte(v),
            Filter::Contains(s) => column.like(like(format!("%{}%", escape_like(&s)))),
            Filter::StartsWith(s) => column.like(like(format!("{}%", escape_like(&s)))),
            Filter::EndsWith(s) => column.like(like(format!("%{}", escape_like(&s)))),
            Filter::IsNull => column.is_null(),
            Filter::IsNotNull => column.is_not_null(),
        }
    }

    /// The filter in its JSON argument shape, e.g. `{ "gte": 10 }`.
    pub fn to_json(&self) -> JsonValue {
        let list = |values: &[Value]| JsonValue::Array(values.iter().map(value_to_json).collect());
        let (op, arg) = match self {
            Filter::Equals(v) => ("equals", value_to_json(v)),
            Filter::Not(v) => ("not", value_to_json(v)),
            Filter::In(values) => ("in", list(values)),
            Filter::NotIn(values) => ("notIn", list(values)),
            Filter::Lt(v) => ("lt", value_to_json(v)),
            Filter::Lte(v) => ("lte", value_to_json(v)),
            Filter::Gt(v) => ("gt", value_to_json(v)),
            Filter::Gte(v) => ("gte", value_to_json(v)),
            Filter::Contains(s) => ("contains", JsonValue::from(s.as_str())),
            Filter::StartsWith(s) => ("startsWith", JsonValue::from(s.as_str())),
            Filter::EndsWith(s) => ("endsWith", JsonValue::from(s.as_str())),
            Filter::IsNull => ("equals", JsonValue::Null),
            Filter::IsNotNull => ("not", JsonValue::Null),
        };
        JsonValue::Object(Map::from_iter([(op.to_string(), arg)]))
    }

    /// Evaluate against an already materialized JSON value (aggregates, `having`).
    pub fn matches(&self, actual: &JsonValue) -> bool {
        use std::cmp::Ordering::*;

        let cmp = |v: &Value| compare_json(actual, &value_to_json(v));
        let text = actual.as_str();
        match self {
            Filter::Equals(v) => json_eq(actual, &value_to_json(v)),
            Filter::Not(v) => !json_eq(actual, &value_to_json(v)),
            Filter::In(values) => values.iter().any(|v| json_eq(actual, &value_to_json(v))),
            Filter::NotIn(values) => !values.iter().any(|v| json_eq(actual, &value_to_json(v))),
            Filter::Lt(v) => !actual.is_null() && cmp(v) == Less,
            Filter::Lte(v) => !actual.is_null() && cmp(v) != Greater,
            Filter::Gt(v) => !actual.is_null() && cmp(v) == Greater,
            Filter::Gte(v) => !actual.is_null() && cmp(v) != Less,
            Filter::Contains(s) => text.is_some_and(|t| t.contains(s.as_str())),
            Filter::StartsWith(s) => text.is_some_and(|t| t.starts_with(s.as_str())),
            Filter::EndsWith(s) => text.is_some_and(|t| t.ends_with(s.as_str())),
            Filter::IsNull => actual.is_null(),
            Filter::IsNotNull => !actual.is_null(),
        }
    }
}

fn never() -> SimpleExpr {
    Expr::cust("1 = 0")
}

const LIKE_ESCAPE: char = '!';

/// Make `%`, `_` and the escape character match literally inside a LIKE pattern.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

fn like(pattern: String) -> LikeExpr {
    LikeExpr::new(pattern).escape(LIKE_ESCAPE)
}

/// Boolean filter tree over the columns of one entity.
#[derive(Debug, Clone)]
pub enum Where<C> {
    Field(C, Filter),
    And(Vec<Where<C>>),
    Or(Vec<Where<C>>),
    Not(Box<Where<C>>),
}

impl<C> Default for Where<C> {
    fn default() -> Self {
        Where::And(Vec::new())
    }
}

impl<C: ColumnTrait> Where<C> {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field(column: C, filter: Filter) -> Self {
        Where::Field(column, filter)
    }

    pub fn eq(column: C, value: impl Into<Value>) -> Self {
        Where::Field(column, Filter::Equals(value.into()))
    }

    pub fn and(self, other: Where<C>) -> Self {
        match self {
            Where::And(mut list) => {
                list.push(other);
                Where::And(list)
            }
            this => Where::And(vec![this, other]),
        }
    }

    pub fn negate(self) -> Self {
        Where::Not(Box::new(self))
    }

    /// The tree in its JSON argument shape, the inverse of `from_json`.
    pub fn to_json(&self) -> JsonValue {
        let (key, value) = match self {
            Where::Field(column, filter) => (column.as_str().to_string(), filter.to_json()),
            Where::And(list) => ("AND".to_string(), Self::list_json(list)),
            Where::Or(list) => ("OR".to_string(), Self::list_json(list)),
            Where::Not(inner) => ("NOT".to_string(), inner.to_json()),
        };
        JsonValue::Object(Map::from_iter([(key, value)]))
    }

    fn list_json(list: &[Where<C>]) -> JsonValue {
        JsonValue::Array(list.iter().map(Where::to_json).collect())
    }

    pub fn into_condition(self) -> Condition {
        match self {
            Where::Field(column, filter) => Condition::all().add(filter.into_expr(column)),
            Where::And(list) => list
                .into_iter()
                .fold(Condition::all(), |cond, w| cond.add(w.into_condition())),
            // An empty OR has no satisfied branch.
            Where::Or(list) if list.is_empty() => Condition::all().add(never()),
            Where::Or(list) => list
                .into_iter()
                .fold(Condition::any(), |cond, w| cond.add(w.into_condition())),
            Where::Not(inner) => inner.into_condition().not(),
        }
    }
}

impl<C: ColumnTrait + FromStr> Where<C> {
    /// Parse the JSON filter shape:
    /// `{ "email": "a@b.c", "price": { "gte": 10 }, "OR": [...], "NOT": {...} }`.
    pub fn from_json(json: &JsonValue) -> ClientResult<Self> {
        match json {
            JsonValue::Null => Ok(Where::all()),
            JsonValue::Object(map) => Self::from_map(map),
            other => Err(ClientError::validation(format!(
                "`where` must be an object, got {other}"
            ))),
        }
    }

    fn from_map(map: &Map<String, JsonValue>) -> ClientResult<Self> {
        let mut parts = Vec::with_capacity(map.len());
        for (key, value) in map {
            let part = match key.as_str() {
                "AND" => Where::And(Self::list(value)?),
                "OR" => Where::Or(Self::list(value)?),
                "NOT" => Where::And(Self::list(value)?).negate(),
                field => {
                    let column = parse_column::<C>(field)?;
                    field_filter(column, value)?
                }
            };
            parts.push(part);
        }
        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => Where::And(parts),
        })
    }

    fn list(value: &JsonValue) -> ClientResult<Vec<Self>> {
        match value {
            JsonValue::Array(items) => items.iter().map(Self::from_json).collect(),
            single => Ok(vec![Self::from_json(single)?]),
        }
    }
}

pub fn parse_column<C: ColumnTrait + FromStr>(name: &str) -> ClientResult<C> {
    C::from_str(name).map_err(|_| ClientError::validation(format!("unknown field `{name}`")))
}

fn field_filter<C: ColumnTrait>(column: C, value: &JsonValue) -> ClientResult<Where<C>> {
    let ops = match value {
        JsonValue::Null => return Ok(Where::Field(column, Filter::IsNull)),
        JsonValue::Object(ops) => ops,
        scalar => return Ok(Where::Field(column, Filter::Equals(json_to_value(column, scalar)?))),
    };

    let typed = |v: &JsonValue| json_to_value(column, v);
    let mut parts = Vec::with_capacity(ops.len());
    for (op, arg) in ops {
        if op == "not" && arg.is_object() {
            parts.push(field_filter(column, arg)?.negate());
            continue;
        }
        let filter = op_filter(op, arg, &typed)?.ok_or_else(|| {
            ClientError::validation(format!(
                "unknown filter `{op}` on field `{}`",
                column.as_str()
            ))
        })?;
        parts.push(Where::Field(column, filter));
    }

    Ok(match parts.len() {
        1 => parts.remove(0),
        _ => Where::And(parts),
    })
}

/// Filters over computed values, as used by `having`. A bare scalar means `equals`.
pub fn json_filters(value: &JsonValue) -> ClientResult<Vec<Filter>> {
    match value {
        JsonValue::Null => Ok(vec![Filter::IsNull]),
        JsonValue::Object(ops) => ops
            .iter()
            .map(|(op, arg)| {
                op_filter(op, arg, &json_scalar)?
                    .ok_or_else(|| ClientError::validation(format!("unknown filter `{op}`")))
            })
            .collect(),
        scalar => Ok(vec![Filter::Equals(json_scalar(scalar)?)]),
    }
}

fn op_filter(
    op: &str,
    arg: &JsonValue,
    convert: &dyn Fn(&JsonValue) -> ClientResult<Value>,
) -> ClientResult<Option<Filter>> {
    let list = |json: &JsonValue| -> ClientResult<Vec<Value>> {
        match json {
            JsonValue::Array(items) => items.iter().map(convert).collect(),
            other => Err(ClientError::validation(format!(
                "`{op}` expects a list, got {other}"
            ))),
        }
    };
    let text = |json: &JsonValue| -> ClientResult<String> {
        json.as_str()
            .map(str::to_owned)
            .ok_or_else(|| ClientError::validation(format!("`{op}` expects a string")))
    };

    let filter = match (op, arg) {
        ("equals", JsonValue::Null) => Filter::IsNull,
        ("equals", v) => Filter::Equals(convert(v)?),
        ("not", JsonValue::Null) => Filter::IsNotNull,
        ("not", v) => Filter::Not(convert(v)?),
        ("in", v) => Filter::In(list(v)?),
        ("notIn", v) => Filter::NotIn(list(v)?),
        ("lt", v) => Filter::Lt(convert(v)?),
        ("lte", v) => Filter::Lte(convert(v)?),
        ("gt", v) => Filter::Gt(convert(v)?),
        ("gte", v) => Filter::Gte(convert(v)?),
        ("contains", v) => Filter::Contains(text(v)?),
        ("startsWith", v) => Filter::StartsWith(text(v)?),
        ("endsWith", v) => Filter::EndsWith(text(v)?),
        _ => return Ok(None),
    };
    Ok(Some(filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{products, users};
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
    use serde_json::json;

    fn sql(cond: Condition) -> String {
        products::Entity::find()
            .filter(cond)
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn scalar_shorthand_means_equals() {
        let w = Where::<users::Column>::from_json(&json!({ "email": "a@b.c" })).unwrap();
        assert_eq!(
            format!("{w:?}"),
            format!("{:?}", Where::eq(users::Column::Email, "a@b.c"))
        );
    }

    #[test]
    fn null_means_is_null_and_not_null_means_is_not_null() {
        let w = Where::<users::Column>::from_json(
            &json!({ "profile_picture": null, "name": { "not": null } }),
        )
        .unwrap();
        let expected = Where::And(vec![
            Where::Field(users::Column::Name, Filter::IsNotNull),
            Where::Field(users::Column::ProfilePicture, Filter::IsNull),
        ]);
        assert_eq!(format!("{w:?}"), format!("{expected:?}"));
    }

    #[test]
    fn operators_and_combinators_render() {
        let w = Where::<products::Column>::from_json(&json!({
            "price": { "gte": 100, "lt": 500 },
            "OR": [{ "name": { "contains": "drill" } }, { "brand": "Bosch" }],
        }))
        .unwrap();
        let rendered = sql(w.into_condition());
        assert!(rendered.contains(r#""products"."price" >= 100"#));
        assert!(rendered.contains(r#""products"."price" < 500"#));
        assert!(rendered.contains("LIKE '%drill%'"));
        assert!(rendered.contains(" OR "));
    }

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(escape_like("50%_off!"), "50!%!_off!!");
        let w = Where::field(products::Column::Name, Filter::Contains("50%".into()));
        let rendered = sql(w.into_condition());
        assert!(rendered.contains("LIKE '%50!%%'"), "{rendered}");
        assert!(rendered.contains("ESCAPE"), "{rendered}");
    }

    #[test]
    fn where_to_json_reads_back_the_same_tree() {
        let source = json!({
            "price": { "gte": 100 },
            "OR": [{ "name": { "startsWith": "dr" } }, { "product_picture": { "equals": null } }],
        });
        let parsed = Where::<products::Column>::from_json(&source).unwrap();
        let again = Where::<products::Column>::from_json(&parsed.to_json()).unwrap();
        assert_eq!(format!("{parsed:?}"), format!("{again:?}"));
    }

    #[test]
    fn empty_or_matches_nothing_and_empty_in_matches_nothing() {
        assert!(sql(Where::<products::Column>::Or(vec![]).into_condition()).contains("1 = 0"));
        let w = Where::field(products::Column::Id, Filter::In(vec![]));
        assert!(sql(w.into_condition()).contains("1 = 0"));
    }

    #[test]
    fn unknown_field_or_operator_is_a_validation_error() {
        let err = Where::<users::Column>::from_json(&json!({ "nickname": "x" })).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        let err =
            Where::<users::Column>::from_json(&json!({ "name": { "like": "x" } })).unwrap_err();
        assert!(err.to_string().contains("unknown filter `like`"));
    }

    #[test]
    fn filter_matches_json_values() {
        assert!(Filter::Gt(Value::from(10i64)).matches(&json!(11)));
        assert!(!Filter::Gt(Value::from(10i64)).matches(&JsonValue::Null));
        assert!(Filter::In(vec![Value::from(1i32), Value::from(2i32)]).matches(&json!(2)));
        assert!(Filter::StartsWith("dr".into()).matches(&json!("drill")));

        let having = json_filters(&json!({ "gte": 2.5, "lt": 10 })).unwrap();
        assert!(having.iter().all(|f| f.matches(&json!(3))));
        assert!(!having.iter().all(|f| f.matches(&json!(2))));
    }
}

//! Decoding of JSON operation arguments into typed delegate arguments.

use std::str::FromStr;

use sea_orm::ColumnTrait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::{
    error::{ClientError, ClientResult},
    query::{
        AggregateSelection, FindManyArgs, GroupByArgs, GroupOrderBy, Having, Metric, OrderBy,
        SortOrder, Where, filter::json_filters, filter::parse_column,
    },
    schema::{Record, Unique},
};

static EMPTY: std::sync::LazyLock<Map<String, JsonValue>> = std::sync::LazyLock::new(Map::new);

/// View `args` as an object and reject keys the action does not accept.
pub(crate) fn object<'a>(
    args: &'a JsonValue,
    allowed: &[&str],
) -> ClientResult<&'a Map<String, JsonValue>> {
    let map = match args {
        JsonValue::Null => &*EMPTY,
        JsonValue::Object(map) => map,
        other => {
            return Err(ClientError::validation(format!(
                "arguments must be an object, got {other}"
            )));
        }
    };
    if let Some(key) = map.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ClientError::validation(format!("unknown argument `{key}`")));
    }
    Ok(map)
}

pub(crate) fn required<'a>(map: &'a Map<String, JsonValue>, key: &str) -> ClientResult<&'a JsonValue> {
    map.get(key)
        .ok_or_else(|| ClientError::validation(format!("argument `{key}` is required")))
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, value: &JsonValue) -> ClientResult<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| ClientError::validation(format!("invalid `{key}`: {e}")))
}

pub(crate) fn unique<R: Record>(map: &Map<String, JsonValue>) -> ClientResult<Unique<R>> {
    Unique::from_json(required(map, "where")?)
}

pub(crate) fn where_<R: Record>(map: &Map<String, JsonValue>) -> ClientResult<Where<R::Column>> {
    map.get("where")
        .map(Where::from_json)
        .transpose()
        .map(Option::unwrap_or_default)
}

pub(crate) fn find_many<R: Record>(map: &Map<String, JsonValue>) -> ClientResult<FindManyArgs<R>> {
    let mut args = FindManyArgs::<R>::new().filter(where_::<R>(map)?);
    if let Some(order) = map.get("orderBy") {
        args.order_by = OrderBy::list_from_json(order)?;
    }
    if let Some(cursor) = map.get("cursor") {
        args.cursor = Some(Unique::from_json(cursor)?);
    }
    if let Some(take) = map.get("take") {
        args.take = Some(take.as_i64().ok_or_else(|| {
            ClientError::validation(format!("`take` must be an integer, got {take}"))
        })?);
    }
    if let Some(skip) = map.get("skip") {
        args.skip = Some(skip.as_u64().ok_or_else(|| {
            ClientError::validation(format!("`skip` must be a non-negative integer, got {skip}"))
        })?);
    }
    if let Some(distinct) = map.get("distinct") {
        args.distinct = columns::<R::Column>(distinct)?;
    }
    Ok(args)
}

/// `"name"`, `["name", "email"]` or `{ "name": true }`.
pub(crate) fn columns<C: ColumnTrait + FromStr>(json: &JsonValue) -> ClientResult<Vec<C>> {
    match json {
        JsonValue::String(name) => Ok(vec![parse_column(name)?]),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| ClientError::validation(format!("expected a field name, got {item}")))
                    .and_then(parse_column::<C>)
            })
            .collect(),
        JsonValue::Object(map) => map
            .iter()
            .filter(|(_, on)| on.as_bool().unwrap_or(false))
            .map(|(name, _)| parse_column(name))
            .collect(),
        other => Err(ClientError::validation(format!(
            "expected field names, got {other}"
        ))),
    }
}

/// Read `_count`, `_avg`, `_sum`, `_min` and `_max` from the arguments.
pub(crate) fn aggregate_selection<C: ColumnTrait + FromStr>(
    map: &Map<String, JsonValue>,
) -> ClientResult<AggregateSelection<C>> {
    let mut selection = AggregateSelection::default();
    if let Some(count) = map.get("_count") {
        match count {
            JsonValue::Bool(on) => selection.count_all = *on,
            JsonValue::Object(fields) => {
                for (name, on) in fields {
                    if !on.as_bool().unwrap_or(false) {
                        continue;
                    }
                    if name == "_all" {
                        selection.count_all = true;
                    } else {
                        selection.count.push(parse_column(name)?);
                    }
                }
            }
            other => {
                return Err(ClientError::validation(format!(
                    "`_count` must be `true` or an object, got {other}"
                )));
            }
        }
    }
    for (key, target) in [
        ("_avg", &mut selection.avg),
        ("_sum", &mut selection.sum),
        ("_min", &mut selection.min),
        ("_max", &mut selection.max),
    ] {
        if let Some(fields) = map.get(key) {
            *target = columns(fields)?;
        }
    }
    Ok(selection)
}

fn metric<C: ColumnTrait + FromStr>(field: &str, op: &str) -> ClientResult<Metric<C>> {
    if op == "_count" && field == "_all" {
        return Ok(Metric::CountAll);
    }
    let column = parse_column::<C>(field)?;
    Ok(match op {
        "_count" => Metric::Count(column),
        "_avg" => Metric::Avg(column),
        "_sum" => Metric::Sum(column),
        "_min" => Metric::Min(column),
        "_max" => Metric::Max(column),
        other => {
            return Err(ClientError::validation(format!(
                "unknown aggregate `{other}`"
            )));
        }
    })
}

fn sort_order(json: &JsonValue) -> ClientResult<SortOrder> {
    json.as_str()
        .ok_or_else(|| ClientError::validation(format!("sort order must be a string, got {json}")))?
        .parse()
}

/// `orderBy` for groupBy: `{ "team_id": "asc" }` or `{ "_sum": { "price": "desc" } }`, or a list.
fn group_order<C: ColumnTrait + FromStr>(json: &JsonValue) -> ClientResult<Vec<GroupOrderBy<C>>> {
    let mut out = Vec::new();
    match json {
        JsonValue::Array(items) => {
            for item in items {
                out.extend(group_order(item)?);
            }
        }
        JsonValue::Object(map) => {
            for (key, value) in map {
                if key.starts_with('_') {
                    let fields = value.as_object().ok_or_else(|| {
                        ClientError::validation(format!("`{key}` in `orderBy` must be an object"))
                    })?;
                    for (field, dir) in fields {
                        out.push(GroupOrderBy {
                            metric: metric(field, key)?,
                            order: sort_order(dir)?,
                        });
                    }
                } else {
                    out.push(GroupOrderBy {
                        metric: Metric::Field(parse_column(key)?),
                        order: sort_order(value)?,
                    });
                }
            }
        }
        other => {
            return Err(ClientError::validation(format!(
                "`orderBy` must be an object or a list, got {other}"
            )));
        }
    }
    Ok(out)
}

/// `having`: `{ "price": { "_avg": { "gt": 10 } }, "team_id": "..." }`.
fn having<C: ColumnTrait + FromStr>(json: &JsonValue) -> ClientResult<Vec<Having<C>>> {
    let map = json
        .as_object()
        .ok_or_else(|| ClientError::validation("`having` must be an object"))?;
    let mut out = Vec::new();
    for (field, condition) in map {
        let aggregated = condition
            .as_object()
            .filter(|ops| ops.keys().any(|k| k.starts_with('_')));
        match aggregated {
            Some(ops) => {
                for (op, filters) in ops {
                    let metric = metric::<C>(field, op)?;
                    for filter in json_filters(filters)? {
                        out.push(Having { metric, filter });
                    }
                }
            }
            None => {
                let column = parse_column::<C>(field)?;
                for filter in json_filters(condition)? {
                    out.push(Having {
                        metric: Metric::Field(column),
                        filter,
                    });
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn group_by<R: Record>(map: &Map<String, JsonValue>) -> ClientResult<GroupByArgs<R>> {
    let by = columns::<R::Column>(required(map, "by")?)?;
    let mut args = GroupByArgs::<R>::new(by)
        .filter(where_::<R>(map)?)
        .select(aggregate_selection(map)?);
    if let Some(json) = map.get("having") {
        args.having = having(json)?;
    }
    if let Some(json) = map.get("orderBy") {
        args.order_by = group_order(json)?;
    }
    if let Some(take) = map.get("take") {
        args.take = Some(
            take.as_i64()
                .ok_or_else(|| ClientError::validation("`take` must be an integer"))?,
        );
    }
    if let Some(skip) = map.get("skip") {
        args.skip = Some(
            skip.as_u64()
                .ok_or_else(|| ClientError::validation("`skip` must be a non-negative integer"))?,
        );
    }
    Ok(args)
}

/// Field list for `count`: `select: true`, `select: { "_all": true, "email": true }`.
pub(crate) fn count_select<C: ColumnTrait + FromStr>(
    map: &Map<String, JsonValue>,
) -> ClientResult<Option<Vec<C>>> {
    match map.get("select") {
        None | Some(JsonValue::Bool(false)) => Ok(None),
        Some(JsonValue::Bool(true)) => Ok(Some(Vec::new())),
        Some(JsonValue::Object(fields)) => fields
            .iter()
            .filter(|(name, on)| name.as_str() != "_all" && on.as_bool().unwrap_or(false))
            .map(|(name, _)| parse_column(name))
            .collect::<ClientResult<Vec<C>>>()
            .map(Some),
        Some(other) => Err(ClientError::validation(format!(
            "`select` in `count` must be `true` or an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Products, products::Column};
    use sea_orm::IdenStatic;
    use serde_json::json;

    fn column_names<C: IdenStatic>(columns: &[C]) -> Vec<String> {
        columns.iter().map(|c| c.as_str().to_string()).collect()
    }

    #[test]
    fn find_many_args_decode() {
        let args = json!({
            "where": { "price": { "gt": 10 } },
            "orderBy": [{ "name": "desc" }],
            "take": -2,
            "skip": 1,
            "distinct": ["brand"]
        });
        let map = object(&args, &["where", "orderBy", "take", "skip", "distinct"]).unwrap();
        let parsed = find_many::<Products>(map).unwrap();
        assert_eq!(parsed.take, Some(-2));
        assert_eq!(parsed.skip, Some(1));
        assert_eq!(column_names(&parsed.distinct), ["brand"]);
        assert_eq!(parsed.order_by[0].order, SortOrder::Desc);
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let args = json!({ "where": {}, "limit": 3 });
        let err = object(&args, &["where"]).unwrap_err();
        assert!(err.to_string().contains("unknown argument `limit`"));
    }

    #[test]
    fn aggregate_selection_decodes_every_section() {
        let args = json!({
            "_count": { "_all": true, "product_picture": true },
            "_avg": { "price": true },
            "_max": ["quantity"]
        });
        let map = args.as_object().unwrap();
        let selection = aggregate_selection::<Column>(map).unwrap();
        assert!(selection.count_all);
        assert_eq!(column_names(&selection.count), ["product_picture"]);
        assert_eq!(column_names(&selection.avg), ["price"]);
        assert_eq!(column_names(&selection.max), ["quantity"]);
    }

    #[test]
    fn group_by_decodes_having_and_aggregate_order() {
        let args = json!({
            "by": ["category_id"],
            "_sum": { "price": true },
            "having": { "price": { "_sum": { "gt": 100 } } },
            "orderBy": { "_sum": { "price": "desc" } }
        });
        let parsed = group_by::<Products>(args.as_object().unwrap()).unwrap();
        assert_eq!(column_names(&parsed.by), ["category_id"]);
        assert!(matches!(parsed.having[0].metric, Metric::Sum(_)));
        assert!(matches!(parsed.order_by[0].metric, Metric::Sum(_)));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn group_by_json_shape_parses_back() {
        let args = json!({
            "by": ["category_id"],
            "where": { "price": { "gte": 10 } },
            "_count": { "_all": true },
            "_sum": { "price": true },
            "having": { "price": { "_sum": { "gt": 100 } }, "_all": { "_count": { "gte": 2 } } },
            "orderBy": [{ "_sum": { "price": "desc" } }, { "category_id": "asc" }],
            "take": 5
        });
        let parsed = group_by::<Products>(args.as_object().unwrap()).unwrap();
        let written = parsed.to_json();
        let again = group_by::<Products>(written.as_object().unwrap()).unwrap();
        assert_eq!(again.to_json(), written);
        assert_eq!(written["having"]["price"], json!({ "_sum": { "gt": 100 } }));
    }

    #[test]
    fn group_by_scalar_order_outside_by_fails_validation() {
        let args = json!({ "by": ["category_id"], "orderBy": { "name": "asc" } });
        let parsed = group_by::<Products>(args.as_object().unwrap()).unwrap();
        assert!(matches!(parsed.validate(), Err(ClientError::Validation(_))));
    }
}

use sea_orm::{
    ColumnTrait, Value,
    sea_query::{Expr, SimpleExpr},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;

use super::{filter::Where, order::OrderBy};
use crate::schema::{Record, Unique};

/// Arguments shared by `find_many`, `find_first` and the aggregate family.
pub struct FindManyArgs<R: Record> {
    pub where_: Where<R::Column>,
    pub order_by: Vec<OrderBy<R::Column>>,
    /// Page starts at this row, inclusive, in the requested ordering.
    pub cursor: Option<Unique<R>>,
    /// Negative values take from the end of the ordering.
    pub take: Option<i64>,
    pub skip: Option<u64>,
    pub distinct: Vec<R::Column>,
}

impl<R: Record> Default for FindManyArgs<R> {
    fn default() -> Self {
        Self {
            where_: Where::all(),
            order_by: Vec::new(),
            cursor: None,
            take: None,
            skip: None,
            distinct: Vec::new(),
        }
    }
}

impl<R: Record> Clone for FindManyArgs<R> {
    fn clone(&self) -> Self {
        Self {
            where_: self.where_.clone(),
            order_by: self.order_by.clone(),
            cursor: self.cursor.clone(),
            take: self.take,
            skip: self.skip,
            distinct: self.distinct.clone(),
        }
    }
}

impl<R: Record> std::fmt::Debug for FindManyArgs<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FindManyArgs")
            .field("where", &self.where_)
            .field("order_by", &self.order_by)
            .field("cursor", &self.cursor)
            .field("take", &self.take)
            .field("skip", &self.skip)
            .field("distinct", &self.distinct)
            .finish()
    }
}

impl<R: Record> FindManyArgs<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, where_: Where<R::Column>) -> Self {
        self.where_ = where_;
        self
    }

    pub fn order_by(mut self, order: OrderBy<R::Column>) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn cursor(mut self, cursor: impl Into<Unique<R>>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn distinct(mut self, columns: impl IntoIterator<Item = R::Column>) -> Self {
        self.distinct.extend(columns);
        self
    }

    /// The arguments in their JSON shape, as middleware sees them.
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        self.write_json(&mut map);
        JsonValue::Object(map)
    }

    pub(crate) fn write_json(&self, map: &mut Map<String, JsonValue>) {
        map.insert("where".into(), self.where_.to_json());
        if !self.order_by.is_empty() {
            let order: Vec<JsonValue> = self.order_by.iter().map(OrderBy::to_json).collect();
            map.insert("orderBy".into(), JsonValue::Array(order));
        }
        if let Some(cursor) = &self.cursor {
            map.insert("cursor".into(), cursor.to_json());
        }
        if let Some(take) = self.take {
            map.insert("take".into(), take.into());
        }
        if let Some(skip) = self.skip {
            map.insert("skip".into(), skip.into());
        }
        if !self.distinct.is_empty() {
            map.insert("distinct".into(), column_names(&self.distinct));
        }
    }
}

impl<R: Record> From<Where<R::Column>> for FindManyArgs<R> {
    fn from(where_: Where<R::Column>) -> Self {
        Self::new().filter(where_)
    }
}

pub(crate) fn column_names<C: ColumnTrait>(columns: &[C]) -> JsonValue {
    JsonValue::Array(
        columns
            .iter()
            .map(|c| JsonValue::from(c.as_str().to_string()))
            .collect(),
    )
}

/// Result of bulk writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchPayload {
    pub count: u64,
}

/// Update applied to a numeric field. A bare number deserializes as `set`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberUpdate<T> {
    Set(T),
    Increment(T),
    Decrement(T),
    Multiply(T),
    Divide(T),
}

impl<T: Into<Value>> NumberUpdate<T> {
    pub fn into_expr<C: ColumnTrait>(self, column: C) -> SimpleExpr {
        match self {
            NumberUpdate::Set(v) => SimpleExpr::Value(v.into()),
            NumberUpdate::Increment(v) => Expr::col(column).add(v.into()),
            NumberUpdate::Decrement(v) => Expr::col(column).sub(v.into()),
            NumberUpdate::Multiply(v) => Expr::col(column).mul(v.into()),
            NumberUpdate::Divide(v) => Expr::col(column).div(v.into()),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for NumberUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        enum Op<V> {
            Set(V),
            Increment(V),
            Decrement(V),
            Multiply(V),
            Divide(V),
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<V> {
            Plain(V),
            Op(Op<V>),
        }

        Ok(match Repr::<T>::deserialize(deserializer)? {
            Repr::Plain(v) | Repr::Op(Op::Set(v)) => NumberUpdate::Set(v),
            Repr::Op(Op::Increment(v)) => NumberUpdate::Increment(v),
            Repr::Op(Op::Decrement(v)) => NumberUpdate::Decrement(v),
            Repr::Op(Op::Multiply(v)) => NumberUpdate::Multiply(v),
            Repr::Op(Op::Divide(v)) => NumberUpdate::Divide(v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::products;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};
    use serde_json::json;

    #[test]
    fn number_update_accepts_bare_and_operator_forms() {
        let bare: NumberUpdate<i32> = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(bare, NumberUpdate::Set(4));
        let inc: NumberUpdate<i32> = serde_json::from_value(json!({ "increment": 2 })).unwrap();
        assert_eq!(inc, NumberUpdate::Increment(2));
        assert!(serde_json::from_value::<NumberUpdate<i32>>(json!({ "bump": 1 })).is_err());
    }

    #[test]
    fn increment_renders_as_column_arithmetic() {
        let stmt = products::Entity::update_many()
            .col_expr(
                products::Column::Quantity,
                NumberUpdate::Increment(3i32).into_expr(products::Column::Quantity),
            )
            .filter(products::Column::Slug.eq("drill"))
            .build(DbBackend::Sqlite)
            .to_string();
        assert!(stmt.contains(r#""quantity" = "quantity" + 3"#), "{stmt}");
    }
}

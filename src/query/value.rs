use std::cmp::Ordering;

use chrono::DateTime;
use sea_orm::{ColumnTrait, ColumnType, Value};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// Convert a JSON scalar into a bound value typed after `column`.
pub fn json_to_value<C: ColumnTrait>(column: C, json: &JsonValue) -> ClientResult<Value> {
    let mismatch = || {
        ClientError::validation(format!(
            "invalid value {json} for field `{}`",
            column.as_str()
        ))
    };

    let value = match column.def().get_column_type() {
        ColumnType::Uuid => {
            let raw = json.as_str().ok_or_else(mismatch)?;
            Value::from(Uuid::parse_str(raw).map_err(|_| mismatch())?)
        }
        ColumnType::Integer | ColumnType::SmallInteger | ColumnType::TinyInteger => {
            let raw = json.as_i64().ok_or_else(mismatch)?;
            Value::from(i32::try_from(raw).map_err(|_| mismatch())?)
        }
        ColumnType::BigInteger => Value::from(json.as_i64().ok_or_else(mismatch)?),
        ColumnType::Float | ColumnType::Double => Value::from(json.as_f64().ok_or_else(mismatch)?),
        ColumnType::Boolean => Value::from(json.as_bool().ok_or_else(mismatch)?),
        ColumnType::TimestampWithTimeZone | ColumnType::Timestamp | ColumnType::DateTime => {
            let raw = json.as_str().ok_or_else(mismatch)?;
            Value::from(DateTime::parse_from_rfc3339(raw).map_err(|_| mismatch())?)
        }
        ColumnType::String(_) | ColumnType::Text | ColumnType::Char(_) | ColumnType::Enum { .. } => {
            Value::from(json.as_str().ok_or_else(mismatch)?.to_string())
        }
        other => {
            return Err(ClientError::validation(format!(
                "unsupported column type {other:?} for field `{}`",
                column.as_str()
            )));
        }
    };
    Ok(value)
}

/// Convert a JSON scalar without a column to guide it. Used where the compared value
/// is computed rather than stored, e.g. `_avg` in `having`.
pub fn json_scalar(json: &JsonValue) -> ClientResult<Value> {
    match json {
        JsonValue::Bool(b) => Ok(Value::from(*b)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::from)
            .or_else(|| n.as_f64().map(Value::from))
            .ok_or_else(|| ClientError::validation(format!("unsupported number {n}"))),
        JsonValue::String(s) => Ok(Value::from(s.clone())),
        other => Err(ClientError::validation(format!(
            "expected a scalar, got {other}"
        ))),
    }
}

/// Render a bound value the way model payloads render the same field.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Bool(v) => v.map(JsonValue::Bool).unwrap_or(JsonValue::Null),
        Value::TinyInt(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        Value::SmallInt(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        Value::Int(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        Value::BigInt(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        Value::Float(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        Value::Double(v) => v.map(JsonValue::from).unwrap_or(JsonValue::Null),
        Value::String(v) => v
            .as_ref()
            .map(|s| JsonValue::String(s.to_string()))
            .unwrap_or(JsonValue::Null),
        Value::Uuid(v) => v
            .as_ref()
            .map(|u| JsonValue::String(u.to_string()))
            .unwrap_or(JsonValue::Null),
        Value::ChronoDateTimeWithTimeZone(v) => v
            .as_ref()
            .map(|dt| JsonValue::String(dt.to_rfc3339()))
            .unwrap_or(JsonValue::Null),
        Value::ChronoDateTimeUtc(v) => v
            .as_ref()
            .map(|dt| JsonValue::String(dt.to_rfc3339()))
            .unwrap_or(JsonValue::Null),
        other => JsonValue::String(format!("{other:?}")),
    }
}

/// Total order over payload scalars: numbers numerically, timestamps chronologically,
/// everything else by its natural order. Nulls sort first.
pub fn compare_json(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Null, _) => Ordering::Less,
        (_, JsonValue::Null) => Ordering::Greater,
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x
                    .as_f64()
                    .unwrap_or_default()
                    .total_cmp(&y.as_f64().unwrap_or_default()),
            }
        }
        (JsonValue::String(x), JsonValue::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Equality consistent with [`compare_json`], so `2024-01-01T00:00:00Z` equals
/// `2024-01-01T00:00:00+00:00`.
pub fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    compare_json(a, b) == Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{orders, products, users};
    use serde_json::json;

    #[test]
    fn json_to_value_follows_column_types() {
        let id = Uuid::new_v4();
        assert_eq!(
            json_to_value(users::Column::Id, &json!(id.to_string())).unwrap(),
            Value::from(id)
        );
        assert_eq!(
            json_to_value(products::Column::Quantity, &json!(7)).unwrap(),
            Value::from(7i32)
        );
        assert_eq!(
            json_to_value(products::Column::Price, &json!(12_000)).unwrap(),
            Value::from(12_000i64)
        );
        assert_eq!(
            json_to_value(orders::Column::OrderStatus, &json!("WAITING")).unwrap(),
            Value::from("WAITING".to_string())
        );
    }

    #[test]
    fn json_to_value_rejects_mismatched_scalars() {
        assert!(json_to_value(users::Column::Id, &json!("not-a-uuid")).is_err());
        assert!(json_to_value(products::Column::IsRentable, &json!("yes")).is_err());
        assert!(json_to_value(products::Column::Quantity, &json!(i64::MAX)).is_err());
    }

    #[test]
    fn compare_json_orders_timestamps_chronologically() {
        let earlier = json!("2024-01-01T10:00:00+02:00");
        let later = json!("2024-01-01T09:00:00+00:00");
        assert_eq!(compare_json(&earlier, &later), Ordering::Less);
        assert!(json_eq(
            &json!("2024-01-01T00:00:00Z"),
            &json!("2024-01-01T00:00:00+00:00")
        ));
    }

    #[test]
    fn compare_json_puts_nulls_first() {
        assert_eq!(compare_json(&JsonValue::Null, &json!(0)), Ordering::Less);
        assert_eq!(compare_json(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_json(&json!(2.5), &json!(2)), Ordering::Greater);
    }
}

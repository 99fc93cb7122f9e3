use std::str::FromStr;

use sea_orm::{ColumnTrait, Order};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;

use super::filter::parse_column;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn reverse(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn as_order(self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ClientError::validation(format!(
                "sort order must be `asc` or `desc`, got `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrderBy<C> {
    pub column: C,
    pub order: SortOrder,
}

impl<C> OrderBy<C> {
    pub fn asc(column: C) -> Self {
        Self {
            column,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(column: C) -> Self {
        Self {
            column,
            order: SortOrder::Desc,
        }
    }
}

impl<C: ColumnTrait> OrderBy<C> {
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(Map::from_iter([(
            self.column.as_str().to_string(),
            JsonValue::from(self.order.as_str()),
        )]))
    }
}

impl<C: ColumnTrait + FromStr> OrderBy<C> {
    /// Accepts `{ "price": "desc" }` or a list of such objects.
    pub fn list_from_json(json: &JsonValue) -> ClientResult<Vec<Self>> {
        match json {
            JsonValue::Null => Ok(Vec::new()),
            JsonValue::Array(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend(Self::list_from_json(item)?);
                }
                Ok(out)
            }
            JsonValue::Object(map) => map
                .iter()
                .map(|(field, dir)| {
                    let order = dir
                        .as_str()
                        .ok_or_else(|| {
                            ClientError::validation(format!(
                                "sort order for `{field}` must be a string"
                            ))
                        })?
                        .parse()?;
                    Ok(OrderBy {
                        column: parse_column::<C>(field)?,
                        order,
                    })
                })
                .collect(),
            other => Err(ClientError::validation(format!(
                "`orderBy` must be an object or a list, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::products;
    use sea_orm::IdenStatic;
    use serde_json::json;

    #[test]
    fn parses_object_and_list_forms() {
        let one = OrderBy::<products::Column>::list_from_json(&json!({ "price": "desc" })).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].column.as_str(), "price");
        assert_eq!(one[0].order, SortOrder::Desc);

        let many = OrderBy::<products::Column>::list_from_json(&json!([
            { "name": "asc" },
            { "created_at": "DESC" }
        ]))
        .unwrap();
        let pairs: Vec<_> = many.iter().map(|o| (o.column.as_str(), o.order)).collect();
        assert_eq!(
            pairs,
            [("name", SortOrder::Asc), ("created_at", SortOrder::Desc)]
        );
    }

    #[test]
    fn rejects_bad_direction() {
        assert!(OrderBy::<products::Column>::list_from_json(&json!({ "price": "up" })).is_err());
    }
}

//! Shapes returned rows according to `select`, `include` and `omit`.

use sea_orm::ConnectionTrait;
use serde_json::{Map, Value as JsonValue};

use super::args::decode;
use crate::{
    config::ClientConfig,
    error::{ClientError, ClientResult},
    query::filter::parse_column,
    schema::{Record, to_json},
};

#[derive(Debug, Default)]
pub(crate) struct Shape {
    /// Set when `select` was given: only these scalar fields are kept.
    scalars: Option<Vec<String>>,
    relations: Vec<String>,
    omit: Vec<String>,
}

impl Shape {
    pub(crate) fn parse<R: Record>(map: &Map<String, JsonValue>) -> ClientResult<Self> {
        let select = map.get("select");
        let include = map.get("include");
        let omit = map.get("omit");
        if select.is_some() && include.is_some() {
            return Err(ClientError::validation(
                "`select` and `include` cannot be used together",
            ));
        }
        if select.is_some() && omit.is_some() {
            return Err(ClientError::validation(
                "`select` and `omit` cannot be used together",
            ));
        }

        let mut shape = Shape::default();
        if let Some(select) = select {
            let mut scalars = Vec::new();
            for name in enabled("select", select)? {
                if R::relations().contains(&name.as_str()) {
                    shape.relations.push(name);
                } else {
                    parse_column::<R::Column>(&name)?;
                    scalars.push(name);
                }
            }
            shape.scalars = Some(scalars);
        }
        if let Some(include) = include {
            for name in enabled("include", include)? {
                if !R::relations().contains(&name.as_str()) {
                    return Err(ClientError::validation(format!(
                        "unknown relation `{name}` on {}",
                        R::NAME
                    )));
                }
                shape.relations.push(name);
            }
        }
        if let Some(omit) = omit {
            for name in enabled("omit", omit)? {
                parse_column::<R::Column>(&name)?;
                shape.omit.push(name);
            }
        }
        Ok(shape)
    }

    pub(crate) async fn render<R, D>(
        &self,
        db: &D,
        config: &ClientConfig,
        row: &R::Model,
    ) -> ClientResult<JsonValue>
    where
        R: Record,
        D: ConnectionTrait,
    {
        let mut json = to_json(row);
        let Some(object) = json.as_object_mut() else {
            return Ok(json);
        };

        match &self.scalars {
            Some(fields) => object.retain(|key, _| fields.contains(key)),
            None => {
                for field in config.omitted(R::NAME).iter().chain(&self.omit) {
                    object.remove(field);
                }
            }
        }

        for relation in &self.relations {
            let loaded = R::load_relation(db, row, relation).await?;
            let value = strip(loaded.value, config.omitted(loaded.model));
            object.insert(relation.clone(), value);
        }
        Ok(json)
    }

    pub(crate) async fn render_all<R, D>(
        &self,
        db: &D,
        config: &ClientConfig,
        rows: &[R::Model],
    ) -> ClientResult<JsonValue>
    where
        R: Record,
        D: ConnectionTrait,
    {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.render::<R, D>(db, config, row).await?);
        }
        Ok(JsonValue::Array(out))
    }
}

/// Field names switched on in `{ "name": true, "email": false }`. Nested arguments
/// on relations are not supported.
fn enabled(key: &str, json: &JsonValue) -> ClientResult<Vec<String>> {
    let fields: Map<String, JsonValue> = decode(key, json)?;
    let mut out = Vec::new();
    for (name, value) in fields {
        match value {
            JsonValue::Bool(true) => out.push(name),
            JsonValue::Bool(false) => {}
            _ => {
                return Err(ClientError::validation(format!(
                    "`{key}.{name}` must be `true` or `false`"
                )));
            }
        }
    }
    Ok(out)
}

fn strip(value: JsonValue, omitted: &[String]) -> JsonValue {
    match value {
        JsonValue::Object(mut object) => {
            for field in omitted {
                object.remove(field);
            }
            JsonValue::Object(object)
        }
        JsonValue::Array(items) => JsonValue::Array(
            items
                .into_iter()
                .map(|item| strip(item, omitted))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Users;
    use serde_json::json;

    #[test]
    fn select_and_include_are_mutually_exclusive() {
        let args = json!({ "select": { "name": true }, "include": { "team": true } });
        let err = Shape::parse::<Users>(args.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn select_splits_scalars_and_relations() {
        let args = json!({ "select": { "name": true, "cart": true, "email": false } });
        let shape = Shape::parse::<Users>(args.as_object().unwrap()).unwrap();
        assert_eq!(shape.scalars, Some(vec!["name".to_string()]));
        assert_eq!(shape.relations, ["cart"]);
    }

    #[test]
    fn unknown_relation_or_field_is_rejected() {
        let include = json!({ "include": { "orders": true } });
        assert!(Shape::parse::<Users>(include.as_object().unwrap()).is_err());
        let select = json!({ "select": { "nickname": true } });
        assert!(Shape::parse::<Users>(select.as_object().unwrap()).is_err());
    }

    #[test]
    fn strip_removes_fields_from_objects_and_lists() {
        let omitted = vec!["password".to_string()];
        let stripped = strip(
            json!([{ "name": "a", "password": "x" }, { "name": "b" }]),
            &omitted,
        );
        assert_eq!(stripped, json!([{ "name": "a" }, { "name": "b" }]));
    }
}

use serde::Serialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use crate::engine::{Action, ModelName};

/// What a response answers: the operation and how many rows or results it carries.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Meta {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn operation(model: Option<ModelName>, action: Action) -> Self {
        Self {
            model,
            action: Some(action),
            count: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Count the rows of a list payload; scalar and object payloads carry no count.
    pub fn counting(self, data: &JsonValue) -> Self {
        match data.as_array() {
            Some(rows) => self.with_count(rows.len()),
            None => self,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meta_skips_absent_fields() {
        let meta = Meta::operation(Some(ModelName::User), Action::FindMany)
            .counting(&json!([{ "id": 1 }, { "id": 2 }]));
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({ "model": "User", "action": "findMany", "count": 2 })
        );
        assert_eq!(serde_json::to_value(Meta::empty()).unwrap(), json!({}));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Every model the client knows about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum ModelName {
    TokenBlacklist,
    Team,
    User,
    Rent,
    Order,
    Product,
    OrderOnProduct,
    Category,
    Cart,
    CartOnItem,
}

impl ModelName {
    pub const ALL: [ModelName; 10] = [
        ModelName::TokenBlacklist,
        ModelName::Team,
        ModelName::User,
        ModelName::Rent,
        ModelName::Order,
        ModelName::Product,
        ModelName::OrderOnProduct,
        ModelName::Category,
        ModelName::Cart,
        ModelName::CartOnItem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::TokenBlacklist => "TokenBlacklist",
            ModelName::Team => "Team",
            ModelName::User => "User",
            ModelName::Rent => "Rent",
            ModelName::Order => "Order",
            ModelName::Product => "Product",
            ModelName::OrderOnProduct => "OrderOnProduct",
            ModelName::Category => "Category",
            ModelName::Cart => "Cart",
            ModelName::CartOnItem => "CartOnItem",
        }
    }

    /// Accessor name on the client, e.g. `orderOnProduct`.
    pub fn delegate_name(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    FindUnique,
    FindUniqueOrThrow,
    FindFirst,
    FindFirstOrThrow,
    FindMany,
    Create,
    CreateMany,
    Update,
    UpdateMany,
    Upsert,
    Delete,
    DeleteMany,
    Count,
    Aggregate,
    GroupBy,
    QueryRaw,
    ExecuteRaw,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::FindUnique => "findUnique",
            Action::FindUniqueOrThrow => "findUniqueOrThrow",
            Action::FindFirst => "findFirst",
            Action::FindFirstOrThrow => "findFirstOrThrow",
            Action::FindMany => "findMany",
            Action::Create => "create",
            Action::CreateMany => "createMany",
            Action::Update => "update",
            Action::UpdateMany => "updateMany",
            Action::Upsert => "upsert",
            Action::Delete => "delete",
            Action::DeleteMany => "deleteMany",
            Action::Count => "count",
            Action::Aggregate => "aggregate",
            Action::GroupBy => "groupBy",
            Action::QueryRaw => "queryRaw",
            Action::ExecuteRaw => "executeRaw",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Action::Create
                | Action::CreateMany
                | Action::Update
                | Action::UpdateMany
                | Action::Upsert
                | Action::Delete
                | Action::DeleteMany
                | Action::ExecuteRaw
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delegate call in descriptor form: `{ "model": "User", "action": "findMany", "args": {...} }`.
///
/// Raw SQL actions carry no model; their args are `{ "query": "...", "parameters": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelName>,
    pub action: Action,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub args: JsonValue,
}

impl Operation {
    pub fn new(model: ModelName, action: Action, args: JsonValue) -> Self {
        Self {
            model: Some(model),
            action,
            args,
        }
    }

    pub fn raw(action: Action, args: JsonValue) -> Self {
        Self {
            model: None,
            action,
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegate_name_lowercases_first_letter() {
        assert_eq!(ModelName::OrderOnProduct.delegate_name(), "orderOnProduct");
        assert_eq!(ModelName::TokenBlacklist.delegate_name(), "tokenBlacklist");
    }

    #[test]
    fn operation_parses_camel_case_actions() {
        let op: Operation = serde_json::from_value(serde_json::json!({
            "model": "CartOnItem",
            "action": "findUniqueOrThrow",
            "args": { "where": { "id": "x" } }
        }))
        .unwrap();
        assert_eq!(op.model, Some(ModelName::CartOnItem));
        assert_eq!(op.action, Action::FindUniqueOrThrow);
    }

    #[test]
    fn raw_operation_has_no_model() {
        let op: Operation = serde_json::from_value(serde_json::json!({
            "action": "queryRaw",
            "args": { "query": "SELECT 1" }
        }))
        .unwrap();
        assert!(op.model.is_none());
        assert!(!op.action.is_write());
    }
}

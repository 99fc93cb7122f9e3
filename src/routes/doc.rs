use utoipa::{
    Modify, OpenApi,
    openapi::{
        OpenApi as OpenApiSpec,
        security::{Http, HttpAuthScheme, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    engine::{Action, ModelName, Operation},
    query::{BatchPayload, SortOrder},
    response::{ApiResponse, Meta},
    routes::{auth, health, query},
};

pub const DOCS_PATH: &str = "/docs";

/// Registers the JWT scheme the query and auth routes reference as `bearer_auth`.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, spec: &mut OpenApiSpec) {
        let mut scheme = Http::new(HttpAuthScheme::Bearer);
        scheme.bearer_format = Some("JWT".to_string());
        spec.components
            .get_or_insert_with(Default::default)
            .add_security_scheme("bearer_auth", SecurityScheme::Http(scheme));
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "rental-client query server",
        description = "Runs operation descriptors (`{model, action, args}`) against the rental database."
    ),
    paths(
        health::health_check,
        health::readiness,
        query::run_query,
        query::run_batch,
        auth::revoke
    ),
    components(schemas(
        Operation,
        ModelName,
        Action,
        BatchPayload,
        SortOrder,
        Meta,
        health::HealthData,
        auth::RevokeResponse,
        ApiResponse<health::HealthData>,
        ApiResponse<auth::RevokeResponse>
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Query", description = "Operation descriptors run against the data client"),
        (name = "Auth", description = "Bearer token management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url(DOCS_PATH, ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_query_routes_and_bearer_scheme() {
        let spec = ApiDoc::openapi();
        for path in ["/health", "/health/ready", "/api/query", "/api/batch", "/api/auth/revoke"] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}

#![allow(clippy::needless_for_each)]

use super::handlers::{auth, health, me};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(health::health, me::get_me, auth::session::logout),
    components(schemas(health::Health, auth::Principal, auth::ErrorBody)),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service and dependency status"),
        (name = "users", description = "Authenticated principal"),
        (name = "auth", description = "Session management")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

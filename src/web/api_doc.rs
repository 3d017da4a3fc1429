use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::error::ErrorResponse;
use super::api::ingest::{SourceErrorRequest, SubmitResponse};
use super::api::trail::TrailStatus;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::ingest::submit_fix,
        super::api::ingest::submit_error,
        super::api::trail::trail,
        super::api::trail::live,
        super::api::trail::status,
    ),
    components(
        schemas(
            crate::trail::Fix,
            crate::trail::Advisory,
            crate::ingest::IngestStatus,
            SubmitResponse,
            SourceErrorRequest,
            TrailStatus,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Fixtrail API",
        description = "API for submitting GPS fixes and reading the cached trail",
        version = "0.1.0"
    ),
    tags(
        (name = "ingest", description = "Fix submission"),
        (name = "trail", description = "Trail reads")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

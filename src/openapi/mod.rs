use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cycle Count API",
        version = "1.0.0",
        description = r#"
# Cycle Count API

Barcode-driven cycle counts across the MtD, FtP, HSTD and 3PL locations.

## Features

- **Counts**: Each scanned quantity is checked against stock on hand before it is recorded
- **Sessions**: Monthly cycle counts per location and weekly high-volume counts at HSTD
- **Conflicts**: A count that disagrees with another open session asks for confirmation
- **History and audit**: Every accepted count is logged with its provenance

## Error Handling

Failures share one body shape:

```json
{
  "error": "Unprocessable Entity",
  "message": "Quantity does not match. Expected: 8, Entered: 5. Please recount.",
  "details": { "expected": 8, "entered": 5 },
  "timestamp": "2026-10-17T10:30:00Z"
}
```

A conflict answers 409 with the conflicting session in `details`; repeat the
request with `confirm_override` set to `true` to accept or `false` to decline.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "counts", description = "Count submission"),
        (name = "sessions", description = "Count session lifecycle"),
        (name = "history", description = "Count history"),
        (name = "audit", description = "Audit trail"),
        (name = "dashboard", description = "Dashboard aggregates"),
        (name = "components", description = "Stock on hand")
    ),
    paths(
        crate::handlers::counts::submit_count,
        crate::handlers::counts::start_session,
        crate::handlers::counts::session_status,
        crate::handlers::counts::reset_session,
        crate::handlers::counts::remove_sku,
        crate::handlers::counts::list_sessions,

        crate::handlers::history::search_history,
        crate::handlers::history::monthly_sku_history,
        crate::handlers::history::clear_monthly_sku_history,

        crate::handlers::audit::audit_trail,
        crate::handlers::dashboard::dashboard,
        crate::handlers::components::list_components,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::errors::ConflictDetail,
            crate::errors::WriteStep,
            crate::handlers::counts::SubmitCountRequest,
            crate::handlers::counts::StartSessionRequest,
            crate::handlers::common::ScopeParams,
            crate::models::Location,
            crate::models::SessionKind,
            crate::models::CountDay,
            crate::models::Actor,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_count_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Cycle Count API"));
        assert!(json.contains("/api/v1/counts"));
        assert!(json.contains("/api/v1/history/monthly/{barcode}"));
    }
}

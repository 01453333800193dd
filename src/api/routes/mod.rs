pub mod admin;
pub mod pdfs;
pub mod users;

use axum::{extract::State, Json};
use serde::Serialize;

use super::state::AppState;
use super::ApiResponse;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub catalog: &'static str,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<Health>> {
    Json(ApiResponse::content(
        "Service is healthy",
        Health {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            catalog: state.library.catalog().backend_name(),
        },
    ))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let (_tmp, state) = setup_test_state();
        let (status, json) = get_json(app(&state), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_successful"], true);
        assert_eq!(json["content"]["status"], "ok");
        assert_eq!(json["content"]["catalog"], "memory");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (_tmp, state) = setup_test_state();
        let (status, _) = get_json(app(&state), "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

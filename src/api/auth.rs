// =============================================================================
// Shared-passphrase Authentication — Axum extractor
// =============================================================================
//
// The dashboard is gated by one static passphrase shared by every viewer. It
// is accepted either as `Authorization: Bearer <passphrase>` or as the
// `X-Dashboard-Passphrase` header, and compared in constant time.
//
//   async fn handler(_auth: DashboardAuth, ...) { ... }
//
// With no passphrase configured every protected request is refused.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

/// Alternative header for clients that cannot set `Authorization`.
pub const PASSPHRASE_HEADER: &str = "x-dashboard-passphrase";

// =============================================================================
// Constant-time comparison
// =============================================================================

/// Compare two byte slices without short-circuiting on the first mismatch.
/// Only the length difference is observable.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// =============================================================================
// Extractor
// =============================================================================

/// Proof that the request carried the dashboard passphrase.
pub struct DashboardAuth;

/// Rejection type returned when authentication fails.
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

fn presented_passphrase(parts: &Parts) -> Option<&str> {
    let bearer = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    bearer.or_else(|| {
        parts
            .headers
            .get(PASSPHRASE_HEADER)
            .and_then(|v| v.to_str().ok())
    })
}

impl FromRequestParts<Arc<AppState>> for DashboardAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.passphrase() else {
            warn!("RENTSCOPE_PASSPHRASE is not set, all authenticated requests will be rejected");
            return Err(AuthRejection {
                status: StatusCode::FORBIDDEN,
                message: "Server authentication not configured",
            });
        };

        let Some(presented) = presented_passphrase(parts) else {
            warn!("Missing dashboard passphrase");
            return Err(AuthRejection {
                status: StatusCode::UNAUTHORIZED,
                message: "Missing passphrase",
            });
        };

        if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            warn!("Incorrect dashboard passphrase presented");
            return Err(AuthRejection {
                status: StatusCode::FORBIDDEN,
                message: "Incorrect password. Please try again.",
            });
        }

        Ok(DashboardAuth)
    }
}

// =============================================================================
// Tests
// =============================================================================

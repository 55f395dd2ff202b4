pub mod auth;
pub mod handlers;
pub mod router;

use serde::Serialize;

pub use router::create_router;

/// Envelope every JSON endpoint answers with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Row cap applied when a listing request gives no `limit`.
pub const DEFAULT_LIMIT: i64 = 100;
/// Upper bound on any requested `limit`.
pub const MAX_LIMIT: i64 = 1000;

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

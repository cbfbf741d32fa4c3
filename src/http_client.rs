use crate::backend_client::BackendResponse;
use actix_web::{HttpResponse, http::StatusCode};
use anyhow::Result;
use log::error;
use serde::Serialize;

pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal server error";

/// JSON error body returned to the browser
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// Trait for converting service results into HTTP responses
pub trait ServiceResultResponse {
    fn into_response(self) -> HttpResponse;
}

impl ServiceResultResponse for BackendResponse {
    fn into_response(self) -> HttpResponse {
        match StatusCode::from_u16(self.status) {
            Ok(status) => HttpResponse::build(status).json(self.body),
            Err(e) => {
                error!("failed to relay backend status {}: {e:#}", self.status);
                internal_server_error()
            }
        }
    }
}

/// Generic 500 response that does not leak the cause
pub fn internal_server_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorBody {
        error: INTERNAL_SERVER_ERROR_MESSAGE,
    })
}

/// Handle Result and convert data to Response
///
/// On success the data is turned into its response. On failure the full error
/// chain is logged and the caller only gets the generic 500 body.
///
/// # Arguments
/// * `result` - The Result to handle
/// * `operation` - Context message describing the operation
pub fn handle_service_result<T>(result: Result<T>, operation: &str) -> HttpResponse
where
    T: ServiceResultResponse,
{
    match result {
        Ok(data) => data.into_response(),
        Err(e) => {
            error!("{operation} failed: {e:#}");
            internal_server_error()
        }
    }
}

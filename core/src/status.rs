//! Classification of service status codes into `ApiError` variants.
//!
//! The mapping is a pure function of the response: the same status always
//! yields the same variant, and the body only contributes the message for
//! 400 and 426.

use serde::Deserialize;

use crate::error::ApiError;
use crate::http::HttpResponse;

pub const MISSING_CREDENTIALS: &str = "JWT validation failed: missing or invalid credentials";
pub const INSUFFICIENT_CREDITS: &str = "insufficient credits (cpu seconds) left";
pub const FORBIDDEN: &str = "forbidden";

/// Body of a 426 response.
#[derive(Deserialize)]
struct UpgradeRequired {
    msg: String,
}

/// Map non-200 status codes to the appropriate `ApiError` variant.
pub fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    let err = match response.status {
        200 => return Ok(()),
        400 => ApiError::BadRequest(response.body.clone()),
        401 => ApiError::Unauthorized(MISSING_CREDENTIALS.to_string()),
        402 => ApiError::Unauthorized(INSUFFICIENT_CREDITS.to_string()),
        403 => ApiError::Unauthorized(FORBIDDEN.to_string()),
        426 => {
            let msg = serde_json::from_str::<UpgradeRequired>(&response.body)
                .map(|b| b.msg)
                .unwrap_or_else(|_| response.body.clone());
            ApiError::Unauthorized(format!(
                "API version rejected; the cloud api is still in beta and may change. \
                 Message from cloud: {msg}"
            ))
        }
        504 => ApiError::Timeout,
        status => ApiError::UnknownService {
            status,
            body: response.body.clone(),
        },
    };
    tracing::warn!(status = response.status, error = %err, "cloud service rejected request");
    Err(err)
}

use docgen_core::ServiceError;
use reqwest::{Response, StatusCode};

pub(crate) fn transport(err: reqwest::Error) -> ServiceError {
    ServiceError::Transport(err.to_string())
}

/// Pass successful responses through; turn the rest into a `ServiceError`
/// carrying the response body.
pub(crate) async fn check(resp: Response, what: &str) -> Result<Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(what.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ServiceError::Auth(format!("{}: {}", status, body))
        }
        _ => ServiceError::Status {
            status: status.as_u16(),
            body,
        },
    })
}

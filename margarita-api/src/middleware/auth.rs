use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::credentials::CredentialError;
use crate::error::AppError;
use crate::state::AppState;

/// Legacy header still sent by older clients.
pub const LEGACY_TOKEN_HEADER: &str = "x-token";

/// Token from `Authorization: Bearer`, falling back to `x-token`.
pub fn request_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_owned());
    }
    headers
        .get(LEGACY_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Verifies the token and injects the resolved `Session` into request extensions.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request_token(req.headers()).ok_or(CredentialError::MissingToken)?;
    let session = state.credentials.verify_token(&token)?;

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_wins_over_legacy_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        headers.insert(LEGACY_TOKEN_HEADER, HeaderValue::from_static("legacy"));
        assert_eq!(request_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_legacy_header_and_missing_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_token(&headers), None);
        headers.insert(LEGACY_TOKEN_HEADER, HeaderValue::from_static(" legacy "));
        assert_eq!(request_token(&headers).as_deref(), Some("legacy"));
    }
}

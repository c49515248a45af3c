use axum::{
    body::Body,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};

use shared_models::auth::AuthToken;
use shared_models::error::AppError;

/// Reads the patient token from the `token` header, falling back to
/// `Authorization: Bearer <token>`.
pub fn patient_token_from_headers(headers: &HeaderMap) -> Result<Option<AuthToken>, AppError> {
    if let Some(value) = headers.get("token") {
        let token = value
            .to_str()
            .map_err(|_| AppError::Auth("Invalid token header format".to_string()))?
            .trim();
        if token.is_empty() {
            return Err(AppError::Auth("Empty token header".to_string()));
        }
        return Ok(Some(AuthToken::patient(token)));
    }

    if !headers.contains_key(AUTHORIZATION) {
        return Ok(None);
    }

    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = bearer.token().trim();
    if token.is_empty() {
        return Err(AppError::Auth("Empty bearer token".to_string()));
    }

    Ok(Some(AuthToken::patient(token)))
}

// Rejects requests without a patient token and stores the token in the request extensions
pub async fn auth_middleware(mut request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let token = patient_token_from_headers(request.headers())?
        .ok_or_else(|| AppError::Auth("Not authorized. Login again".to_string()))?;

    request.extensions_mut().insert(token);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("token", HeaderValue::from_static("abc"));
        headers.insert("Authorization", HeaderValue::from_static("Bearer other"));

        let token = patient_token_from_headers(&headers).unwrap().unwrap();
        assert_eq!(token.value(), "abc");
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer xyz"));

        let token = patient_token_from_headers(&headers).unwrap().unwrap();
        assert_eq!(token.value(), "xyz");
    }

    #[test]
    fn test_missing_token_is_none() {
        assert!(patient_token_from_headers(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_authorization_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic xyz"));

        assert_matches!(patient_token_from_headers(&headers), Err(AppError::Auth(_)));
    }
}

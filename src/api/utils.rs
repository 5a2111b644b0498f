//! API utility functions
//!
//! Pure, stateless helpers for HTTP request processing.

use axum::http::{HeaderMap, header::CONTENT_TYPE};
use http_body_util::{BodyExt, Limited, LengthLimitError};
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// Upper bound for JSON request bodies
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Parses and validates Content-Type header for application/json
///
/// Accepts `application/json` with or without a charset parameter and
/// rejects look-alikes such as `application/jsonp` or `text/json`.
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Validates that body size does not exceed the maximum allowed size
pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(max_size));
    }
    Ok(())
}

/// Check the content type, read the body and deserialize it
pub async fn read_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: axum::body::Body,
) -> Result<T, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    let data = Limited::new(body, MAX_BODY_SIZE)
        .collect()
        .await
        .map_err(|err| {
            if err.is::<LengthLimitError>() {
                ApiError::PayloadTooLarge(MAX_BODY_SIZE)
            } else {
                ApiError::InvalidPayload(format!("failed to read body: {}", err))
            }
        })?
        .to_bytes();
    validate_body_size(&data, MAX_BODY_SIZE)?;

    Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_content_type_valid() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());
        assert!(parse_content_type("application/json; charset=UTF-8").is_ok());
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(parse_content_type("application/jsonp").is_err());
        assert!(parse_content_type("application/json-patch+json").is_err());
        assert!(parse_content_type("text/json").is_err());
        assert!(parse_content_type("invalid").is_err());
        assert!(parse_content_type("").is_err());
    }

    #[test]
    fn test_validate_body_size() {
        let data = vec![0u8; 1000];
        assert!(validate_body_size(&data, 1000).is_ok());
        match validate_body_size(&data, 999) {
            Err(ApiError::PayloadTooLarge(limit)) => assert_eq!(limit, 999),
            _ => panic!("Expected PayloadTooLarge error"),
        }
    }

    #[tokio::test]
    async fn test_read_json() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let value: serde_json::Value =
            read_json(&headers, axum::body::Body::from(r#"{"present":true}"#))
                .await
                .unwrap();
        assert_eq!(value["present"], true);

        let missing = read_json::<serde_json::Value>(&HeaderMap::new(), axum::body::Body::from("{}")).await;
        assert!(matches!(missing, Err(ApiError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_read_json_stops_at_size_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = axum::body::Body::from(vec![b' '; MAX_BODY_SIZE + 1]);

        let result = read_json::<serde_json::Value>(&headers, body).await;
        assert!(matches!(result, Err(ApiError::PayloadTooLarge(MAX_BODY_SIZE))));
    }
}

use url::Url;

use crate::error::ApiError;

/// Default address of a locally running server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4096";

/// Normalize a base URL and validate it.
///
/// Normalization rules:
/// 1) blank input falls back to [`DEFAULT_BASE_URL`]
/// 2) surrounding whitespace and trailing slashes are dropped
/// 3) only `http` and `https` schemes are accepted
pub fn normalize_base_url(input: &str) -> Result<String, ApiError> {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };
    let trimmed = base.trim_end_matches('/');

    let parsed =
        Url::parse(trimmed).map_err(|error| ApiError::InvalidBaseUrl(format!("{trimmed}: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl(format!(
            "{trimmed}: unsupported scheme {}",
            parsed.scheme()
        )));
    }

    Ok(trimmed.to_string())
}

/// Joins an endpoint path onto a normalized base URL.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

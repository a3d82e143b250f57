use url::Url;

use crate::error::ApiError;

/// Default duplex endpoint for local development.
pub const DEFAULT_WEBSOCKET_URL: &str = "ws://127.0.0.1:3001";
/// Default lookup API base for local development.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
/// Query parameter carrying the id token on authenticated connects.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Normalize a configured streaming endpoint to a WebSocket URL.
///
/// Rules:
/// 1) blank input falls back to [`DEFAULT_WEBSOCKET_URL`]
/// 2) `http` becomes `ws`, `https` becomes `wss`
/// 3) `ws`/`wss` are kept; any other scheme is rejected
pub fn normalize_websocket_url(input: &str) -> Result<Url, ApiError> {
    let raw = if input.trim().is_empty() {
        DEFAULT_WEBSOCKET_URL
    } else {
        input.trim()
    };

    let mut url = Url::parse(raw).map_err(|error| ApiError::InvalidUrl(format!("{raw}: {error}")))?;
    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(ApiError::InvalidUrl(format!(
                "unsupported streaming scheme '{other}' in {raw}"
            )))
        }
    };

    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(ApiError::InvalidUrl(format!("cannot rewrite scheme of {raw}")));
    }

    Ok(url)
}

/// Append the id token as a query parameter, replacing any previous token.
pub fn with_token_query(mut url: Url, token: &str) -> Url {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != TOKEN_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(TOKEN_QUERY_PARAM, token);
    }

    url
}

/// Trim a lookup base URL so path joins never double the separator.
pub fn normalize_api_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_API_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

/// Join a lookup path onto a normalized base.
pub fn api_endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", normalize_api_url(base), path.trim_start_matches('/'))
}

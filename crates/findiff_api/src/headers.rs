use std::collections::BTreeMap;

use crate::config::ApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Build a deterministic header map for lookup requests.
///
/// The API key and bearer token are both optional: anonymous callers still get
/// a well-formed request and the backend decides what it permits.
pub fn build_headers(
    config: &ApiConfig,
    id_token: Option<&str>,
    user_agent: Option<&str>,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());
    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );

    if let Some(api_key) = config.api_key.as_deref().and_then(sanitize_nonempty) {
        headers.insert(HEADER_API_KEY.to_owned(), api_key);
    }

    if let Some(token) = id_token.and_then(sanitize_nonempty) {
        headers.insert(HEADER_AUTHORIZATION.to_owned(), format!("Bearer {token}"));
    }

    let user_agent = user_agent
        .or(config.user_agent.as_deref())
        .and_then(sanitize_nonempty)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), user_agent);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

fn sanitize_nonempty(value: &str) -> Option<String> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty()).map(str::to_owned)
}

fn default_user_agent() -> String {
    format!(
        "findiff/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

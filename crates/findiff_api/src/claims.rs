use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

/// Usage tier of the current session.
///
/// Anonymous sessions are gated locally; free and premium sessions are gated
/// server-side and only differ in what the backend allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTier {
    Anonymous,
    Free,
    Premium,
}

impl SessionTier {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }
}

/// Derive the tier from an id token without verifying its signature.
///
/// The token is only inspected for the `custom:isPremium` claim the identity
/// provider stamps on issue; verification happens server-side. A token that
/// cannot be decoded still marks the session as authenticated.
pub fn tier_from_id_token(token: Option<&str>) -> SessionTier {
    let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
        return SessionTier::Anonymous;
    };

    match decode_claims(token) {
        Some(claims) if claims.is_premium() => SessionTier::Premium,
        _ => SessionTier::Free,
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(rename = "custom:isPremium", default)]
    is_premium: Option<PremiumClaim>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PremiumClaim {
    Flag(bool),
    Text(String),
}

impl TokenClaims {
    fn is_premium(&self) -> bool {
        match &self.is_premium {
            Some(PremiumClaim::Flag(flag)) => *flag,
            Some(PremiumClaim::Text(text)) => text.trim().eq_ignore_ascii_case("true"),
            None => false,
        }
    }
}

fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload_segment = parts.next()?;
    let _signature = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let decoded = decode_jwt_segment(payload_segment)?;
    serde_json::from_slice::<TokenClaims>(&decoded).ok()
}

fn decode_jwt_segment(segment: &str) -> Option<Vec<u8>> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| general_purpose::URL_SAFE.decode(segment))
        .ok()
}

//! Environment configuration.

use std::env;
use std::time::Duration;

use findiff_api::{ApiConfig, CredentialPlacement};

use crate::accumulator::{DEFAULT_COMMIT_INTERVAL, DEFAULT_REVEAL_CHARS};
use crate::app::{AppSettings, DEFAULT_WATCHDOG_TIMEOUT};
use crate::error::FindiffError;
use crate::gate::DEFAULT_ANONYMOUS_QUOTA;
use crate::providers::DEFAULT_PROVIDER_ID;

pub const PROVIDER_ENV_VAR: &str = "FINDIFF_PROVIDER";
pub const WEBSOCKET_URL_ENV_VAR: &str = "FINDIFF_WEBSOCKET_URL";
pub const API_URL_ENV_VAR: &str = "FINDIFF_API_URL";
pub const API_KEY_ENV_VAR: &str = "FINDIFF_API_KEY";
pub const ID_TOKEN_ENV_VAR: &str = "FINDIFF_ID_TOKEN";
pub const CREDENTIAL_PLACEMENT_ENV_VAR: &str = "FINDIFF_CREDENTIAL_PLACEMENT";
pub const ANONYMOUS_QUOTA_ENV_VAR: &str = "FINDIFF_ANONYMOUS_QUOTA";
pub const REVEAL_CHARS_ENV_VAR: &str = "FINDIFF_REVEAL_CHARS";
pub const COMMIT_INTERVAL_ENV_VAR: &str = "FINDIFF_COMMIT_INTERVAL_MS";
pub const TIMEOUT_ENV_VAR: &str = "FINDIFF_TIMEOUT_SEC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub provider: String,
    pub websocket_url: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub id_token: Option<String>,
    pub credential_placement: CredentialPlacement,
    pub anonymous_quota: u32,
    pub reveal_chars: usize,
    pub commit_interval: Duration,
    pub timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, FindiffError> {
        let credential_placement = match env_string_opt(CREDENTIAL_PLACEMENT_ENV_VAR) {
            Some(value) => CredentialPlacement::parse(&value).ok_or(FindiffError::InvalidConfig {
                key: CREDENTIAL_PLACEMENT_ENV_VAR,
                value,
            })?,
            None => CredentialPlacement::default(),
        };

        let reveal_chars = env_parsed::<usize>(REVEAL_CHARS_ENV_VAR)?.unwrap_or(DEFAULT_REVEAL_CHARS);
        if reveal_chars == 0 {
            return Err(FindiffError::InvalidConfig {
                key: REVEAL_CHARS_ENV_VAR,
                value: "0".to_string(),
            });
        }

        let timeout = match env_parsed::<u64>(TIMEOUT_ENV_VAR)? {
            Some(0) => {
                return Err(FindiffError::InvalidConfig {
                    key: TIMEOUT_ENV_VAR,
                    value: "0".to_string(),
                })
            }
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => None,
        };

        Ok(Self {
            provider: env_string_opt(PROVIDER_ENV_VAR)
                .map(|value| value.trim().to_ascii_lowercase())
                .unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_string()),
            websocket_url: env_string_opt(WEBSOCKET_URL_ENV_VAR),
            api_url: env_string_opt(API_URL_ENV_VAR),
            api_key: env_string_opt(API_KEY_ENV_VAR),
            id_token: env_string_opt(ID_TOKEN_ENV_VAR),
            credential_placement,
            anonymous_quota: env_parsed(ANONYMOUS_QUOTA_ENV_VAR)?.unwrap_or(DEFAULT_ANONYMOUS_QUOTA),
            reveal_chars,
            commit_interval: env_parsed::<u64>(COMMIT_INTERVAL_ENV_VAR)?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_COMMIT_INTERVAL),
            timeout,
        })
    }

    pub fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig::default().with_credential_placement(self.credential_placement);
        if let Some(url) = &self.websocket_url {
            config.websocket_url = url.trim().to_string();
        }
        if let Some(url) = &self.api_url {
            config.api_url = url.trim().to_string();
        }
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key.trim());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }

    pub fn app_settings(&self) -> AppSettings {
        AppSettings {
            reveal_chars: self.reveal_chars,
            commit_interval: self.commit_interval,
            anonymous_quota: self.anonymous_quota,
            watchdog_timeout: DEFAULT_WATCHDOG_TIMEOUT,
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_parsed<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, FindiffError> {
    match env_string_opt(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| FindiffError::InvalidConfig { key, value }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    const ALL_KEYS: [&str; 10] = [
        PROVIDER_ENV_VAR,
        WEBSOCKET_URL_ENV_VAR,
        API_URL_ENV_VAR,
        API_KEY_ENV_VAR,
        ID_TOKEN_ENV_VAR,
        CREDENTIAL_PLACEMENT_ENV_VAR,
        ANONYMOUS_QUOTA_ENV_VAR,
        REVEAL_CHARS_ENV_VAR,
        COMMIT_INTERVAL_ENV_VAR,
        TIMEOUT_ENV_VAR,
    ];

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    fn clear_all() -> Vec<EnvGuard> {
        ALL_KEYS
            .iter()
            .map(|key| set_env_guard(key, None))
            .collect()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let _lock = env_lock();
        let _guards = clear_all();

        let config = EnvConfig::from_env().expect("defaults are valid");
        assert_eq!(config.provider, "mock");
        assert_eq!(config.websocket_url, None);
        assert_eq!(config.credential_placement, CredentialPlacement::QueryParameter);
        assert_eq!(config.anonymous_quota, 4);
        assert_eq!(config.reveal_chars, 15);
        assert_eq!(config.commit_interval, Duration::from_millis(50));
        assert_eq!(config.timeout, None);
        assert_eq!(config.app_settings().watchdog_timeout, Duration::from_secs(300));
    }

    #[test]
    fn values_are_read_and_blank_values_ignored() {
        let _lock = env_lock();
        let _guards = clear_all();
        let _g1 = set_env_guard(PROVIDER_ENV_VAR, Some(" WS "));
        let _g2 = set_env_guard(WEBSOCKET_URL_ENV_VAR, Some("wss://example.test/socket"));
        let _g3 = set_env_guard(API_KEY_ENV_VAR, Some("   "));
        let _g4 = set_env_guard(CREDENTIAL_PLACEMENT_ENV_VAR, Some("payload"));
        let _g5 = set_env_guard(ANONYMOUS_QUOTA_ENV_VAR, Some("2"));
        let _g6 = set_env_guard(COMMIT_INTERVAL_ENV_VAR, Some("16"));
        let _g7 = set_env_guard(TIMEOUT_ENV_VAR, Some("30"));

        let config = EnvConfig::from_env().expect("valid config");
        assert_eq!(config.provider, "ws");
        assert_eq!(config.api_key, None);
        assert_eq!(config.credential_placement, CredentialPlacement::PayloadField);
        assert_eq!(config.anonymous_quota, 2);
        assert_eq!(config.commit_interval, Duration::from_millis(16));

        let api = config.api_config();
        assert_eq!(api.websocket_url, "wss://example.test/socket");
        assert_eq!(api.api_key, None);
        assert_eq!(api.timeout, Some(Duration::from_secs(30)));
        assert_eq!(api.credential_placement, CredentialPlacement::PayloadField);
    }

    #[test]
    fn invalid_numbers_and_placements_are_rejected() {
        let _lock = env_lock();
        let _guards = clear_all();

        {
            let _g = set_env_guard(ANONYMOUS_QUOTA_ENV_VAR, Some("four"));
            assert_eq!(
                EnvConfig::from_env(),
                Err(FindiffError::InvalidConfig {
                    key: ANONYMOUS_QUOTA_ENV_VAR,
                    value: "four".to_string(),
                })
            );
        }
        {
            let _g = set_env_guard(CREDENTIAL_PLACEMENT_ENV_VAR, Some("cookie"));
            assert!(EnvConfig::from_env().is_err());
        }
        {
            let _g = set_env_guard(REVEAL_CHARS_ENV_VAR, Some("0"));
            assert!(EnvConfig::from_env().is_err());
        }
        {
            let _g = set_env_guard(TIMEOUT_ENV_VAR, Some("0"));
            assert!(EnvConfig::from_env().is_err());
        }
    }
}

//! Environment configuration and its resolution against the preference
//! cache. Environment wins over cached values, which win over defaults.

use std::env;
use std::time::Duration;

use adk_api::DEFAULT_BASE_URL;
use uuid::Uuid;

use crate::prefs::{PrefsStore, PREF_BASE_URL, PREF_USER_ID};

pub const BASE_URL_ENV_VAR: &str = "CHAT_CONSOLE_BASE_URL";
pub const APP_NAME_ENV_VAR: &str = "CHAT_CONSOLE_APP";
pub const USER_ID_ENV_VAR: &str = "CHAT_CONSOLE_USER";
pub const TIMEOUT_ENV_VAR: &str = "CHAT_CONSOLE_TIMEOUT_SEC";

pub const DEFAULT_APP_NAME: &str = "assistant";

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub base_url: Option<String>,
    pub app_name: Option<String>,
    pub user_id: Option<String>,
    pub timeout: Option<Duration>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_string_opt(BASE_URL_ENV_VAR),
            app_name: env_string_opt(APP_NAME_ENV_VAR),
            user_id: env_string_opt(USER_ID_ENV_VAR),
            timeout: env_string_opt(TIMEOUT_ENV_VAR)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs),
        }
    }
}

/// Fully resolved console configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub app_name: String,
    pub user_id: String,
    pub timeout: Option<Duration>,
}

pub fn resolve(env: &EnvConfig, prefs: &dyn PrefsStore) -> ConsoleConfig {
    let base_url = env
        .base_url
        .clone()
        .or_else(|| prefs.load(PREF_BASE_URL))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let app_name = env
        .app_name
        .clone()
        .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

    let user_id = env
        .user_id
        .clone()
        .or_else(|| prefs.load(PREF_USER_ID))
        .unwrap_or_else(generated_user_id);

    ConsoleConfig {
        base_url,
        app_name,
        user_id,
        timeout: env.timeout,
    }
}

/// First run on a machine with no cached identity: mint a stable-enough id
/// and let the caller persist it.
fn generated_user_id() -> String {
    format!("user-{}", Uuid::new_v4().simple())
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::Duration;

    use super::{
        resolve, EnvConfig, APP_NAME_ENV_VAR, BASE_URL_ENV_VAR, DEFAULT_APP_NAME,
        TIMEOUT_ENV_VAR, USER_ID_ENV_VAR,
    };
    use crate::prefs::{MemoryPrefs, PrefsStore, PREF_BASE_URL, PREF_USER_ID};

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

    fn env_lock() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
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

    #[test]
    fn env_values_win_over_cached_values() {
        let _lock = env_lock();
        let _user = set_env_guard(USER_ID_ENV_VAR, Some("env-user"));
        let _base = set_env_guard(BASE_URL_ENV_VAR, None);
        let _app = set_env_guard(APP_NAME_ENV_VAR, None);

        let mut prefs = MemoryPrefs::default();
        prefs.save(PREF_USER_ID, "cached-user");
        prefs.save(PREF_BASE_URL, "http://cached:9000");

        let config = resolve(&EnvConfig::from_env(), &prefs);

        assert_eq!(config.user_id, "env-user");
        assert_eq!(config.base_url, "http://cached:9000");
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
    }

    #[test]
    fn missing_identity_is_generated_not_fatal() {
        let _lock = env_lock();
        let _user = set_env_guard(USER_ID_ENV_VAR, None);
        let _base = set_env_guard(BASE_URL_ENV_VAR, None);
        let _app = set_env_guard(APP_NAME_ENV_VAR, None);

        let config = resolve(&EnvConfig::from_env(), &MemoryPrefs::default());

        assert!(config.user_id.starts_with("user-"));
        assert!(config.user_id.len() > "user-".len());
    }

    #[test]
    fn timeout_parses_positive_seconds_only() {
        let _lock = env_lock();

        {
            let _timeout = set_env_guard(TIMEOUT_ENV_VAR, Some("30"));
            assert_eq!(
                EnvConfig::from_env().timeout,
                Some(Duration::from_secs(30))
            );
        }

        {
            let _timeout = set_env_guard(TIMEOUT_ENV_VAR, Some("0"));
            assert_eq!(EnvConfig::from_env().timeout, None);
        }

        {
            let _timeout = set_env_guard(TIMEOUT_ENV_VAR, Some("soon"));
            assert_eq!(EnvConfig::from_env().timeout, None);
        }
    }
}

use std::env;

use crate::config::ConfigError;

pub(crate) fn require_any_env(keys: &'static [&'static str]) -> Result<String, ConfigError> {
    for key in keys {
        if let Some(value) = optional_trimmed_env(key) {
            return Ok(value);
        }
    }
    Err(ConfigError::MissingAnyVar(keys))
}

pub(crate) fn env_or(key: &str, default: &str) -> String {
    optional_trimmed_env(key).unwrap_or_else(|| default.to_string())
}

pub(crate) fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Comma-separated numeric ids; entries that do not parse are dropped.
pub(crate) fn parse_i64_list_env(key: &str) -> Vec<i64> {
    let Some(raw) = optional_trimmed_env(key) else {
        return Vec::new();
    };

    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| item.parse::<i64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_i64_list_env;

    #[test]
    fn parses_id_list_and_drops_invalid_entries() {
        unsafe {
            std::env::set_var("TEST_CONFIG_ENV_ID_LIST", " 42, abc, 7,,-3 ");
        }
        assert_eq!(parse_i64_list_env("TEST_CONFIG_ENV_ID_LIST"), vec![42, 7, -3]);
        unsafe {
            std::env::remove_var("TEST_CONFIG_ENV_ID_LIST");
        }
    }

    #[test]
    fn missing_key_yields_empty_list() {
        assert_eq!(
            parse_i64_list_env("TEST_CONFIG_ENV_ABSENT"),
            Vec::<i64>::new()
        );
    }
}

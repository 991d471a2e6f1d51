use std::time::Duration;

use tracing::warn;

use crate::gaps::types::ApiSource;

const MIN_CALL_TIMEOUT_SECS: u64 = 30;
const MAX_CALL_TIMEOUT_SECS: u64 = 120;

/// Tunable gap-engine parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub target_count: usize,
    /// Bound on each outbound collaborator call.
    pub call_timeout: Duration,
    pub location: u32,
    pub source: ApiSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_count: 30,
            call_timeout: Duration::from_secs(60),
            // DataForSEO location code for the United States
            location: 2840,
            source: ApiSource::DataForSeo,
        }
    }
}

impl EngineConfig {
    /// Read overrides from the environment (and `.env`), keeping defaults for
    /// anything missing or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = parse_var::<usize>("GAP_TARGET_COUNT").filter(|n| *n > 0) {
            config.target_count = n;
        }
        if let Some(secs) = parse_var::<u64>("GAP_CALL_TIMEOUT_SECS") {
            let clamped = secs.clamp(MIN_CALL_TIMEOUT_SECS, MAX_CALL_TIMEOUT_SECS);
            if clamped != secs {
                warn!(requested = secs, used = clamped, "Call timeout out of range, clamped");
            }
            config.call_timeout = Duration::from_secs(clamped);
        }
        if let Some(code) = parse_var::<u32>("GAP_LOCATION_CODE") {
            config.location = code;
        }
        if let Some(source) = parse_var::<ApiSource>("GAP_API_SOURCE") {
            config.source = source;
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = dotenv::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.target_count, 30);
        assert_eq!(config.call_timeout, Duration::from_secs(60));
        assert_eq!(config.source, ApiSource::DataForSeo);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        std::env::set_var("GAP_TEST_PARSE_VAR", "not-a-number");
        assert_eq!(parse_var::<u32>("GAP_TEST_PARSE_VAR"), None);
        std::env::set_var("GAP_TEST_PARSE_VAR", " 2826 ");
        assert_eq!(parse_var::<u32>("GAP_TEST_PARSE_VAR"), Some(2826));
        assert_eq!(parse_var::<ApiSource>("GAP_TEST_UNSET_VAR"), None);
    }
}

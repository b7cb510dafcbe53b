//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

const TIMEOUT_VAR: &str = "SMS_TRIAGE_EXTRACTOR_TIMEOUT_MS";
const THRESHOLD_VAR: &str = "SMS_TRIAGE_PROMO_THRESHOLD";

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on a single primary-extractor call. Timeouts trigger
    /// fallback extraction, never a pipeline failure.
    pub extractor_timeout: Duration,
    /// Promotional score above which a message is filed as marketing.
    /// Strict greater-than: a bare URL scores exactly 0.3 and is not enough.
    pub promo_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extractor_timeout: Duration::from_secs(10),
            promo_threshold: 0.3,
        }
    }
}

impl PipelineConfig {
    /// Build from environment, keeping defaults for unset variables.
    /// A present-but-malformed value is an error, not a silent default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var(TIMEOUT_VAR).ok().as_deref(),
            std::env::var(THRESHOLD_VAR).ok().as_deref(),
        )
    }

    fn from_vars(
        timeout_ms: Option<&str>,
        threshold: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = timeout_ms {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: TIMEOUT_VAR.into(),
                message: format!("expected milliseconds, got '{raw}'"),
            })?;
            config.extractor_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = threshold {
            let value: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: THRESHOLD_VAR.into(),
                message: format!("expected a number, got '{raw}'"),
            })?;
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: THRESHOLD_VAR.into(),
                    message: format!("threshold {value} outside [0, 1]"),
                });
            }
            config.promo_threshold = value;
        }

        Ok(config)
    }
}

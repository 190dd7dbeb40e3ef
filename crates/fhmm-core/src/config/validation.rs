//! Semantic validation for engine configuration.

use super::EngineConfig;
use chrono::format::{Item, StrftimeItems};
use thiserror::Error;

/// A configuration value that parsed but makes no sense.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("joint_variance must be finite and > 0, got {0}")]
    JointVariance(f64),

    #[error("max_joint_states must be > 0")]
    MaxJointStates,

    #[error("timestamp_format must not be empty")]
    TimestampFormat,

    #[error("timestamp_format '{0}' is not a valid strftime format")]
    TimestampSyntax(String),
}

/// Check the semantic constraints serde cannot express.
pub fn validate_engine(config: &EngineConfig) -> Result<(), ValidationError> {
    if !config.joint_variance.is_finite() || config.joint_variance <= 0.0 {
        return Err(ValidationError::JointVariance(config.joint_variance));
    }
    if config.max_joint_states == 0 {
        return Err(ValidationError::MaxJointStates);
    }
    if config.timestamp_format.trim().is_empty() {
        return Err(ValidationError::TimestampFormat);
    }
    if StrftimeItems::new(&config.timestamp_format).any(|item| matches!(item, Item::Error)) {
        return Err(ValidationError::TimestampSyntax(
            config.timestamp_format.clone(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_engine(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn rejects_bad_variance() {
        for v in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = EngineConfig {
                joint_variance: v,
                ..Default::default()
            };
            assert!(matches!(
                validate_engine(&config),
                Err(ValidationError::JointVariance(_))
            ));
        }
    }

    #[test]
    fn rejects_zero_state_cap() {
        let config = EngineConfig {
            max_joint_states: 0,
            ..Default::default()
        };
        assert_eq!(validate_engine(&config), Err(ValidationError::MaxJointStates));
    }

    #[test]
    fn rejects_blank_timestamp_format() {
        let config = EngineConfig {
            timestamp_format: "  ".into(),
            ..Default::default()
        };
        assert_eq!(validate_engine(&config), Err(ValidationError::TimestampFormat));
    }

    #[test]
    fn rejects_unknown_strftime_specifier() {
        let config = EngineConfig {
            timestamp_format: "%Y-%".into(),
            ..Default::default()
        };
        assert!(matches!(
            validate_engine(&config),
            Err(ValidationError::TimestampSyntax(_))
        ));
    }
}

//! Setup-time errors for the pipeline stages.

use strata_core::config::{is_recognized_kind, Config, ConfigError};
use thiserror::Error;

/// Fatal configuration problems raised while setting up a stage.
///
/// These surface to the caller and end the process; per-record problems are
/// handled (and logged) where they occur instead.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("wrong configuration provided, configuration is for: {actual}, expected {expected}")]
    WrongKind { expected: &'static str, actual: String },
    #[error("required configuration key {0} not specified")]
    MissingKey(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Checks a configuration's discriminator against the kind a stage expects.
///
/// Kinds this codebase does not know at all are flagged louder than a
/// known-but-misrouted configuration.
pub fn check_kind(config: &Config, expected: &'static str) -> Result<(), SetupError> {
    match config.kind() {
        Some(kind) if kind == expected => Ok(()),
        Some(other) => {
            if !is_recognized_kind(other) {
                log::error!("configuration kind {other} is not recognized");
            }
            Err(SetupError::WrongKind { expected, actual: other.to_string() })
        }
        None => Err(SetupError::MissingKey("Cmd")),
    }
}

#[cfg(test)]
mod tests {
    use strata_core::config::{KIND_GLASS_INPUT, KIND_GLASS_OUTPUT};

    use super::*;

    #[test]
    fn accepts_the_expected_kind() {
        let config = Config::from_str(r#"{"Cmd":"GlassInput"}"#).unwrap();
        assert!(check_kind(&config, KIND_GLASS_INPUT).is_ok());
    }

    #[test]
    fn rejects_misrouted_and_unrecognized_kinds() {
        let config = Config::from_str(r#"{"Cmd":"GlassInput"}"#).unwrap();
        assert!(matches!(
            check_kind(&config, KIND_GLASS_OUTPUT),
            Err(SetupError::WrongKind { .. })
        ));

        let config = Config::from_str(r#"{"Cmd":"GlassFrobnicator"}"#).unwrap();
        assert!(matches!(
            check_kind(&config, KIND_GLASS_INPUT),
            Err(SetupError::WrongKind { .. })
        ));
    }

    #[test]
    fn rejects_missing_discriminator() {
        let config = Config::from_str(r#"{"Key":1}"#).unwrap();
        assert!(matches!(
            check_kind(&config, KIND_GLASS_INPUT),
            Err(SetupError::MissingKey("Cmd"))
        ));
    }
}

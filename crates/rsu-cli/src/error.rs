use rsu_config::ConfigError;
use rsu_pipeline::PipelineError;

#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingApiKey | ConfigError::InvalidApiKey => {
                Self::Validation(err.to_string())
            }
            ConfigError::InvalidField {
                field,
                reason,
                value,
            } => Self::Validation(match value {
                Some(value) => format!("invalid configuration: {field} ({reason}): {value}"),
                None => format!("invalid configuration: {field} ({reason})"),
            }),
            other => Self::failure(other),
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        Self::failure(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_operator_errors() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow::anyhow!("boom")).exit_code(), 3);
    }

    #[test]
    fn config_errors_map_to_user_facing_messages() {
        let err = CliError::from(ConfigError::MissingApiKey);
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("login"));

        let err = CliError::from(ConfigError::InvalidField {
            field: "api_root",
            reason: "not_http_url",
            value: Some("ftp://example".to_string()),
        });
        assert_eq!(
            err.display_message(),
            "invalid configuration: api_root (not_http_url): ftp://example"
        );

        let err = CliError::from(ConfigError::MissingConfigDir);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn failure_messages_include_sources() {
        let err = CliError::failure(
            anyhow::anyhow!("connection refused").context("failed to reach service"),
        );
        assert_eq!(
            err.display_message(),
            "failed to reach service: connection refused"
        );
    }
}

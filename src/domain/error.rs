//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for channeltrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("series {code} is not strictly ordered by date at {date}")]
    UnorderedSeries { code: String, date: NaiveDate },

    #[error("no benchmark data for {code}")]
    NoBenchmark { code: String },

    #[error("benchmark {code} has no trading days between {start} and {end}")]
    NoTradingDays {
        code: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::Data { .. } | TraderError::UnorderedSeries { .. } => 3,
            TraderError::NoBenchmark { .. } | TraderError::NoTradingDays { .. } => 5,
            TraderError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid timing data in #{tag}: '{value}'")]
    InvalidTimingData { tag: String, value: String },

    #[error("Malformed chart: {0}")]
    MalformedChart(String),

    #[error("Unsupported steps type: '{0}'")]
    UnsupportedStepsType(String),

    #[error(
        "Could not resolve difficulty \
         (difficulty: '{difficulty}', description: '{description}', meter: '{meter}')"
    )]
    UnresolvedDifficulty {
        difficulty: String,
        description: String,
        meter: String,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn timing(tag: &str, value: &str) -> Self {
        Error::InvalidTimingData {
            tag: tag.to_string(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

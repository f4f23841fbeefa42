#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Station error: {0}")]
    Device(String),

    #[error("Station returned HTTP {status}: {body}")]
    DeviceStatus { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Validation(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl AppError {
    /// Whether the error came from talking to the station rather than from local input.
    #[must_use]
    pub fn is_device(&self) -> bool {
        matches!(
            self,
            Self::Device(_) | Self::DeviceStatus { .. } | Self::Malformed(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;

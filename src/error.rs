use thiserror::Error;

/// Error type for every pipeline, event and index operation.
#[derive(Error, Debug)]
pub enum PondError {
    /// Bad or missing constructor arguments and processor options.
    #[error("construction error: {0}")]
    Construction(String),

    /// No legal mapping between two event variants.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Invalid data: unequal extents on merge, malformed durations, mixed variants.
    #[error("data error: {0}")]
    Data(String),

    /// A predecessor link that does not resolve to a processor or an input.
    #[error("chain integrity error: {0}")]
    ChainIntegrity(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type alias for pond operations.
pub type Result<T> = std::result::Result<T, PondError>;

impl PondError {
    pub(crate) fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub(crate) fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub(crate) fn chain(msg: impl Into<String>) -> Self {
        Self::ChainIntegrity(msg.into())
    }

    /// Returns true if the error was raised while building a processor or config.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PondError::Construction(_) | PondError::Config(_) | PondError::ChainIntegrity(_)
        )
    }

    /// Returns true if the error aborts a single event rather than the chain.
    pub fn is_per_event(&self) -> bool {
        matches!(self, PondError::Conversion(_) | PondError::Data(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(PondError::construction("missing op").is_config_error());
        assert!(PondError::chain("unlinked").is_config_error());
        assert!(PondError::conversion("no mapping").is_per_event());
        assert!(PondError::data("bad merge").is_per_event());
        assert!(!PondError::data("bad merge").is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = PondError::construction("Filter: op is not a callable function");
        assert_eq!(
            err.to_string(),
            "construction error: Filter: op is not a callable function"
        );
    }
}

use super::lifecycle::EngineState;

/// Failure kinds surfaced at the engine boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid config: {}", errors.join(", "))]
    InvalidConfig { errors: Vec<String> },

    #[error("cannot {operation} while engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },

    #[error("failed to load {source_name}: {reason}")]
    DataLoad {
        source_name: String,
        reason: String,
        missing: bool,
    },

    #[error("insufficient data: have {bars} bars, need at least {required}")]
    InsufficientData { bars: usize, required: usize },

    #[error("warming up: have {have} of {need} bins")]
    InsufficientWarmup { have: usize, need: usize },

    #[error("malformed bar: {reason}")]
    MalformedBar { reason: String },

    #[error("engine worker failed: {reason}")]
    Worker { reason: String },
}

impl EngineError {
    pub fn data_load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::DataLoad {
            source_name: source_name.into(),
            reason: reason.into(),
            missing: false,
        }
    }

    pub fn source_missing(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::DataLoad {
            source_name: source_name.into(),
            reason: reason.into(),
            missing: true,
        }
    }

    /// Stable identifier used in transport error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidConfig { .. } => "InvalidConfigError",
            EngineError::InvalidState { .. } => "InvalidStateError",
            EngineError::DataLoad { .. } => "DataLoadError",
            EngineError::InsufficientData { .. } => "InsufficientDataError",
            EngineError::InsufficientWarmup { .. } => "InsufficientWarmupError",
            EngineError::MalformedBar { .. } => "MalformedBarError",
            EngineError::Worker { .. } => "WorkerError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = EngineError::InvalidConfig {
            errors: vec!["numBins must be > 1".into(), "lookaheadDays must be >= 1".into()],
        };
        assert_eq!(
            err.to_string(),
            "invalid config: numBins must be > 1, lookaheadDays must be >= 1"
        );

        let err = EngineError::InvalidState {
            operation: "train",
            state: EngineState::Initialized,
        };
        assert_eq!(err.to_string(), "cannot train while engine is INITIALIZED");
        assert_eq!(err.kind(), "InvalidStateError");
    }
}

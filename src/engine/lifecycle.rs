use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::EngineError;

/// `UNINITIALIZED -> INITIALIZED -> DATA_LOADED -> TRAINED`; `TRAINED` may
/// go back to `DATA_LOADED` when a further batch is staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    Uninitialized,
    Initialized,
    DataLoaded,
    Trained,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Uninitialized => write!(f, "UNINITIALIZED"),
            EngineState::Initialized => write!(f, "INITIALIZED"),
            EngineState::DataLoaded => write!(f, "DATA_LOADED"),
            EngineState::Trained => write!(f, "TRAINED"),
        }
    }
}

impl EngineState {
    pub fn can_load(&self) -> bool {
        matches!(
            self,
            EngineState::Initialized | EngineState::DataLoaded | EngineState::Trained
        )
    }

    pub fn can_train(&self) -> bool {
        matches!(self, EngineState::DataLoaded)
    }

    pub fn require_load(&self) -> Result<(), EngineError> {
        if self.can_load() {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation: "loadData",
                state: *self,
            })
        }
    }

    pub fn require_train(&self) -> Result<(), EngineError> {
        if self.can_train() {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation: "train",
                state: *self,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(!EngineState::Uninitialized.can_load());
        assert!(EngineState::Initialized.can_load());
        assert!(EngineState::Trained.can_load());

        assert!(!EngineState::Initialized.can_train());
        assert!(EngineState::DataLoaded.can_train());
        assert!(!EngineState::Trained.can_train());
    }

    #[test]
    fn test_wire_name() {
        assert_eq!(
            serde_json::to_string(&EngineState::DataLoaded).unwrap(),
            "\"DATA_LOADED\""
        );
    }
}

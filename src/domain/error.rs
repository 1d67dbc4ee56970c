use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid selection order: level '{level}' cannot be selected before '{parent}'")]
    InvalidSelectionOrder { level: String, parent: String },

    #[error("Fetch failed for level '{level}': {message}")]
    FetchFailed { level: String, message: String },

    #[error("Level index {index} out of range (chain has {len} levels)")]
    LevelOutOfRange { index: usize, len: usize },

    #[error("Level '{level}' is still loading")]
    LevelLoading { level: String },

    #[error("Unknown option '{value}' for level '{level}'")]
    UnknownOption { level: String, value: String },

    #[error("Chain {chain_id} is closed")]
    ChainClosed { chain_id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn invalid_selection_order(level: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::InvalidSelectionOrder {
            level: level.into(),
            parent: parent.into(),
        }
    }

    pub fn fetch_failed(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            level: level.into(),
            message: message.into(),
        }
    }

    pub fn level_out_of_range(index: usize, len: usize) -> Self {
        Self::LevelOutOfRange { index, len }
    }

    pub fn level_loading(level: impl Into<String>) -> Self {
        Self::LevelLoading {
            level: level.into(),
        }
    }

    pub fn unknown_option(level: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownOption {
            level: level.into(),
            value: value.into(),
        }
    }

    pub fn chain_closed(chain_id: impl Into<String>) -> Self {
        Self::ChainClosed {
            chain_id: chain_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

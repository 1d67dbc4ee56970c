//! Level definition validation

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::level::LevelDefinition;

/// Maximum length for level keys
pub const MAX_LEVEL_KEY_LENGTH: usize = 50;

/// Lowercase alphanumerics, underscores and hyphens; must start with an alphanumeric
static LEVEL_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());

/// Level validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum LevelValidationError {
    /// Level key is empty
    EmptyKey,
    /// Level key exceeds maximum length
    KeyTooLong { length: usize, max: usize },
    /// Level key contains invalid characters
    InvalidKeyFormat { key: String },
    /// Chain has no levels
    EmptyChain,
    /// The same key appears twice
    DuplicateKey { key: String },
    /// Root level declares a parent
    RootHasParent { key: String, parent: String },
    /// Level does not depend on the level right above it
    BrokenDependency {
        key: String,
        expected: String,
        actual: Option<String>,
    },
}

impl fmt::Display for LevelValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "Level key cannot be empty"),
            Self::KeyTooLong { length, max } => {
                write!(f, "Level key too long: {} characters (max {})", length, max)
            }
            Self::InvalidKeyFormat { key } => write!(
                f,
                "Invalid level key format '{}': must be lowercase alphanumeric with '_' or '-'",
                key
            ),
            Self::EmptyChain => write!(f, "Chain must have at least one level"),
            Self::DuplicateKey { key } => write!(f, "Duplicate level key '{}'", key),
            Self::RootHasParent { key, parent } => {
                write!(f, "Root level '{}' cannot depend on '{}'", key, parent)
            }
            Self::BrokenDependency {
                key,
                expected,
                actual,
            } => write!(
                f,
                "Level '{}' must depend on '{}', found {}",
                key,
                expected,
                actual.as_deref().unwrap_or("no parent")
            ),
        }
    }
}

impl std::error::Error for LevelValidationError {}

/// Validate a level key
pub fn validate_level_key(key: &str) -> Result<(), LevelValidationError> {
    if key.is_empty() {
        return Err(LevelValidationError::EmptyKey);
    }

    if key.len() > MAX_LEVEL_KEY_LENGTH {
        return Err(LevelValidationError::KeyTooLong {
            length: key.len(),
            max: MAX_LEVEL_KEY_LENGTH,
        });
    }

    if !LEVEL_KEY_PATTERN.is_match(key) {
        return Err(LevelValidationError::InvalidKeyFormat {
            key: key.to_string(),
        });
    }

    Ok(())
}

/// Validate the ordering of a chain: unique keys, a parentless root and every
/// other level depending on the one directly above it
pub fn validate_chain(levels: &[LevelDefinition]) -> Result<(), LevelValidationError> {
    let Some(root) = levels.first() else {
        return Err(LevelValidationError::EmptyChain);
    };

    if let Some(parent) = root.depends_on() {
        return Err(LevelValidationError::RootHasParent {
            key: root.key().to_string(),
            parent: parent.to_string(),
        });
    }

    let mut seen = HashSet::new();

    for (index, level) in levels.iter().enumerate() {
        if !seen.insert(level.key().as_str()) {
            return Err(LevelValidationError::DuplicateKey {
                key: level.key().to_string(),
            });
        }

        if index == 0 {
            continue;
        }

        let expected = levels[index - 1].key();

        if level.depends_on() != Some(expected) {
            return Err(LevelValidationError::BrokenDependency {
                key: level.key().to_string(),
                expected: expected.to_string(),
                actual: level.depends_on().map(|p| p.to_string()),
            });
        }
    }

    Ok(())
}

//! Level, option and chain definitions

use serde::{Deserialize, Serialize};

use super::validation::{validate_chain, validate_level_key, LevelValidationError};
use crate::domain::DomainError;

/// Level identifier (e.g. "company", "branch")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LevelKey(String);

impl LevelKey {
    /// Create a new LevelKey after validation
    pub fn new(key: impl Into<String>) -> Result<Self, LevelValidationError> {
        let key = key.into();
        validate_level_key(&key)?;
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LevelKey {
    type Error = LevelValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LevelKey> for String {
    fn from(key: LevelKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for LevelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A selectable entry of a level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// One position in a selection chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    key: LevelKey,
    depends_on: Option<LevelKey>,
    #[serde(default)]
    required: bool,
}

impl LevelDefinition {
    /// Root level, fetched without a parent value
    pub fn root(key: LevelKey) -> Self {
        Self {
            key,
            depends_on: None,
            required: false,
        }
    }

    /// Level whose options depend on `parent`'s selection
    pub fn child(key: LevelKey, parent: LevelKey) -> Self {
        Self {
            key,
            depends_on: Some(parent),
            required: false,
        }
    }

    /// Mark an empty result at this level as something the user must be told about
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn key(&self) -> &LevelKey {
        &self.key
    }

    pub fn depends_on(&self) -> Option<&LevelKey> {
        self.depends_on.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_root(&self) -> bool {
        self.depends_on.is_none()
    }
}

/// Ordered, validated list of levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainDefinition {
    levels: Vec<LevelDefinition>,
}

impl ChainDefinition {
    pub fn new(levels: Vec<LevelDefinition>) -> Result<Self, DomainError> {
        validate_chain(&levels).map_err(|e| DomainError::validation(e.to_string()))?;
        Ok(Self { levels })
    }

    /// Build a linear chain from `(key, required)` pairs; each level depends on the previous one
    pub fn linear<K, I>(levels: I) -> Result<Self, DomainError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, bool)>,
    {
        let mut definitions: Vec<LevelDefinition> = Vec::new();

        for (key, required) in levels {
            let key = LevelKey::new(key).map_err(|e| DomainError::validation(e.to_string()))?;

            let definition = match definitions.last() {
                Some(parent) => LevelDefinition::child(key, parent.key().clone()),
                None => LevelDefinition::root(key),
            };

            definitions.push(definition.required(required));
        }

        Self::new(definitions)
    }

    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&LevelDefinition> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Position of the level with the given key
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.levels.iter().position(|l| l.key().as_str() == key)
    }
}

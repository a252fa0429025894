//! Environment variable value objects owned by a bot definition.

use super::RegistryDomainError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A single environment variable injected into a bot container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    key: String,
    value: String,
}

impl EnvironmentVariable {
    /// Creates a validated environment variable.
    ///
    /// The key is trimmed; the value is kept verbatim and may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::EmptyEnvironmentKey`] for blank keys,
    /// [`RegistryDomainError::InvalidEnvironmentKey`] when the key contains
    /// `=`, whitespace or NUL, and
    /// [`RegistryDomainError::InvalidEnvironmentValue`] when the value holds a
    /// line break or NUL.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, RegistryDomainError> {
        let normalized_key = key.into().trim().to_owned();
        if normalized_key.is_empty() {
            return Err(RegistryDomainError::EmptyEnvironmentKey);
        }

        let has_forbidden = normalized_key
            .chars()
            .any(|character| character == '=' || character == '\0' || character.is_whitespace());
        if has_forbidden {
            return Err(RegistryDomainError::InvalidEnvironmentKey(normalized_key));
        }

        // Values are handed to the engine one per line.
        let raw_value: String = value.into();
        if raw_value.contains(['\n', '\r', '\0']) {
            return Err(RegistryDomainError::InvalidEnvironmentValue(normalized_key));
        }

        Ok(Self {
            key: normalized_key,
            value: raw_value,
        })
    }

    /// Returns the variable name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the variable value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// The complete environment of one bot, replaced wholesale on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentSet(Vec<EnvironmentVariable>);

impl EnvironmentSet {
    /// Creates an empty environment.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Builds an environment from raw key/value pairs.
    ///
    /// Pairs whose key is blank are skipped, matching form submissions that
    /// leave trailing rows empty. Order of first appearance is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::DuplicateEnvironmentKey`] when a key
    /// repeats, or key validation errors from [`EnvironmentVariable::new`].
    pub fn from_pairs<K, V>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, RegistryDomainError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut variables = Vec::new();
        for (key, value) in pairs {
            let raw_key: String = key.into();
            if raw_key.trim().is_empty() {
                continue;
            }
            let variable = EnvironmentVariable::new(raw_key, value)?;
            if !seen.insert(variable.key().to_owned()) {
                return Err(RegistryDomainError::DuplicateEnvironmentKey(
                    variable.key().to_owned(),
                ));
            }
            variables.push(variable);
        }
        Ok(Self(variables))
    }

    /// Builds an environment from already validated variables.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryDomainError::DuplicateEnvironmentKey`] when a key
    /// repeats.
    pub fn from_variables(
        variables: impl IntoIterator<Item = EnvironmentVariable>,
    ) -> Result<Self, RegistryDomainError> {
        Self::from_pairs(
            variables
                .into_iter()
                .map(|variable| (variable.key, variable.value)),
        )
    }

    /// Returns the variables in insertion order.
    #[must_use]
    pub fn variables(&self) -> &[EnvironmentVariable] {
        &self.0
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the environment is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|variable| variable.key() == key)
            .map(EnvironmentVariable::value)
    }

    /// Returns the environment as a sorted key/value map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|variable| (variable.key.clone(), variable.value.clone()))
            .collect()
    }
}

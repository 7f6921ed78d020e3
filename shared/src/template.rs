use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigurationModel, ValidationError};

/// Opaque template identity, allocated by the template store from the
/// creation time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(u64);

impl TemplateId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TemplateId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A named, stored configuration. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    id: TemplateId,
    name: String,
    config: ConfigurationModel,
}

impl Template {
    pub fn new(id: TemplateId, name: impl Into<String>, config: ConfigurationModel) -> Self {
        Self {
            id,
            name: name.into(),
            config,
        }
    }

    /// Trims `name`, rejecting names that are empty or whitespace-only.
    pub fn validate_name(name: &str) -> Result<&str, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(trimmed)
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A copy of the stored configuration.
    pub fn config(&self) -> ConfigurationModel {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(Template::validate_name("  Studio ").unwrap(), "Studio");
        assert_eq!(Template::validate_name(""), Err(ValidationError::EmptyName));
        assert_eq!(Template::validate_name(" \t\n"), Err(ValidationError::EmptyName));
    }

    #[test]
    fn ids_parse_and_serialize_as_numbers() {
        let id: TemplateId = " 1700000000123 ".parse().unwrap();
        assert_eq!(id.get(), 1_700_000_000_123);
        assert_eq!(serde_json::to_string(&id).unwrap(), "1700000000123");
        assert!("abc".parse::<TemplateId>().is_err());
    }
}

//! Environment-driven configuration.
//!
//! # Environment Variables
//! - `CLINIC_DATABASE_PATH`: SQLite database file (unset or empty: in-memory)
//! - `CLINIC_DELETE_POLICY`: `restrict` (default) or `cascade`

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATABASE_PATH_VAR: &str = "CLINIC_DATABASE_PATH";
pub const DELETE_POLICY_VAR: &str = "CLINIC_DELETE_POLICY";

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: expected one of {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// What deleting a patient does to the medical tests it still owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Refuse the delete with a foreign key error.
    #[default]
    Restrict,
    /// Delete the patient's tests along with the patient.
    Cascade,
}

impl FromStr for DeletePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restrict" => Ok(DeletePolicy::Restrict),
            "cascade" => Ok(DeletePolicy::Cascade),
            _ => Err(ConfigError::InvalidValue {
                var: DELETE_POLICY_VAR,
                value: s.to_string(),
                expected: "restrict, cascade",
            }),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletePolicy::Restrict => f.write_str("restrict"),
            DeletePolicy::Cascade => f.write_str("cascade"),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Database file, `None` for in-memory
    pub database_path: Option<PathBuf>,
    /// Patient delete behaviour
    pub delete_policy: DeletePolicy,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup(DATABASE_PATH_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let delete_policy = match lookup(DELETE_POLICY_VAR) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => DeletePolicy::default(),
        };

        Ok(Self {
            database_path,
            delete_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.database_path.is_none());
        assert_eq!(config.delete_policy, DeletePolicy::Restrict);
    }

    #[test]
    fn test_reads_values() {
        let config = Config::from_lookup(lookup_from(&[
            (DATABASE_PATH_VAR, "/tmp/clinic.db"),
            (DELETE_POLICY_VAR, "Cascade"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/clinic.db")));
        assert_eq!(config.delete_policy, DeletePolicy::Cascade);
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            (DATABASE_PATH_VAR, ""),
            (DELETE_POLICY_VAR, " "),
        ]))
        .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_policy() {
        let err = Config::from_lookup(lookup_from(&[(DELETE_POLICY_VAR, "orphan")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { value, .. } if value == "orphan"));
    }

    #[test]
    fn test_policy_display_roundtrips() {
        for policy in [DeletePolicy::Restrict, DeletePolicy::Cascade] {
            assert_eq!(policy.to_string().parse::<DeletePolicy>().unwrap(), policy);
        }
    }
}

pub mod path;

#[cfg(test)]
mod config_test;

use std::{collections::BTreeMap, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::option::OptionValue;

/// Represents all possible errors loading a [ProfileConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// A profile describes how the events of a device should be translated
/// before they reach the output device.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ProfileConfig {
    pub version: u32,
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    /// Primary translators keyed by source event name
    #[serde(default)]
    pub mapping: Vec<MappingConfig>,
    /// Translators listening on more than one event
    #[serde(default)]
    pub advanced: Vec<AdvancedMappingConfig>,
    /// Option values to apply to each device
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

impl ProfileConfig {
    /// Load a [ProfileConfig] from the given YAML string
    pub fn from_yaml(content: String) -> Result<ProfileConfig, LoadError> {
        let profile: ProfileConfig = serde_yaml::from_str(content.as_str())?;
        Ok(profile)
    }

    /// Load a [ProfileConfig] from the given YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<ProfileConfig, LoadError> {
        let file = std::fs::File::open(path)?;
        let profile: ProfileConfig = serde_yaml::from_reader(file)?;
        Ok(profile)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct MappingConfig {
    /// Source event name (or alias)
    pub event: String,
    pub translator: TranslatorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct AdvancedMappingConfig {
    /// Source event names (or aliases) the translator listens on
    pub events: Vec<String>,
    pub translator: AdvancedTranslatorConfig,
}

/// Configuration of a primary translator. When no target is given, the
/// source event name is used.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranslatorConfig {
    /// Pass the value through unchanged
    Identity { target: Option<String> },
    /// Multiply the value by a constant factor
    Scale {
        target: Option<String>,
        factor: f64,
    },
    /// Negate an axis value
    Invert { target: Option<String> },
    /// Turn an axis into a button that is pressed at or above the threshold
    Threshold {
        target: Option<String>,
        threshold: i64,
    },
    /// Pass the value through and keep re-emitting it while the device idles
    Repeat { target: Option<String> },
}

/// Configuration of an advanced translator
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvancedTranslatorConfig {
    /// Emit 1 while every listened event is non-zero, 0 once any is released
    Chord { target: String },
    /// Combine a negative and a positive button into a single axis
    ButtonAxis { target: String, max: i64 },
}

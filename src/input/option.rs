use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use super::error::InputError;

/// Tagged value of a configuration option
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl OptionValue {
    /// Returns the name of the kind of value this is
    pub fn kind(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Float(_) => "float",
            OptionValue::String(_) => "string",
        }
    }

    /// Coerce the given value into the same kind as this value. Integers are
    /// accepted where floats are expected; every other mismatch is refused.
    fn coerce(&self, value: OptionValue) -> Option<OptionValue> {
        match (self, value) {
            (OptionValue::Bool(_), v @ OptionValue::Bool(_)) => Some(v),
            (OptionValue::Int(_), v @ OptionValue::Int(_)) => Some(v),
            (OptionValue::Float(_), v @ OptionValue::Float(_)) => Some(v),
            (OptionValue::Float(_), OptionValue::Int(v)) => Some(OptionValue::Float(v as f64)),
            (OptionValue::String(_), v @ OptionValue::String(_)) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(v) => write!(f, "{v}"),
            OptionValue::Int(v) => write!(f, "{v}"),
            OptionValue::Float(v) => write!(f, "{v}"),
            OptionValue::String(v) => write!(f, "{v}"),
        }
    }
}

/// Declaration of a named option along with its default value
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDecl {
    pub name: String,
    pub description: String,
    pub value: OptionValue,
}

impl OptionDecl {
    pub fn new(name: &str, description: &str, value: OptionValue) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            value,
        }
    }
}

/// Current state of a declared option
pub type OptionInfo = OptionDecl;

/// Table of options owned by a single input source
#[derive(Debug, Clone, Default)]
pub struct OptionTable {
    options: BTreeMap<String, OptionInfo>,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new option
    pub fn register_option(&mut self, decl: OptionDecl) -> Result<(), InputError> {
        if self.options.contains_key(&decl.name) {
            return Err(InputError::DuplicateName(decl.name));
        }
        self.options.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Validate the given value against the declared option without storing
    /// it. Returns the value coerced to the declared kind.
    pub fn check(&self, name: &str, value: OptionValue) -> Result<OptionValue, InputError> {
        let Some(info) = self.options.get(name) else {
            return Err(InputError::UnknownOption(name.to_string()));
        };
        let kind = value.kind();
        info.value.coerce(value).ok_or_else(|| {
            InputError::InvalidOptionValue(
                name.to_string(),
                format!("expected {}, got {kind}", info.value.kind()),
            )
        })
    }

    /// Store the given value for the option
    pub fn update_option(&mut self, name: &str, value: OptionValue) -> Result<(), InputError> {
        let value = self.check(name, value)?;
        if let Some(info) = self.options.get_mut(name) {
            info.value = value;
        }
        Ok(())
    }

    pub fn remove_option(&mut self, name: &str) -> Result<OptionInfo, InputError> {
        self.options
            .remove(name)
            .ok_or_else(|| InputError::UnknownOption(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name).map(|info| &info.value)
    }

    /// Returns all options sorted by name
    pub fn list_options(&self) -> Vec<OptionInfo> {
        self.options.values().cloned().collect()
    }
}

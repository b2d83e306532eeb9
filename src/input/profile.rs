use std::collections::BTreeMap;

use crate::config::{AdvancedMappingConfig, AdvancedTranslatorConfig, ProfileConfig, TranslatorConfig};

use super::{
    option::OptionValue,
    translator::{
        advanced::build_advanced_translator, builtin::build_translator, AdvancedTranslator,
        Translator,
    },
};

/// Immutable snapshot of a translation profile. Devices receive a shared
/// reference to a snapshot; changing the profile means handing out a new
/// snapshot rather than mutating this one.
///
/// Lookups build fresh translator instances, so every device owns the state
/// of its own translators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    name: String,
    mapping: BTreeMap<String, TranslatorConfig>,
    advanced: Vec<AdvancedMappingConfig>,
    options: BTreeMap<String, OptionValue>,
}

impl Profile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Build a profile snapshot from the given configuration. Later mappings
    /// for the same event replace earlier ones.
    pub fn from_config(config: &ProfileConfig) -> Self {
        let mut profile = Self::new(config.name.as_str());
        for mapping in config.mapping.iter() {
            profile
                .mapping
                .insert(mapping.event.clone(), mapping.translator.clone());
        }
        profile.advanced = config.advanced.clone();
        profile.options = config.options.clone();
        profile
    }

    /// Returns the profile with the given primary translator mapping
    pub fn with_mapping(mut self, event: &str, translator: TranslatorConfig) -> Self {
        self.mapping.insert(event.to_string(), translator);
        self
    }

    /// Returns the profile with the given advanced translator mapping
    pub fn with_advanced(mut self, events: &[&str], translator: AdvancedTranslatorConfig) -> Self {
        self.advanced.push(AdvancedMappingConfig {
            events: events.iter().map(|e| e.to_string()).collect(),
            translator,
        });
        self
    }

    /// Returns the profile with the given option value
    pub fn with_option(mut self, name: &str, value: OptionValue) -> Self {
        self.options.insert(name.to_string(), value);
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns a new translator for the given event name, if one is mapped
    pub fn get_mapping(&self, event: &str) -> Option<Box<dyn Translator>> {
        self.mapping.get(event).map(build_translator)
    }

    /// Returns the names of all events with a mapped translator
    pub fn mapped_events(&self) -> impl Iterator<Item = &str> {
        self.mapping.keys().map(String::as_str)
    }

    /// Returns new instances of every advanced translator along with the
    /// event names each one listens on.
    pub fn get_advanced(&self) -> Vec<(Vec<String>, Box<dyn AdvancedTranslator>)> {
        self.advanced
            .iter()
            .map(|adv| (adv.events.clone(), build_advanced_translator(&adv.translator)))
            .collect()
    }

    /// Returns the configured value for the given option
    pub fn get_option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Returns all configured option values
    pub fn options(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }
}

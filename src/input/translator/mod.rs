//! Translators rewrite the raw values of source events into output values.
//! A [Translator] is bound to a single event, while an [AdvancedTranslator]
//! listens on a set of events and derives output from their combination.
pub mod advanced;
pub mod builtin;

#[cfg(test)]
mod translator_test;

use std::fmt::Debug;

use super::{event::EventChange, output::OutputEvent};

/// A synthetic value to feed back into the translation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    pub id: usize,
    pub value: i64,
    /// Do not notify advanced translators about this value
    pub skip_adv_trans: bool,
}

/// Collects the output of a single translator invocation
pub struct Emitter<'a> {
    source_id: usize,
    source_name: &'a str,
    outputs: &'a mut Vec<OutputEvent>,
    injections: &'a mut Vec<Injection>,
}

impl<'a> Emitter<'a> {
    pub fn new(
        source_id: usize,
        source_name: &'a str,
        outputs: &'a mut Vec<OutputEvent>,
        injections: &'a mut Vec<Injection>,
    ) -> Self {
        Self {
            source_id,
            source_name,
            outputs,
            injections,
        }
    }

    /// Id of the event being translated
    pub fn source_id(&self) -> usize {
        self.source_id
    }

    /// Canonical name of the event being translated
    pub fn source_name(&self) -> &str {
        self.source_name
    }

    /// Write the given value to the output event with the given name
    pub fn emit(&mut self, target: &str, value: i64) {
        self.outputs
            .push(OutputEvent::new(self.source_id, target, value));
    }

    /// Queue a synthetic value for the given event. Injected values are
    /// processed after the current translation finishes.
    pub fn inject(&mut self, id: usize, value: i64, skip_adv_trans: bool) {
        self.injections.push(Injection {
            id,
            value,
            skip_adv_trans,
        });
    }
}

/// Capability that translates a change of one event into zero or more output
/// values.
pub trait Translator: Send + Debug {
    /// Translate the given change
    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>);

    /// Returns true if this translator should be asked to re-emit its output
    /// periodically while the device is otherwise idle.
    fn is_recurring(&self) -> bool {
        false
    }

    /// Re-emit the current output of the translator
    fn process_recurring(&mut self, _out: &mut Emitter<'_>) {}
}

/// Capability that derives output from changes on a set of events
pub trait AdvancedTranslator: Send + Debug {
    /// Called whenever the translator is (re)attached to a device with the
    /// resolved ids of the events it listens on, in configuration order.
    fn attach(&mut self, _ids: &[usize]) {}

    /// Process a change of one of the events this translator listens on
    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>);
}

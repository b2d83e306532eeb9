use crate::{config::TranslatorConfig, input::event::EventChange};

use super::{Emitter, Translator};

/// Build a new translator instance from the given configuration
pub fn build_translator(config: &TranslatorConfig) -> Box<dyn Translator> {
    match config {
        TranslatorConfig::Identity { target } => Box::new(IdentityTranslator::new(target.clone())),
        TranslatorConfig::Scale { target, factor } => {
            Box::new(ScaleTranslator::new(target.clone(), *factor))
        }
        TranslatorConfig::Invert { target } => Box::new(InvertTranslator::new(target.clone())),
        TranslatorConfig::Threshold { target, threshold } => {
            Box::new(ThresholdTranslator::new(target.clone(), *threshold))
        }
        TranslatorConfig::Repeat { target } => Box::new(RepeatTranslator::new(target.clone())),
    }
}

/// Returns the configured target, or the name of the event being translated
fn target_or_source(target: &Option<String>, out: &Emitter<'_>) -> String {
    match target {
        Some(target) => target.clone(),
        None => out.source_name().to_string(),
    }
}

/// Passes values through unchanged, optionally under a different name.
/// Events without a bound translator behave as if bound to this.
#[derive(Debug, Clone, Default)]
pub struct IdentityTranslator {
    target: Option<String>,
}

impl IdentityTranslator {
    pub fn new(target: Option<String>) -> Self {
        Self { target }
    }
}

impl Translator for IdentityTranslator {
    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>) {
        let target = target_or_source(&self.target, out);
        out.emit(&target, change.value);
    }
}

/// Multiplies values by a constant factor
#[derive(Debug, Clone)]
pub struct ScaleTranslator {
    target: Option<String>,
    factor: f64,
}

impl ScaleTranslator {
    pub fn new(target: Option<String>, factor: f64) -> Self {
        Self { target, factor }
    }
}

impl Translator for ScaleTranslator {
    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>) {
        let target = target_or_source(&self.target, out);
        let value = (change.value as f64 * self.factor).round() as i64;
        out.emit(&target, value);
    }
}

/// Negates axis values
#[derive(Debug, Clone, Default)]
pub struct InvertTranslator {
    target: Option<String>,
}

impl InvertTranslator {
    pub fn new(target: Option<String>) -> Self {
        Self { target }
    }
}

impl Translator for InvertTranslator {
    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>) {
        let target = target_or_source(&self.target, out);
        out.emit(&target, change.value.saturating_neg());
    }
}

/// Turns an axis into a button. Only transitions across the threshold are
/// emitted.
#[derive(Debug, Clone)]
pub struct ThresholdTranslator {
    target: Option<String>,
    threshold: i64,
    pressed: bool,
}

impl ThresholdTranslator {
    pub fn new(target: Option<String>, threshold: i64) -> Self {
        Self {
            target,
            threshold,
            pressed: false,
        }
    }
}

impl Translator for ThresholdTranslator {
    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>) {
        let pressed = change.value >= self.threshold;
        if pressed == self.pressed {
            return;
        }
        self.pressed = pressed;
        let target = target_or_source(&self.target, out);
        out.emit(&target, pressed as i64);
    }
}

/// Passes values through and keeps re-emitting the last one as a recurring
/// event. Useful for output devices that forget state when idle.
#[derive(Debug, Clone, Default)]
pub struct RepeatTranslator {
    target: Option<String>,
    last: Option<(String, i64)>,
}

impl RepeatTranslator {
    pub fn new(target: Option<String>) -> Self {
        Self { target, last: None }
    }
}

impl Translator for RepeatTranslator {
    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>) {
        let target = target_or_source(&self.target, out);
        out.emit(&target, change.value);
        self.last = Some((target, change.value));
    }

    fn is_recurring(&self) -> bool {
        true
    }

    fn process_recurring(&mut self, out: &mut Emitter<'_>) {
        if let Some((target, value)) = self.last.as_ref() {
            out.emit(target, *value);
        }
    }
}

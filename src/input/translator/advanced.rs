use crate::{config::AdvancedTranslatorConfig, input::event::EventChange};

use super::{AdvancedTranslator, Emitter};

/// Build a new advanced translator instance from the given configuration
pub fn build_advanced_translator(config: &AdvancedTranslatorConfig) -> Box<dyn AdvancedTranslator> {
    match config {
        AdvancedTranslatorConfig::Chord { target } => Box::new(ChordTranslator::new(target)),
        AdvancedTranslatorConfig::ButtonAxis { target, max } => {
            Box::new(ButtonAxisTranslator::new(target, *max))
        }
    }
}

/// Emits 1 once every listened event is non-zero, and 0 once any of them is
/// released again.
#[derive(Debug, Clone)]
pub struct ChordTranslator {
    target: String,
    ids: Vec<usize>,
    values: Vec<i64>,
    active: bool,
}

impl ChordTranslator {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            ids: Vec::new(),
            values: Vec::new(),
            active: false,
        }
    }
}

impl AdvancedTranslator for ChordTranslator {
    fn attach(&mut self, ids: &[usize]) {
        self.ids = ids.to_vec();
        self.values = vec![0; ids.len()];
        self.active = false;
    }

    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>) {
        let Some(idx) = self.ids.iter().position(|id| *id == change.id) else {
            return;
        };
        self.values[idx] = change.value;

        let all_pressed = !self.values.is_empty() && self.values.iter().all(|v| *v != 0);
        if all_pressed == self.active {
            return;
        }
        self.active = all_pressed;
        out.emit(&self.target, all_pressed as i64);
    }
}

/// Combines two buttons into one axis. The first listened event pushes the
/// axis towards `-max`, the second towards `max`.
#[derive(Debug, Clone)]
pub struct ButtonAxisTranslator {
    target: String,
    max: i64,
    negative: Option<usize>,
    positive: Option<usize>,
    state: (bool, bool),
}

impl ButtonAxisTranslator {
    pub fn new(target: &str, max: i64) -> Self {
        Self {
            target: target.to_string(),
            max,
            negative: None,
            positive: None,
            state: (false, false),
        }
    }
}

impl AdvancedTranslator for ButtonAxisTranslator {
    fn attach(&mut self, ids: &[usize]) {
        self.negative = ids.first().copied();
        self.positive = ids.get(1).copied();
        self.state = (false, false);
    }

    fn process(&mut self, change: EventChange, out: &mut Emitter<'_>) {
        let pressed = change.value != 0;
        if Some(change.id) == self.negative {
            self.state.0 = pressed;
        } else if Some(change.id) == self.positive {
            self.state.1 = pressed;
        } else {
            return;
        }

        let value = match self.state {
            (true, false) => -self.max,
            (false, true) => self.max,
            _ => 0,
        };
        out.emit(&self.target, value);
    }
}

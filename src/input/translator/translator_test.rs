use crate::{
    config::{AdvancedTranslatorConfig, TranslatorConfig},
    input::{
        event::EventChange,
        output::OutputEvent,
        translator::{
            advanced::build_advanced_translator, builtin::build_translator, AdvancedTranslator,
            Emitter, Injection, Translator,
        },
    },
};

fn run(trans: &mut dyn Translator, id: usize, name: &str, value: i64) -> Vec<OutputEvent> {
    let mut outputs = Vec::new();
    let mut injections: Vec<Injection> = Vec::new();
    let mut out = Emitter::new(id, name, &mut outputs, &mut injections);
    trans.process(EventChange::new(id, value), &mut out);
    outputs
}

fn run_adv(trans: &mut dyn AdvancedTranslator, id: usize, value: i64) -> Vec<OutputEvent> {
    let mut outputs = Vec::new();
    let mut injections: Vec<Injection> = Vec::new();
    let mut out = Emitter::new(id, "", &mut outputs, &mut injections);
    trans.process(EventChange::new(id, value), &mut out);
    outputs
}

#[test]
fn test_identity_uses_source_name() {
    let mut trans = build_translator(&TranslatorConfig::Identity { target: None });
    let outputs = run(trans.as_mut(), 3, "first", 1);
    assert_eq!(outputs, vec![OutputEvent::new(3, "first", 1)]);
}

#[test]
fn test_scale() {
    let mut trans = build_translator(&TranslatorConfig::Scale {
        target: Some("left_x".into()),
        factor: 2.0,
    });
    let outputs = run(trans.as_mut(), 0, "stick_x", 3);
    assert_eq!(outputs, vec![OutputEvent::new(0, "left_x", 6)]);
}

#[test]
fn test_invert() {
    let mut trans = build_translator(&TranslatorConfig::Invert { target: None });
    assert_eq!(run(trans.as_mut(), 0, "y", 120)[0].value, -120);
    assert_eq!(run(trans.as_mut(), 0, "y", i64::MIN)[0].value, i64::MAX);
}

#[test]
fn test_threshold_only_emits_transitions() {
    let mut trans = build_translator(&TranslatorConfig::Threshold {
        target: Some("tr".into()),
        threshold: 100,
    });
    assert!(run(trans.as_mut(), 0, "rz", 20).is_empty());
    assert_eq!(run(trans.as_mut(), 0, "rz", 150), vec![OutputEvent::new(0, "tr", 1)]);
    assert!(run(trans.as_mut(), 0, "rz", 200).is_empty());
    assert_eq!(run(trans.as_mut(), 0, "rz", 10), vec![OutputEvent::new(0, "tr", 0)]);
}

#[test]
fn test_repeat_reemits_last_value() {
    let mut trans = build_translator(&TranslatorConfig::Repeat { target: None });
    assert!(trans.is_recurring());

    let mut outputs = Vec::new();
    let mut injections = Vec::new();
    let mut out = Emitter::new(0, "throttle", &mut outputs, &mut injections);
    trans.process_recurring(&mut out);
    assert!(outputs.is_empty());

    run(trans.as_mut(), 0, "throttle", 42);
    let mut out = Emitter::new(0, "throttle", &mut outputs, &mut injections);
    trans.process_recurring(&mut out);
    assert_eq!(outputs, vec![OutputEvent::new(0, "throttle", 42)]);
}

#[test]
fn test_chord() {
    let mut trans = build_advanced_translator(&AdvancedTranslatorConfig::Chord {
        target: "both".into(),
    });
    trans.attach(&[0, 1]);
    assert!(run_adv(trans.as_mut(), 0, 1).is_empty());
    assert_eq!(run_adv(trans.as_mut(), 1, 1), vec![OutputEvent::new(1, "both", 1)]);
    assert!(run_adv(trans.as_mut(), 1, 1).is_empty());
    assert_eq!(run_adv(trans.as_mut(), 0, 0), vec![OutputEvent::new(0, "both", 0)]);
    assert!(run_adv(trans.as_mut(), 7, 1).is_empty());
}

#[test]
fn test_button_axis() {
    let mut trans = build_advanced_translator(&AdvancedTranslatorConfig::ButtonAxis {
        target: "hat_x".into(),
        max: 1,
    });
    trans.attach(&[4, 5]);
    assert_eq!(run_adv(trans.as_mut(), 4, 1)[0].value, -1);
    assert_eq!(run_adv(trans.as_mut(), 5, 1)[0].value, 0);
    assert_eq!(run_adv(trans.as_mut(), 4, 0)[0].value, 1);
    assert_eq!(run_adv(trans.as_mut(), 5, 0)[0].value, 0);
}

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

use crate::input::{
    error::InputError,
    event::{EventChange, EventDecl, EventRegistry, EventState, SourceEvent},
    manager::ManagerContext,
    option::{OptionDecl, OptionTable},
    output::{OutputEvent, OutputSlot},
    profile::Profile,
    translator::{
        builtin::IdentityTranslator, AdvancedTranslator, Emitter, Injection, Translator,
    },
};

use super::SourceOptions;

/// Translators bound to a single event id
#[derive(Debug, Default)]
pub struct EventMapping {
    /// Primary translator. Unbound events pass their value through.
    trans: Option<Box<dyn Translator>>,
    /// Keys of the advanced translators listening on this event
    attached: Vec<String>,
}

/// An advanced translator along with the event names it listens on
#[derive(Debug)]
pub struct AdvEntry {
    pub fields: Vec<String>,
    trans: Box<dyn AdvancedTranslator>,
}

/// The translation tables of a single input source. The pipeline is owned
/// by the device thread; other threads reach it only through the device's
/// command channel.
#[derive(Debug)]
pub struct EventPipeline {
    name: String,
    context: Arc<ManagerContext>,
    registry: EventRegistry,
    ev_map: Vec<EventMapping>,
    adv_trans: HashMap<String, AdvEntry>,
    options: OptionTable,
    output: Option<Box<dyn OutputSlot>>,
    recurring: Vec<usize>,
    do_recurring_events: bool,
    recurring_interval: Duration,
    last_recurring_update: Instant,
    injection_budget: usize,
    pending: VecDeque<Injection>,
}

impl EventPipeline {
    pub fn new(name: &str, context: Arc<ManagerContext>, options: &SourceOptions) -> Self {
        Self {
            name: name.to_string(),
            context,
            registry: EventRegistry::new(),
            ev_map: Vec::new(),
            adv_trans: HashMap::new(),
            options: OptionTable::new(),
            output: None,
            recurring: Vec::new(),
            do_recurring_events: options.do_recurring_events,
            recurring_interval: options.recurring_interval,
            last_recurring_update: Instant::now(),
            injection_budget: options.injection_budget,
            pending: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn context(&self) -> &ManagerContext {
        &self.context
    }

    /// Declare a new event on this device
    pub fn register_event(&mut self, decl: EventDecl) -> Result<usize, InputError> {
        let id = self.registry.register_event(decl)?;
        self.ev_map.push(EventMapping::default());
        Ok(id)
    }

    pub fn toggle_event(&mut self, id: usize, state: EventState) -> Result<(), InputError> {
        log::debug!("{}: setting event {id} to {state:?}", self.name);
        self.registry.toggle_event(id, state)
    }

    pub fn get_events(&self) -> &[SourceEvent] {
        self.registry.get_events()
    }

    pub fn register_option(&mut self, decl: OptionDecl) -> Result<(), InputError> {
        self.options.register_option(decl)
    }

    pub fn options(&self) -> &OptionTable {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut OptionTable {
        &mut self.options
    }

    /// Replace the output device that translated values are written to
    pub fn set_slot(&mut self, output: Option<Box<dyn OutputSlot>>) {
        self.output = output;
    }

    pub fn set_recurring_events(&mut self, enabled: bool) {
        self.do_recurring_events = enabled;
    }

    /// Returns the canonical name for the given configuration-facing name
    pub fn get_alias(&self, name: &str) -> Option<&str> {
        self.context.aliases.get(name).map(String::as_str)
    }

    /// Returns the canonical name of the given option name or alias
    pub fn option_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.get_alias(name).unwrap_or(name)
    }

    /// Resolve the given event name through the alias table and then the
    /// event registry.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        let local = self.get_alias(name).unwrap_or(name);
        self.registry.find(local)
    }

    /// Bind the primary translator for the event with the given name. Passing
    /// `None` restores the default passthrough.
    pub fn update_map(
        &mut self,
        name: &str,
        trans: Option<Box<dyn Translator>>,
    ) -> Result<(), InputError> {
        let id = self
            .resolve(name)
            .ok_or_else(|| InputError::UnknownEventName(name.to_string()))?;
        self.set_trans(id, trans)
    }

    /// Bind the primary translator for the given event id
    pub fn set_trans(
        &mut self,
        id: usize,
        trans: Option<Box<dyn Translator>>,
    ) -> Result<(), InputError> {
        if !self.registry.contains(id) {
            return Err(InputError::UnknownId(id));
        }
        let recurring = trans.as_ref().is_some_and(|t| t.is_recurring());
        let previous = std::mem::replace(&mut self.ev_map[id].trans, trans);
        if previous.as_ref().is_some_and(|t| t.is_recurring()) {
            self.remove_recurring_event(id);
        }
        if recurring {
            self.add_recurring_event(id)?;
        }
        log::trace!("{}: replaced translator {previous:?} for event {id}", self.name);

        Ok(())
    }

    /// Create, replace or (when `trans` is `None`) remove the advanced
    /// translator listening on the given event names. Nothing changes if any
    /// of the names cannot be resolved.
    ///
    /// Entries are keyed by the comma-joined canonical names, so the same
    /// events named through different aliases share one entry.
    pub fn update_advanced(
        &mut self,
        names: &[String],
        trans: Option<Box<dyn AdvancedTranslator>>,
    ) -> Result<(), InputError> {
        let fields: Vec<String> = names
            .iter()
            .map(|name| self.get_alias(name).unwrap_or(name).to_string())
            .collect();
        let key = fields.join(",");
        let Some(mut trans) = trans else {
            if self.adv_trans.remove(&key).is_none() {
                return Err(InputError::UnknownTranslator(key));
            }
            self.detach_all(&key);
            return Ok(());
        };

        let ids = names
            .iter()
            .zip(fields.iter())
            .map(|(name, field)| {
                self.registry
                    .find(field)
                    .ok_or_else(|| InputError::UnknownEventName(name.clone()))
            })
            .collect::<Result<Vec<usize>, InputError>>()?;

        if self.adv_trans.remove(&key).is_some() {
            self.detach_all(&key);
        }

        trans.attach(&ids);
        self.adv_trans.insert(key.clone(), AdvEntry { fields, trans });
        for id in ids {
            self.add_listener(id, &key)?;
        }

        Ok(())
    }

    /// Subscribe the advanced translator registered under the given key to
    /// changes of the given event.
    pub fn add_listener(&mut self, id: usize, key: &str) -> Result<(), InputError> {
        if !self.registry.contains(id) {
            return Err(InputError::UnknownId(id));
        }
        if !self.adv_trans.contains_key(key) {
            return Err(InputError::UnknownTranslator(key.to_string()));
        }
        let attached = &mut self.ev_map[id].attached;
        if !attached.iter().any(|k| k == key) {
            attached.push(key.to_string());
        }
        Ok(())
    }

    /// Unsubscribe the advanced translator registered under the given key
    /// from the given event.
    pub fn remove_listener(&mut self, id: usize, key: &str) -> Result<(), InputError> {
        let mapping = self.ev_map.get_mut(id).ok_or(InputError::UnknownId(id))?;
        mapping.attached.retain(|k| k != key);
        Ok(())
    }

    /// Returns the keys of the advanced translators listening on the event
    pub fn listeners(&self, id: usize) -> &[String] {
        self.ev_map
            .get(id)
            .map(|m| m.attached.as_slice())
            .unwrap_or_default()
    }

    pub fn get_advanced(&self, key: &str) -> Option<&AdvEntry> {
        self.adv_trans.get(key)
    }

    fn detach_all(&mut self, key: &str) {
        for mapping in self.ev_map.iter_mut() {
            mapping.attached.retain(|k| k != key);
        }
    }

    /// Drop every translator binding and bind the translators of the given
    /// profile instead. Entries that cannot be resolved are logged and
    /// skipped.
    pub fn apply_profile(&mut self, profile: &Profile) {
        log::debug!("{}: applying profile '{}'", self.name, profile.name());
        for id in 0..self.ev_map.len() {
            let previous = self.ev_map[id].trans.take();
            if previous.is_some_and(|t| t.is_recurring()) {
                self.remove_recurring_event(id);
            }
            self.ev_map[id].attached.clear();
        }
        self.adv_trans.clear();

        let names: Vec<String> = profile.mapped_events().map(String::from).collect();
        for name in names {
            if let Err(e) = self.update_map(&name, profile.get_mapping(&name)) {
                log::warn!("{}: unable to map '{name}': {e}", self.name);
            }
        }
        for (names, trans) in profile.get_advanced() {
            if let Err(e) = self.update_advanced(&names, Some(trans)) {
                log::warn!("{}: unable to map {names:?}: {e}", self.name);
            }
        }
    }

    /// Push the given value through the pipeline, no matter if it changed
    pub fn force_value(&mut self, id: usize, value: i64) -> Result<(), InputError> {
        self.dispatch(id, value, false)
    }

    /// Push the given value through the pipeline if it differs from the
    /// current value of the event.
    pub fn send_value(&mut self, id: usize, value: i64) -> Result<(), InputError> {
        let event = self.registry.get(id).ok_or(InputError::UnknownId(id))?;
        if event.value == value {
            return Ok(());
        }
        self.dispatch(id, value, false)
    }

    /// Push a synthetic value through the pipeline and end the batch
    pub fn inject_event(
        &mut self,
        id: usize,
        value: i64,
        skip_adv_trans: bool,
    ) -> Result<(), InputError> {
        self.dispatch(id, value, skip_adv_trans)?;
        self.send_syn_report();
        Ok(())
    }

    /// Signal the end of a batch of values to the output device
    pub fn send_syn_report(&mut self) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        if let Err(e) = output.syn_report() {
            log::warn!("{}: failed to send sync report: {e}", self.name);
        }
    }

    /// Process the given value along with every value injected by
    /// translators in response to it. Injections are handled in order after
    /// the translation that produced them has finished.
    fn dispatch(&mut self, id: usize, value: i64, skip_adv_trans: bool) -> Result<(), InputError> {
        if !self.registry.contains(id) {
            return Err(InputError::UnknownId(id));
        }

        self.pending.push_back(Injection {
            id,
            value,
            skip_adv_trans,
        });
        let mut synthetic = 0;
        let mut first = true;
        while let Some(injection) = self.pending.pop_front() {
            if !first {
                synthetic += 1;
                if synthetic > self.injection_budget {
                    log::warn!(
                        "{}: dropping {} injected events, budget of {} exceeded",
                        self.name,
                        self.pending.len() + 1,
                        self.injection_budget
                    );
                    self.pending.clear();
                    break;
                }
            }
            first = false;
            self.process_change(injection);
        }

        Ok(())
    }

    fn process_change(&mut self, injection: Injection) {
        let Injection {
            id,
            value,
            skip_adv_trans,
        } = injection;
        let Some(event) = self.registry.get_mut(id) else {
            log::warn!("{}: ignoring value for unknown event {id}", self.name);
            return;
        };
        event.value = value;
        if event.state == EventState::Disabled {
            return;
        }
        let Some(event) = self.registry.get(id) else {
            return;
        };

        let change = EventChange::new(id, value);
        let mut outputs = Vec::new();
        let mut injections = Vec::new();
        let mapping = &mut self.ev_map[id];
        {
            let mut out = Emitter::new(id, &event.name, &mut outputs, &mut injections);
            match mapping.trans.as_mut() {
                Some(trans) => trans.process(change, &mut out),
                None => IdentityTranslator::default().process(change, &mut out),
            }
        }

        if !skip_adv_trans {
            for key in mapping.attached.iter() {
                let Some(entry) = self.adv_trans.get_mut(key) else {
                    continue;
                };
                let mut out = Emitter::new(id, &event.name, &mut outputs, &mut injections);
                entry.trans.process(change, &mut out);
            }
        }

        self.write_outputs(&outputs);
        self.pending.extend(injections);
    }

    fn write_outputs(&mut self, outputs: &[OutputEvent]) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        for event in outputs {
            if let Err(e) = output.write_event(event) {
                log::warn!("{}: failed to write {event:?}: {e}", self.name);
            }
        }
    }

    /// Ask the translator bound to the given event to be re-emitted
    /// periodically.
    pub fn add_recurring_event(&mut self, id: usize) -> Result<(), InputError> {
        if !self.registry.contains(id) {
            return Err(InputError::UnknownId(id));
        }
        if !self.recurring.contains(&id) {
            self.recurring.push(id);
        }
        Ok(())
    }

    pub fn remove_recurring_event(&mut self, id: usize) {
        self.recurring.retain(|r| *r != id);
    }

    pub fn recurring_events(&self) -> &[usize] {
        &self.recurring
    }

    /// Returns how long the device may sleep before the next recurring pass
    /// is due, or `None` if there is nothing to re-emit.
    pub fn time_until_recurring(&self, now: Instant) -> Option<Duration> {
        if !self.do_recurring_events || self.recurring.is_empty() {
            return None;
        }
        let elapsed = now.saturating_duration_since(self.last_recurring_update);
        Some(self.recurring_interval.saturating_sub(elapsed))
    }

    /// Re-emit the output of every recurring translator if the recurring
    /// interval has elapsed. Returns true if a pass was made.
    pub fn process_recurring_events(&mut self, now: Instant) -> bool {
        if self.time_until_recurring(now) != Some(Duration::ZERO) {
            return false;
        }
        self.last_recurring_update = now;

        let mut outputs = Vec::new();
        let mut injections = Vec::new();
        for id in self.recurring.iter().copied() {
            let Some(event) = self.registry.get(id) else {
                continue;
            };
            if event.state != EventState::Active {
                continue;
            }
            let Some(trans) = self.ev_map[id].trans.as_mut() else {
                continue;
            };
            let mut out = Emitter::new(id, &event.name, &mut outputs, &mut injections);
            trans.process_recurring(&mut out);
        }
        if !injections.is_empty() {
            log::debug!(
                "{}: ignoring {} values injected by recurring translators",
                self.name,
                injections.len()
            );
        }

        if !outputs.is_empty() {
            self.write_outputs(&outputs);
            self.send_syn_report();
        }
        true
    }
}

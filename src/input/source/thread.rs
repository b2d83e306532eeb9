use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use mio::{Events, Poll};
use tokio::sync::mpsc::Receiver;

use crate::input::{error::InputError, option::OptionValue, profile::Profile};

use super::{
    command::SourceCommand,
    context::{DeviceContext, SourceSetup, Watches},
    pipeline::EventPipeline,
    SourceDevice, WatchTag,
};

/// Maximum number of readiness events handled per loop iteration
const EVENTS_CAPACITY: usize = 64;

/// Everything a device thread owns. Built when the input source is created
/// and moved onto the device thread when it starts.
pub(crate) struct SourceRuntime {
    pub pipeline: EventPipeline,
    pub backend: Box<dyn SourceDevice>,
    pub profile: Arc<Profile>,
    pub poll: Poll,
    pub watches: Watches,
    pub rx: Receiver<SourceCommand>,
    pub running: Arc<AtomicBool>,
}

impl SourceRuntime {
    /// Let the backend declare its events, options and descriptors
    pub fn setup_backend(&mut self) -> Result<(), InputError> {
        let mut setup = SourceSetup::new(&mut self.pipeline, &mut self.watches);
        self.backend.setup(&mut setup)
    }

    /// Run the device loop until the running flag is cleared. Each iteration
    /// waits for the control channel, a watched descriptor or the next
    /// recurring pass, then handles commands, device input and recurring
    /// events in that order.
    pub fn run(mut self) {
        let name = self.pipeline.name().to_string();
        log::debug!("{name}: device thread started");

        if let Err(e) = self.watches.register_all(self.poll.registry()) {
            log::error!("{name}: failed to watch device files: {e}");
            return;
        }
        let profile = self.profile.clone();
        self.apply_profile(profile);
        self.drain_commands();

        let mut events = Events::with_capacity(EVENTS_CAPACITY);
        while self.running.load(Ordering::Acquire) {
            let timeout = self.pipeline.time_until_recurring(Instant::now());
            if let Err(e) = self.poll.poll(&mut events, timeout) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                log::error!("{name}: failed waiting for device input: {e}");
                break;
            }

            let mut control = false;
            let mut ready: Vec<WatchTag> = Vec::new();
            for event in events.iter() {
                if event.token() == Watches::WAKER {
                    control = true;
                    continue;
                }
                if let Some(tag) = self.watches.tag(event.token()) {
                    ready.push(tag);
                }
            }

            if control {
                self.drain_commands();
            }
            for tag in ready {
                self.process(tag);
            }
            self.pipeline.process_recurring_events(Instant::now());
        }

        log::debug!("{name}: device thread stopped");
    }

    fn process(&mut self, tag: WatchTag) {
        let mut ctx = DeviceContext::new(&mut self.pipeline, self.poll.registry(), &mut self.watches);
        if let Err(e) = self.backend.process(tag, &mut ctx) {
            log::error!("{}: failed to process input: {e}", self.pipeline.name());
        }
    }

    /// Apply every command waiting in the control channel
    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.rx.try_recv() {
            log::trace!("{}: received command: {cmd:?}", self.pipeline.name());
            self.handle_command(cmd);
        }
    }

    fn handle_command(&mut self, cmd: SourceCommand) {
        let name = self.pipeline.name().to_string();
        match cmd {
            SourceCommand::UpdateMap(event, trans) => {
                if let Err(e) = self.pipeline.update_map(&event, trans) {
                    log::error!("{name}: failed to update mapping for '{event}': {e}");
                }
            }
            SourceCommand::UpdateAdvanced(events, trans) => {
                if let Err(e) = self.pipeline.update_advanced(&events, trans) {
                    log::error!("{name}: failed to update mapping for {events:?}: {e}");
                }
            }
            SourceCommand::InjectEvent(injection) => {
                let result = self.pipeline.inject_event(
                    injection.id,
                    injection.value,
                    injection.skip_adv_trans,
                );
                if let Err(e) = result {
                    log::error!("{name}: failed to inject event: {e}");
                }
            }
            SourceCommand::ToggleEvent(id, state) => {
                if let Err(e) = self.pipeline.toggle_event(id, state) {
                    log::error!("{name}: failed to toggle event: {e}");
                }
            }
            SourceCommand::AddListener(id, key) => {
                if let Err(e) = self.pipeline.add_listener(id, &key) {
                    log::error!("{name}: failed to add listener '{key}': {e}");
                }
            }
            SourceCommand::RemoveListener(id, key) => {
                if let Err(e) = self.pipeline.remove_listener(id, &key) {
                    log::error!("{name}: failed to remove listener '{key}': {e}");
                }
            }
            SourceCommand::UpdateOption(option, value) => {
                if let Err(e) = self.update_option(&option, value) {
                    log::error!("{name}: failed to update option '{option}': {e}");
                }
            }
            SourceCommand::RemoveOption(option) => {
                let canonical = self.pipeline.option_name(&option).to_string();
                if let Err(e) = self.pipeline.options_mut().remove_option(&canonical) {
                    log::error!("{name}: failed to remove option '{option}': {e}");
                }
            }
            SourceCommand::SetProfile(profile) => self.apply_profile(profile),
            SourceCommand::SetSlot(slot) => self.pipeline.set_slot(slot),
            SourceCommand::SetPlayer(player) => self.backend.set_player(player),
            SourceCommand::GetEvents(reply) => {
                if let Err(e) = reply.send(self.pipeline.get_events().to_vec()) {
                    log::error!("{name}: failed to send events: {e}");
                }
            }
            SourceCommand::ListOptions(reply) => {
                if let Err(e) = reply.send(self.pipeline.options().list_options()) {
                    log::error!("{name}: failed to send options: {e}");
                }
            }
        }
    }

    /// Validate the option value, give the backend the chance to refuse it
    /// and store it. Aliases are resolved to the canonical option name.
    fn update_option(&mut self, option: &str, value: OptionValue) -> Result<(), InputError> {
        let option = self.pipeline.option_name(option).to_string();
        let value = self.pipeline.options().check(&option, value)?;
        self.backend.process_option(&option, &value)?;
        self.pipeline.options_mut().update_option(&option, value)
    }

    fn apply_profile(&mut self, profile: Arc<Profile>) {
        self.pipeline.apply_profile(&profile);
        for (option, value) in profile.options() {
            if let Err(e) = self.update_option(option, value.clone()) {
                log::warn!(
                    "{}: unable to apply option '{option}' from profile: {e}",
                    self.pipeline.name()
                );
            }
        }
        self.profile = profile;
    }
}

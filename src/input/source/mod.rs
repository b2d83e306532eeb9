pub mod client;
pub mod command;
pub mod context;
pub mod pipeline;
mod thread;


use std::{
    error::Error,
    os::fd::RawFd,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use mio::{Poll, Waker};
use tokio::sync::mpsc;

use crate::udev::device::UdevDevice;

use self::{
    client::SourceClient,
    context::{DeviceContext, SourceSetup, Watches},
    pipeline::EventPipeline,
    thread::SourceRuntime,
};

use super::{
    error::InputError,
    event::{EventDecl, EventState, SourceEvent},
    manager::ManagerContext,
    option::{OptionDecl, OptionInfo, OptionValue},
    output::OutputSlot,
    profile::Profile,
    translator::{AdvancedTranslator, Translator},
};

/// Size of the control channel of each device
const BUFFER_SIZE: usize = 2048;

/// Identifies which watched file descriptor became readable
pub type WatchTag = usize;

/// A [SourceDevice] is the backend of an input source. It reads the raw
/// hardware protocol and pushes value changes into the translation pipeline.
pub trait SourceDevice: Send {
    /// Human readable description of the device
    fn description(&self) -> String {
        "No description available".to_string()
    }

    /// Kind of device, e.g. "gamepad" or "keyboard"
    fn device_type(&self) -> String {
        "gamepad".to_string()
    }

    /// Unique identifier of the physical device, if it has one
    fn uniq(&self) -> Option<String> {
        None
    }

    /// Declare device specific events, options and file descriptors. Called
    /// once before the device thread starts.
    fn setup(&mut self, _source: &mut SourceSetup<'_>) -> Result<(), InputError> {
        Ok(())
    }

    /// Called on the device thread when the watched file descriptor with the
    /// given tag becomes readable. Readiness is edge triggered, so the
    /// backend must read until the descriptor would block.
    fn process(
        &mut self,
        tag: WatchTag,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Called on the device thread before an option value is stored. The
    /// backend can refuse the value by returning an error.
    fn process_option(&mut self, _name: &str, _value: &OptionValue) -> Result<(), InputError> {
        Ok(())
    }

    /// Called on the device thread when the device is assigned a player slot
    fn set_player(&mut self, _player: i32) {}
}

/// Options for running an input source
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Minimum time between two re-emissions of recurring translators
    pub recurring_interval: Duration,
    /// Whether recurring translators are re-emitted at all
    pub do_recurring_events: bool,
    /// Capacity of the control channel
    pub buffer_size: usize,
    /// Maximum number of synthetic values processed in response to a single
    /// value before further injections are dropped
    pub injection_budget: usize,
    /// How long clients wait for the device thread to answer a query
    pub reply_timeout: Duration,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            recurring_interval: Duration::from_millis(8),
            do_recurring_events: false,
            buffer_size: BUFFER_SIZE,
            injection_budget: 16,
            reply_timeout: client::DEFAULT_TIMEOUT,
        }
    }
}

/// Lifecycle of the device thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// An [InputSource] is one attached input device. It owns the translation
/// tables of the device and the thread that runs them.
///
/// Until [InputSource::start_thread] is called, events and options can be
/// declared directly. Once running, every change goes through the control
/// channel and is applied on the device thread.
pub struct InputSource {
    name: String,
    description: String,
    device_type: String,
    uniq: Option<String>,
    context: Arc<ManagerContext>,
    profile: Arc<Profile>,
    device: Option<UdevDevice>,
    state: SourceState,
    runtime: Option<SourceRuntime>,
    client: SourceClient,
    running: Arc<AtomicBool>,
    waker: Arc<Waker>,
    thread: Option<JoinHandle<()>>,
}

impl InputSource {
    /// Create a new input source for the given backend
    pub fn new(
        context: Arc<ManagerContext>,
        profile: Arc<Profile>,
        backend: Box<dyn SourceDevice>,
        options: SourceOptions,
    ) -> Result<Self, InputError> {
        let name = "unnamed".to_string();
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), Watches::WAKER)?);
        let (tx, rx) = mpsc::channel(options.buffer_size);
        let running = Arc::new(AtomicBool::new(false));

        let description = backend.description();
        let device_type = backend.device_type();
        let uniq = backend.uniq();
        let runtime = SourceRuntime {
            pipeline: EventPipeline::new(&name, context.clone(), &options),
            backend,
            profile: profile.clone(),
            poll,
            watches: Watches::default(),
            rx,
            running: running.clone(),
        };

        Ok(Self {
            client: SourceClient::new(&name, tx, waker.clone())
                .with_timeout(options.reply_timeout),
            name,
            description,
            device_type,
            uniq,
            context,
            profile,
            device: None,
            state: SourceState::Created,
            runtime: Some(runtime),
            running,
            waker,
            thread: None,
        })
    }

    fn runtime_mut(&mut self) -> Result<&mut SourceRuntime, InputError> {
        match self.runtime.as_mut() {
            Some(runtime) if self.state == SourceState::Created => Ok(runtime),
            _ => Err(InputError::InvalidState(format!(
                "{} is {:?}, expected Created",
                self.name, self.state
            ))),
        }
    }

    /// Declare a new event. Only possible before the device thread starts.
    pub fn register_event(&mut self, decl: EventDecl) -> Result<usize, InputError> {
        self.runtime_mut()?.pipeline.register_event(decl)
    }

    /// Declare a new option. Only possible before the device thread starts.
    pub fn register_option(&mut self, decl: OptionDecl) -> Result<(), InputError> {
        self.runtime_mut()?.pipeline.register_option(decl)
    }

    /// Watch the given file descriptor once the device thread starts
    pub fn watch_file(&mut self, fd: RawFd, tag: WatchTag) -> Result<(), InputError> {
        self.runtime_mut()?.watches.push(fd, tag);
        Ok(())
    }

    /// Enable or disable re-emission of recurring translators
    pub fn set_recurring_events(&mut self, enabled: bool) -> Result<(), InputError> {
        self.runtime_mut()?.pipeline.set_recurring_events(enabled);
        Ok(())
    }

    /// Let the backend declare its own events, options and descriptors
    pub fn setup(&mut self) -> Result<(), InputError> {
        self.runtime_mut()?.setup_backend()
    }

    /// Start the device thread
    pub fn start_thread(&mut self) -> Result<(), InputError> {
        self.runtime_mut()?;
        let Some(runtime) = self.runtime.take() else {
            return Err(InputError::InvalidState(format!("{} has no runtime", self.name)));
        };

        log::debug!("Starting device thread for {}", self.name);
        self.running.store(true, Ordering::Release);
        let result = std::thread::Builder::new()
            .name(format!("source-{}", self.name))
            .spawn(move || runtime.run());
        match result {
            Ok(handle) => {
                self.thread = Some(handle);
                self.state = SourceState::Running;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start device thread for {}: {e}", self.name);
                self.running.store(false, Ordering::Release);
                self.state = SourceState::Stopped;
                Err(InputError::ThreadSpawn(e))
            }
        }
    }

    /// Signal the device thread to stop and wait for it to finish. Calling
    /// this more than once, or on a device that never started, is a no-op
    /// beyond reaching the stopped state.
    pub fn end_thread(&mut self) {
        match self.state {
            SourceState::Stopping | SourceState::Stopped => (),
            SourceState::Created => {
                self.runtime = None;
                self.state = SourceState::Stopped;
            }
            SourceState::Running => {
                log::debug!("Stopping device thread for {}", self.name);
                self.state = SourceState::Stopping;
                self.running.store(false, Ordering::Release);
                if let Err(e) = self.waker.wake() {
                    log::error!("Failed to wake device thread for {}: {e}", self.name);
                }
                if let Some(handle) = self.thread.take() {
                    if handle.join().is_err() {
                        log::error!("Device thread for {} panicked", self.name);
                    }
                }
                self.state = SourceState::Stopped;
                log::debug!("Device thread for {} stopped", self.name);
            }
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Returns a client that can be used to reconfigure the device from any
    /// thread.
    pub fn client(&self) -> SourceClient {
        self.client.clone()
    }

    /// Returns a snapshot of the events of the device. For a running device
    /// the snapshot is taken on the device thread, so this blocks until the
    /// thread answers or the reply timeout expires.
    pub fn get_events(&self) -> Result<Vec<SourceEvent>, InputError> {
        match (self.state, self.runtime.as_ref()) {
            (SourceState::Created, Some(runtime)) => Ok(runtime.pipeline.get_events().to_vec()),
            (SourceState::Running, _) => self.client.blocking_get_events(),
            _ => Err(InputError::ChannelClosed),
        }
    }

    /// Returns a snapshot of the options of the device. Blocks like
    /// [InputSource::get_events].
    pub fn list_options(&self) -> Result<Vec<OptionInfo>, InputError> {
        match (self.state, self.runtime.as_ref()) {
            (SourceState::Created, Some(runtime)) => {
                Ok(runtime.pipeline.options().list_options())
            }
            (SourceState::Running, _) => self.client.blocking_list_options(),
            _ => Err(InputError::ChannelClosed),
        }
    }

    /// Set the state of an event
    pub fn toggle_event(&mut self, id: usize, state: EventState) -> Result<(), InputError> {
        if let Ok(runtime) = self.runtime_mut() {
            return runtime.pipeline.toggle_event(id, state);
        }
        self.client.toggle_event(id, state)
    }

    pub fn update_map(
        &self,
        event: &str,
        trans: Option<Box<dyn Translator>>,
    ) -> Result<(), InputError> {
        self.client.update_map(event, trans)
    }

    pub fn update_advanced(
        &self,
        events: &[&str],
        trans: Option<Box<dyn AdvancedTranslator>>,
    ) -> Result<(), InputError> {
        self.client.update_advanced(events, trans)
    }

    pub fn update_option(&self, name: &str, value: OptionValue) -> Result<(), InputError> {
        self.client.update_option(name, value)
    }

    pub fn remove_option(&self, name: &str) -> Result<(), InputError> {
        self.client.remove_option(name)
    }

    pub fn inject_event(&self, id: usize, value: i64, skip_adv_trans: bool) -> Result<(), InputError> {
        self.client.inject_event(id, value, skip_adv_trans)
    }

    pub fn add_listener(&self, id: usize, key: &str) -> Result<(), InputError> {
        self.client.add_listener(id, key)
    }

    pub fn remove_listener(&self, id: usize, key: &str) -> Result<(), InputError> {
        self.client.remove_listener(id, key)
    }

    pub fn set_slot(&self, slot: Option<Box<dyn OutputSlot>>) -> Result<(), InputError> {
        self.client.set_slot(slot)
    }

    pub fn set_player(&self, player: i32) -> Result<(), InputError> {
        self.client.set_player(player)
    }

    /// Hand a new profile snapshot to the device
    pub fn set_profile(&mut self, profile: Arc<Profile>) -> Result<(), InputError> {
        self.profile = profile.clone();
        if let Ok(runtime) = self.runtime_mut() {
            runtime.profile = profile;
            return Ok(());
        }
        self.client.set_profile(profile)
    }

    pub fn get_profile(&self) -> Arc<Profile> {
        self.profile.clone()
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    /// Rename the device. Only possible before the device thread starts.
    pub fn set_name(&mut self, name: &str) -> Result<(), InputError> {
        self.runtime_mut()?.pipeline.set_name(name);
        self.name = name.to_string();
        self.client.set_name(name);
        Ok(())
    }

    pub fn get_manager_name(&self) -> &str {
        self.context.name.as_str()
    }

    pub fn get_description(&self) -> &str {
        self.description.as_str()
    }

    pub fn get_type(&self) -> &str {
        self.device_type.as_str()
    }

    pub fn get_uniq(&self) -> Option<&str> {
        self.uniq.as_deref()
    }

    /// Returns the canonical name for the given configuration-facing name
    pub fn get_alias(&self, name: &str) -> Option<&str> {
        self.context.aliases.get(name).map(String::as_str)
    }

    pub fn get_device(&self) -> Option<&UdevDevice> {
        self.device.as_ref()
    }

    pub(crate) fn set_device(&mut self, device: UdevDevice) {
        self.device = Some(device);
    }
}

impl Drop for InputSource {
    fn drop(&mut self) {
        self.end_thread();
    }
}

use std::{
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    time::Duration,
};

use mio::Waker;
use tokio::sync::mpsc::{channel, error::TrySendError, Receiver, Sender};

use crate::{
    input::{
        error::InputError,
        event::{EventState, SourceEvent},
        option::{OptionInfo, OptionValue},
        output::OutputSlot,
        profile::Profile,
        translator::{AdvancedTranslator, Injection, Translator},
    },
    sync::{ReceiveTimeoutError, TimeoutReceiver},
};

use super::command::{Reply, SourceCommand};

/// Maximum duration to wait for a response from a device. If this timeout
/// is reached, that typically indicates a deadlock somewhere in the code.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A client for communicating with a running [InputSource]. Every method
/// enqueues a command for the device thread and returns without waiting for
/// it to be applied; errors while applying are logged by the device.
#[derive(Debug, Clone)]
pub struct SourceClient {
    name: String,
    tx: Sender<SourceCommand>,
    waker: Arc<Waker>,
    timeout: Duration,
}

impl SourceClient {
    pub fn new(name: &str, tx: Sender<SourceCommand>, waker: Arc<Waker>) -> Self {
        Self {
            name: name.to_string(),
            tx,
            waker,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Returns the client with the given response timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Name of the device this client talks to
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Returns true if the device is no longer listening for commands
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Enqueue the given command and wake up the device thread
    fn send(&self, cmd: SourceCommand) -> Result<(), InputError> {
        match self.tx.try_send(cmd) {
            Ok(_) => (),
            Err(TrySendError::Full(cmd)) => {
                log::error!("{}: control channel is full, dropping {cmd:?}", self.name);
                return Err(InputError::ChannelFull);
            }
            Err(TrySendError::Closed(_)) => return Err(InputError::ChannelClosed),
        }
        self.waker.wake()?;
        Ok(())
    }

    /// Use the given receiver to wait for a response from the device.
    async fn recv<T>(&self, mut rx: Receiver<T>) -> Result<T, InputError>
    where
        T: Send + Sync,
    {
        match rx.recv_timeout(self.timeout).await {
            Ok(value) => Ok(value),
            Err(ReceiveTimeoutError::Timeout) => {
                log::error!(
                    "POSSIBLE DEADLOCK: timed out after {:?} waiting for response from {}",
                    self.timeout,
                    self.name
                );
                Err(InputError::Timeout)
            }
            Err(ReceiveTimeoutError::Closed) => Err(InputError::ChannelClosed),
        }
    }

    /// Use the given receiver to wait for a response from the device
    /// (blocking).
    fn blocking_recv<T>(&self, rx: mpsc::Receiver<T>) -> Result<T, InputError> {
        match rx.recv_timeout(self.timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => {
                log::error!(
                    "POSSIBLE DEADLOCK: timed out after {:?} waiting for response from {}",
                    self.timeout,
                    self.name
                );
                Err(InputError::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(InputError::ChannelClosed),
        }
    }

    /// Bind the primary translator for the event with the given name.
    /// Passing `None` restores the passthrough behavior.
    pub fn update_map(
        &self,
        event: &str,
        trans: Option<Box<dyn Translator>>,
    ) -> Result<(), InputError> {
        self.send(SourceCommand::UpdateMap(event.to_string(), trans))
    }

    /// Create, replace or remove the advanced translator listening on the
    /// given event names.
    pub fn update_advanced(
        &self,
        events: &[&str],
        trans: Option<Box<dyn AdvancedTranslator>>,
    ) -> Result<(), InputError> {
        let events = events.iter().map(|e| e.to_string()).collect();
        self.send(SourceCommand::UpdateAdvanced(events, trans))
    }

    /// Push a synthetic value for the given event through the pipeline
    pub fn inject_event(&self, id: usize, value: i64, skip_adv_trans: bool) -> Result<(), InputError> {
        self.send(SourceCommand::InjectEvent(Injection {
            id,
            value,
            skip_adv_trans,
        }))
    }

    pub fn toggle_event(&self, id: usize, state: EventState) -> Result<(), InputError> {
        self.send(SourceCommand::ToggleEvent(id, state))
    }

    /// Subscribe the advanced translator registered under the given key
    /// (its comma-joined canonical event names) to another event.
    pub fn add_listener(&self, id: usize, key: &str) -> Result<(), InputError> {
        self.send(SourceCommand::AddListener(id, key.to_string()))
    }

    pub fn remove_listener(&self, id: usize, key: &str) -> Result<(), InputError> {
        self.send(SourceCommand::RemoveListener(id, key.to_string()))
    }

    pub fn update_option(&self, name: &str, value: OptionValue) -> Result<(), InputError> {
        self.send(SourceCommand::UpdateOption(name.to_string(), value))
    }

    pub fn remove_option(&self, name: &str) -> Result<(), InputError> {
        self.send(SourceCommand::RemoveOption(name.to_string()))
    }

    /// Replace the profile snapshot of the device. All translators are
    /// rebound from the new profile.
    pub fn set_profile(&self, profile: Arc<Profile>) -> Result<(), InputError> {
        self.send(SourceCommand::SetProfile(profile))
    }

    /// Replace the output device translated values are written to
    pub fn set_slot(&self, slot: Option<Box<dyn OutputSlot>>) -> Result<(), InputError> {
        self.send(SourceCommand::SetSlot(slot))
    }

    pub fn set_player(&self, player: i32) -> Result<(), InputError> {
        self.send(SourceCommand::SetPlayer(player))
    }

    /// Get a snapshot of all events of the device
    pub async fn get_events(&self) -> Result<Vec<SourceEvent>, InputError> {
        let (tx, rx) = channel(1);
        self.send(SourceCommand::GetEvents(Reply::Async(tx)))?;
        self.recv(rx).await
    }

    /// Get a snapshot of all events of the device (blocking)
    pub fn blocking_get_events(&self) -> Result<Vec<SourceEvent>, InputError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.send(SourceCommand::GetEvents(Reply::Blocking(tx)))?;
        self.blocking_recv(rx)
    }

    /// Get a snapshot of all options of the device
    pub async fn list_options(&self) -> Result<Vec<OptionInfo>, InputError> {
        let (tx, rx) = channel(1);
        self.send(SourceCommand::ListOptions(Reply::Async(tx)))?;
        self.recv(rx).await
    }

    /// Get a snapshot of all options of the device (blocking)
    pub fn blocking_list_options(&self) -> Result<Vec<OptionInfo>, InputError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.send(SourceCommand::ListOptions(Reply::Blocking(tx)))?;
        self.blocking_recv(rx)
    }
}

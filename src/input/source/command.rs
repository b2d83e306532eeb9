use std::sync::{mpsc::SyncSender, Arc};

use tokio::sync::mpsc::Sender;

use crate::input::{
    error::InputError,
    event::{EventState, SourceEvent},
    option::{OptionInfo, OptionValue},
    output::OutputSlot,
    profile::Profile,
    translator::{AdvancedTranslator, Injection, Translator},
};

/// A [SourceCommand] is a message that can be sent to an [InputSource] over
/// its control channel. Commands are the only way another thread may change
/// the translation tables of a running device; they are applied in order on
/// the device thread.
#[derive(Debug)]
pub enum SourceCommand {
    UpdateMap(String, Option<Box<dyn Translator>>),
    UpdateAdvanced(Vec<String>, Option<Box<dyn AdvancedTranslator>>),
    InjectEvent(Injection),
    ToggleEvent(usize, EventState),
    AddListener(usize, String),
    RemoveListener(usize, String),
    UpdateOption(String, OptionValue),
    RemoveOption(String),
    SetProfile(Arc<Profile>),
    SetSlot(Option<Box<dyn OutputSlot>>),
    SetPlayer(i32),
    GetEvents(Reply<Vec<SourceEvent>>),
    ListOptions(Reply<Vec<OptionInfo>>),
}

/// Where the device thread sends the answer to a query. Async callers await
/// a tokio channel, blocking callers wait on a std channel with a timeout.
#[derive(Debug)]
pub enum Reply<T> {
    Async(Sender<T>),
    Blocking(SyncSender<T>),
}

impl<T> Reply<T> {
    /// Send the answer. Fails if the caller stopped waiting.
    pub fn send(self, value: T) -> Result<(), InputError> {
        let result = match self {
            Reply::Async(tx) => tx.try_send(value).is_ok(),
            Reply::Blocking(tx) => tx.try_send(value).is_ok(),
        };
        if !result {
            return Err(InputError::ChannelClosed);
        }
        Ok(())
    }
}

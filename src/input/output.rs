use std::{error::Error, fmt::Debug};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// A translated value addressed to an output device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    /// Id of the source event whose translation produced this value
    pub source_id: usize,
    /// Name of the output event to write
    pub target: String,
    pub value: i64,
}

impl OutputEvent {
    pub fn new(source_id: usize, target: &str, value: i64) -> Self {
        Self {
            source_id,
            target: target.to_string(),
            value,
        }
    }
}

/// Possible errors writing to an output slot
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("output device no longer exists")]
    Closed,
    #[error("output device is not keeping up with events")]
    Full,
    #[error("output device error: {0}")]
    Device(Box<dyn Error + Send + Sync>),
}

/// An [OutputSlot] is the virtual device that receives translated values.
/// Values are written individually and grouped into frames by an explicit
/// synchronization report.
pub trait OutputSlot: Send + Debug {
    /// Write a single value to the output device
    fn write_event(&mut self, event: &OutputEvent) -> Result<(), OutputError>;
    /// Mark the end of a batch of written values
    fn syn_report(&mut self) -> Result<(), OutputError>;
}

/// A [TargetCommand] is a message that an [OutputSlot] sends to a target
/// device task over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCommand {
    WriteEvent(OutputEvent),
    SynReport,
    Stop,
}

/// Output slot that forwards every value to a target device over a channel.
/// Writes never block the device thread; a full channel drops the value.
#[derive(Debug, Clone)]
pub struct ChannelOutputSlot {
    tx: mpsc::Sender<TargetCommand>,
}

impl ChannelOutputSlot {
    pub fn new(tx: mpsc::Sender<TargetCommand>) -> Self {
        Self { tx }
    }

    /// Create a new slot along with the receiving end the target device
    /// should listen on.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<TargetCommand>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    fn send(&self, cmd: TargetCommand) -> Result<(), OutputError> {
        match self.tx.try_send(cmd) {
            Ok(_) => Ok(()),
            Err(TrySendError::Full(_)) => Err(OutputError::Full),
            Err(TrySendError::Closed(_)) => Err(OutputError::Closed),
        }
    }
}

impl OutputSlot for ChannelOutputSlot {
    fn write_event(&mut self, event: &OutputEvent) -> Result<(), OutputError> {
        self.send(TargetCommand::WriteEvent(event.clone()))
    }

    fn syn_report(&mut self) -> Result<(), OutputError> {
        self.send(TargetCommand::SynReport)
    }
}

use std::io;

use thiserror::Error;

/// Possible errors from an input source or device manager
#[derive(Error, Debug)]
pub enum InputError {
    #[error("event id {0} is already registered")]
    DuplicateId(usize),
    #[error("name '{0}' is already registered")]
    DuplicateName(String),
    #[error("no event with id {0}")]
    UnknownId(usize),
    #[error("no event named '{0}'")]
    UnknownEventName(String),
    #[error("no option named '{0}'")]
    UnknownOption(String),
    #[error("invalid value for option '{0}': {1}")]
    InvalidOptionValue(String, String),
    #[error("no advanced translator registered as '{0}'")]
    UnknownTranslator(String),
    #[error("no device named '{0}'")]
    UnknownDevice(String),
    #[error("device rejected by manager '{0}'")]
    DeviceRejected(String),
    #[error("device control channel is closed")]
    ChannelClosed,
    #[error("device control channel is full")]
    ChannelFull,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("timed out waiting for device response")]
    Timeout,
    #[error("failed to spawn device thread: {0}")]
    ThreadSpawn(io::Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#![allow(dead_code)]

use std::{
    error::Error,
    io::{self, Read},
    os::fd::AsRawFd,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use inputmapper::input::{
    error::InputError,
    event::{EventDecl, EventType},
    option::{OptionDecl, OptionValue},
    output::{OutputEvent, TargetCommand},
    source::{
        context::{DeviceContext, SourceSetup},
        SourceDevice, WatchTag,
    },
};
use mio::unix::pipe;
use tokio::sync::mpsc::{error::TryRecvError, Receiver};

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// Device backend that reads one value per byte from a pipe
pub struct PipeDevice {
    rx: pipe::Receiver,
    id: usize,
    pub player: Arc<AtomicI32>,
}

impl PipeDevice {
    pub fn new(rx: pipe::Receiver) -> Self {
        Self {
            rx,
            id: 0,
            player: Arc::new(AtomicI32::new(-1)),
        }
    }
}

impl SourceDevice for PipeDevice {
    fn description(&self) -> String {
        "Pipe test device".to_string()
    }

    fn uniq(&self) -> Option<String> {
        Some("pipe-0".to_string())
    }

    fn setup(&mut self, source: &mut SourceSetup<'_>) -> Result<(), InputError> {
        self.id = source.register_event(EventDecl::new("button", "", EventType::Button))?;
        source.register_option(OptionDecl::new(
            "deadzone",
            "Stick deadzone in percent",
            OptionValue::Int(0),
        ))?;
        source.watch_file(self.rx.as_raw_fd(), 0);
        Ok(())
    }

    fn process(
        &mut self,
        _tag: WatchTag,
        ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut buf = [0u8; 64];
        loop {
            match self.rx.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for value in &buf[..n] {
                        ctx.send_value(self.id, *value as i64)?;
                    }
                    ctx.send_syn_report();
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn process_option(&mut self, name: &str, value: &OptionValue) -> Result<(), InputError> {
        match (name, value) {
            ("deadzone", OptionValue::Int(v)) if *v > 100 => Err(InputError::InvalidOptionValue(
                name.to_string(),
                format!("{v} is above 100"),
            )),
            _ => Ok(()),
        }
    }

    fn set_player(&mut self, player: i32) {
        self.player.store(player, Ordering::SeqCst);
    }
}

/// Wait for the next command written to the output slot
pub fn recv(rx: &mut Receiver<TargetCommand>) -> Option<TargetCommand> {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        match rx.try_recv() {
            Ok(cmd) => return Some(cmd),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => (),
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// Wait for the next value written to the output slot
pub fn recv_event(rx: &mut Receiver<TargetCommand>) -> Option<OutputEvent> {
    while let Some(cmd) = recv(rx) {
        if let TargetCommand::WriteEvent(event) = cmd {
            return Some(event);
        }
    }
    None
}

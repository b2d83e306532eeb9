use std::os::fd::RawFd;

use mio::{unix::SourceFd, Interest, Registry, Token};

use crate::input::{
    error::InputError,
    event::{EventDecl, EventState, SourceEvent},
    option::{OptionDecl, OptionValue},
};

use super::{pipeline::EventPipeline, WatchTag};

/// File descriptors watched by a device thread, indexed by poll token
#[derive(Debug, Default)]
pub(crate) struct Watches {
    entries: Vec<(RawFd, WatchTag)>,
}

impl Watches {
    /// Token reserved for the control channel waker
    pub const WAKER: Token = Token(0);

    /// Token the next pushed descriptor will be registered under
    pub fn next_token(&self) -> Token {
        Token(self.entries.len() + 1)
    }

    pub fn push(&mut self, fd: RawFd, tag: WatchTag) -> Token {
        self.entries.push((fd, tag));
        Token(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn tag(&self, token: Token) -> Option<WatchTag> {
        token
            .0
            .checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
            .map(|(_, tag)| *tag)
    }

    /// Register every watched descriptor with the given registry
    pub fn register_all(&self, registry: &Registry) -> Result<(), InputError> {
        for (idx, (fd, _)) in self.entries.iter().enumerate() {
            registry.register(&mut SourceFd(fd), Token(idx + 1), Interest::READABLE)?;
        }
        Ok(())
    }
}

/// Handle given to a backend while it processes input on the device thread.
/// It exposes the operations a backend needs to push raw values into the
/// translation pipeline.
pub struct DeviceContext<'a> {
    pipeline: &'a mut EventPipeline,
    registry: &'a Registry,
    watches: &'a mut Watches,
}

impl<'a> DeviceContext<'a> {
    pub(crate) fn new(
        pipeline: &'a mut EventPipeline,
        registry: &'a Registry,
        watches: &'a mut Watches,
    ) -> Self {
        Self {
            pipeline,
            registry,
            watches,
        }
    }

    pub fn name(&self) -> &str {
        self.pipeline.name()
    }

    /// Push the given raw value through the pipeline even if it did not change
    pub fn force_value(&mut self, id: usize, value: i64) -> Result<(), InputError> {
        self.pipeline.force_value(id, value)
    }

    /// Push the given raw value through the pipeline if it changed
    pub fn send_value(&mut self, id: usize, value: i64) -> Result<(), InputError> {
        self.pipeline.send_value(id, value)
    }

    /// Mark the end of a batch of values
    pub fn send_syn_report(&mut self) {
        self.pipeline.send_syn_report();
    }

    pub fn toggle_event(&mut self, id: usize, state: EventState) -> Result<(), InputError> {
        self.pipeline.toggle_event(id, state)
    }

    pub fn add_recurring_event(&mut self, id: usize) -> Result<(), InputError> {
        self.pipeline.add_recurring_event(id)
    }

    pub fn remove_recurring_event(&mut self, id: usize) {
        self.pipeline.remove_recurring_event(id);
    }

    /// Look up the id of an event by name or alias
    pub fn find_event(&self, name: &str) -> Option<usize> {
        self.pipeline.resolve(name)
    }

    pub fn get_events(&self) -> &[SourceEvent] {
        self.pipeline.get_events()
    }

    pub fn get_option(&self, name: &str) -> Option<&OptionValue> {
        self.pipeline.options().get(name)
    }

    /// Start watching another file descriptor. `process()` is called with the
    /// given tag whenever it becomes readable. Nothing is recorded if the
    /// descriptor cannot be watched.
    pub fn watch_file(&mut self, fd: RawFd, tag: WatchTag) -> Result<(), InputError> {
        let token = self.watches.next_token();
        self.registry
            .register(&mut SourceFd(&fd), token, Interest::READABLE)?;
        self.watches.push(fd, tag);
        Ok(())
    }

    /// Log a message on behalf of the device
    pub fn print(&self, message: &str) {
        log::info!("{}: {message}", self.pipeline.name());
    }
}

/// Handle given to a backend before its device thread starts. Events and
/// options can only be declared through this handle, which no longer exists
/// once the device is running.
pub struct SourceSetup<'a> {
    pipeline: &'a mut EventPipeline,
    watches: &'a mut Watches,
}

impl<'a> SourceSetup<'a> {
    pub(crate) fn new(pipeline: &'a mut EventPipeline, watches: &'a mut Watches) -> Self {
        Self { pipeline, watches }
    }

    pub fn name(&self) -> &str {
        self.pipeline.name()
    }

    /// Declare a device specific event and return its id
    pub fn register_event(&mut self, decl: EventDecl) -> Result<usize, InputError> {
        self.pipeline.register_event(decl)
    }

    /// Declare a device specific option
    pub fn register_option(&mut self, decl: OptionDecl) -> Result<(), InputError> {
        self.pipeline.register_option(decl)
    }

    pub fn toggle_event(&mut self, id: usize, state: EventState) -> Result<(), InputError> {
        self.pipeline.toggle_event(id, state)
    }

    /// Watch the given file descriptor once the device thread starts.
    /// `process()` is called with the given tag whenever it becomes readable.
    pub fn watch_file(&mut self, fd: RawFd, tag: WatchTag) {
        self.watches.push(fd, tag);
    }

    /// Enable or disable periodic re-emission of recurring translators
    pub fn set_recurring_events(&mut self, enabled: bool) {
        self.pipeline.set_recurring_events(enabled);
    }

    pub fn add_recurring_event(&mut self, id: usize) -> Result<(), InputError> {
        self.pipeline.add_recurring_event(id)
    }

    pub fn find_event(&self, name: &str) -> Option<usize> {
        self.pipeline.resolve(name)
    }
}

#[cfg(test)]
mod tests {
    use std::{os::fd::AsRawFd, sync::Arc};

    use mio::{unix::pipe, Poll, Token};

    use crate::input::{
        manager::ManagerContext,
        source::{pipeline::EventPipeline, SourceOptions},
    };

    use super::{DeviceContext, Watches};

    #[test]
    fn test_watch_file() -> Result<(), Box<dyn std::error::Error>> {
        let poll = Poll::new()?;
        let options = SourceOptions::default();
        let mut pipeline =
            EventPipeline::new("test0", Arc::new(ManagerContext::default()), &options);
        let mut watches = Watches::default();
        let (_tx, rx) = pipe::new()?;

        {
            let mut ctx = DeviceContext::new(&mut pipeline, poll.registry(), &mut watches);
            assert!(ctx.watch_file(-1, 3).is_err());
            ctx.watch_file(rx.as_raw_fd(), 7)?;
        }

        // The failed descriptor must not leave a token behind
        assert_eq!(watches.len(), 1);
        assert_eq!(watches.tag(Token(1)), Some(7));
        assert_eq!(watches.tag(Token(2)), None);
        assert_eq!(watches.next_token(), Token(2));

        Ok(())
    }
}

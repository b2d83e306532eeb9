mod common;

use std::{
    error::Error,
    io::Write,
    os::fd::AsRawFd,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use inputmapper::{
    config::TranslatorConfig,
    input::{
        error::InputError,
        event::{EventDecl, EventState, EventType},
        manager::ManagerContext,
        option::OptionValue,
        output::{ChannelOutputSlot, OutputEvent, TargetCommand},
        profile::Profile,
        source::{
            context::{DeviceContext, SourceSetup},
            InputSource, SourceDevice, SourceOptions, SourceState, WatchTag,
        },
        translator::builtin::build_translator,
    },
};
use mio::unix::pipe;

use common::{recv, recv_event, PipeDevice};

fn new_source(rx: pipe::Receiver) -> Result<InputSource, InputError> {
    new_source_with(rx, SourceOptions::default())
}

fn new_source_with(rx: pipe::Receiver, options: SourceOptions) -> Result<InputSource, InputError> {
    let context = ManagerContext {
        name: "pipe".to_string(),
        ..Default::default()
    };
    let mut source = InputSource::new(
        Arc::new(context),
        Arc::new(Profile::default()),
        Box::new(PipeDevice::new(rx)),
        options,
    )?;
    source.set_name("pipe0")?;
    source.setup()?;
    Ok(source)
}

#[test]
fn test_device_thread() -> Result<(), Box<dyn Error>> {
    let (mut tx, rx) = pipe::new()?;
    let mut source = new_source(rx)?;
    assert_eq!(source.get_description(), "Pipe test device");
    assert_eq!(source.get_uniq(), Some("pipe-0"));
    assert_eq!(source.get_type(), "gamepad");
    assert_eq!(source.get_manager_name(), "pipe");

    let (slot, mut out) = ChannelOutputSlot::channel(64);
    source.set_slot(Some(Box::new(slot)))?;
    source.start_thread()?;
    assert_eq!(source.state(), SourceState::Running);

    tx.write_all(&[1])?;
    assert_eq!(recv(&mut out), Some(TargetCommand::WriteEvent(OutputEvent::new(0, "button", 1))));
    assert_eq!(recv(&mut out), Some(TargetCommand::SynReport));

    let events = source.get_events()?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].value, 1);

    source.end_thread();
    assert_eq!(source.state(), SourceState::Stopped);

    Ok(())
}

#[test]
fn test_update_map_from_client() -> Result<(), Box<dyn Error>> {
    let (mut tx, rx) = pipe::new()?;
    let mut source = new_source(rx)?;
    let (slot, mut out) = ChannelOutputSlot::channel(64);
    source.set_slot(Some(Box::new(slot)))?;
    source.start_thread()?;

    let client = source.client();
    let trans = build_translator(&TranslatorConfig::Scale {
        target: Some("trigger".to_string()),
        factor: 2.0,
    });
    client.update_map("button", Some(trans))?;
    tx.write_all(&[3])?;
    assert_eq!(recv_event(&mut out), Some(OutputEvent::new(0, "trigger", 6)));

    client.toggle_event(0, EventState::Disabled)?;
    tx.write_all(&[4])?;
    client.inject_event(0, 9, false)?;
    let events = client.blocking_get_events()?;
    assert_eq!(events[0].value, 9);
    assert_eq!(events[0].state, EventState::Disabled);
    assert_eq!(recv_event(&mut out), None);

    Ok(())
}

#[test]
fn test_profile_switch() -> Result<(), Box<dyn Error>> {
    let (mut tx, rx) = pipe::new()?;
    let mut source = new_source(rx)?;
    let (slot, mut out) = ChannelOutputSlot::channel(64);
    source.set_slot(Some(Box::new(slot)))?;
    source.start_thread()?;

    let profile = Profile::new("inverted")
        .with_mapping("button", TranslatorConfig::Invert { target: None })
        .with_option("deadzone", OptionValue::Int(20));
    source.set_profile(Arc::new(profile))?;
    assert_eq!(source.get_profile().name(), "inverted");

    tx.write_all(&[5])?;
    assert_eq!(recv_event(&mut out), Some(OutputEvent::new(0, "button", -5)));

    let options = source.list_options()?;
    assert_eq!(options[0].value, OptionValue::Int(20));

    Ok(())
}

#[test]
fn test_option_veto() -> Result<(), Box<dyn Error>> {
    let (_tx, rx) = pipe::new()?;
    let mut source = new_source(rx)?;
    source.start_thread()?;

    source.update_option("deadzone", OptionValue::Int(50))?;
    source.update_option("deadzone", OptionValue::Int(500))?;
    source.update_option("deadzone", OptionValue::String("high".to_string()))?;
    source.update_option("sensitivity", OptionValue::Int(1))?;
    let options = source.list_options()?;
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].name, "deadzone");
    assert_eq!(options[0].value, OptionValue::Int(50));

    source.remove_option("deadzone")?;
    assert!(source.list_options()?.is_empty());

    Ok(())
}

#[test]
fn test_set_player() -> Result<(), Box<dyn Error>> {
    let (_tx, rx) = pipe::new()?;
    let backend = PipeDevice::new(rx);
    let player = backend.player.clone();
    let mut source = InputSource::new(
        Arc::new(ManagerContext::default()),
        Arc::new(Profile::default()),
        Box::new(backend),
        SourceOptions::default(),
    )?;
    source.setup()?;
    source.start_thread()?;

    source.set_player(2)?;
    // Wait for the device thread to catch up
    source.get_events()?;
    assert_eq!(player.load(Ordering::SeqCst), 2);

    Ok(())
}

#[test]
fn test_registration_only_before_start() -> Result<(), Box<dyn Error>> {
    let (_tx, rx) = pipe::new()?;
    let mut source = new_source(rx)?;
    let id = source.register_event(EventDecl::new("extra", "", EventType::Axis))?;
    assert_eq!(id, 1);
    let result = source.register_event(EventDecl::new("again", "", EventType::Axis).with_id(0));
    assert!(matches!(result, Err(InputError::DuplicateId(0))));
    assert_eq!(source.get_events()?.len(), 2);

    source.start_thread()?;
    let result = source.register_event(EventDecl::new("late", "", EventType::Axis));
    assert!(matches!(result, Err(InputError::InvalidState(_))));
    assert!(matches!(source.start_thread(), Err(InputError::InvalidState(_))));

    Ok(())
}

#[test]
fn test_end_thread_idempotent() -> Result<(), Box<dyn Error>> {
    let (_tx, rx) = pipe::new()?;
    let mut source = new_source(rx)?;
    let client = source.client();
    source.start_thread()?;

    source.end_thread();
    assert_eq!(source.state(), SourceState::Stopped);
    source.end_thread();
    assert_eq!(source.state(), SourceState::Stopped);

    assert!(client.is_closed());
    assert!(matches!(
        client.inject_event(0, 1, false),
        Err(InputError::ChannelClosed)
    ));
    assert!(matches!(source.get_events(), Err(InputError::ChannelClosed)));

    Ok(())
}

#[test]
fn test_end_thread_never_started() -> Result<(), Box<dyn Error>> {
    let (_tx, rx) = pipe::new()?;
    let mut source = new_source(rx)?;
    source.end_thread();
    assert_eq!(source.state(), SourceState::Stopped);
    source.end_thread();
    assert_eq!(source.state(), SourceState::Stopped);

    Ok(())
}

#[tokio::test]
async fn test_async_snapshot() -> Result<(), Box<dyn Error>> {
    let (_tx, rx) = pipe::new()?;
    let mut source = new_source(rx)?;
    source.start_thread()?;

    let client = source.client();
    assert_eq!(client.name(), "pipe0");
    let events = client.get_events().await?;
    assert_eq!(events[0].name, "button");
    let options = client.list_options().await?;
    assert_eq!(options[0].name, "deadzone");

    Ok(())
}

/// Backend that stalls while handling input
struct StallingDevice {
    rx: pipe::Receiver,
    stall: Duration,
    busy: Arc<AtomicBool>,
}

impl SourceDevice for StallingDevice {
    fn setup(&mut self, source: &mut SourceSetup<'_>) -> Result<(), InputError> {
        source.watch_file(self.rx.as_raw_fd(), 0);
        Ok(())
    }

    fn process(
        &mut self,
        _tag: WatchTag,
        _ctx: &mut DeviceContext<'_>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.busy.store(true, Ordering::SeqCst);
        thread::sleep(self.stall);
        Ok(())
    }
}

#[test]
fn test_snapshot_times_out() -> Result<(), Box<dyn Error>> {
    let (mut tx, rx) = pipe::new()?;
    let busy = Arc::new(AtomicBool::new(false));
    let backend = StallingDevice {
        rx,
        stall: Duration::from_millis(500),
        busy: busy.clone(),
    };
    let options = SourceOptions {
        reply_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let mut source = InputSource::new(
        Arc::new(ManagerContext::default()),
        Arc::new(Profile::default()),
        Box::new(backend),
        options,
    )?;
    source.setup()?;
    source.start_thread()?;

    tx.write_all(&[1])?;
    let deadline = Instant::now() + Duration::from_secs(2);
    while !busy.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(busy.load(Ordering::SeqCst));

    let started = Instant::now();
    assert!(matches!(source.get_events(), Err(InputError::Timeout)));
    assert!(matches!(source.list_options(), Err(InputError::Timeout)));
    assert!(started.elapsed() < Duration::from_millis(450));

    Ok(())
}

#[test]
fn test_recurring_events_without_input() -> Result<(), Box<dyn Error>> {
    let (mut tx, rx) = pipe::new()?;
    let options = SourceOptions {
        do_recurring_events: true,
        recurring_interval: Duration::from_millis(8),
        ..Default::default()
    };
    let mut source = new_source_with(rx, options)?;
    let profile = Profile::new("repeat")
        .with_mapping("button", TranslatorConfig::Repeat { target: None });
    source.set_profile(Arc::new(profile))?;
    let (slot, mut out) = ChannelOutputSlot::channel(1024);
    source.set_slot(Some(Box::new(slot)))?;
    source.start_thread()?;

    tx.write_all(&[1])?;
    assert_eq!(recv_event(&mut out), Some(OutputEvent::new(0, "button", 1)));

    // No more input, the device thread keeps re-emitting on its own
    thread::sleep(Duration::from_millis(100));
    let mut repeated = 0;
    while let Ok(cmd) = out.try_recv() {
        if let TargetCommand::WriteEvent(event) = cmd {
            assert_eq!(event, OutputEvent::new(0, "button", 1));
            repeated += 1;
        }
    }
    assert!(repeated >= 3, "only {repeated} values re-emitted");

    Ok(())
}

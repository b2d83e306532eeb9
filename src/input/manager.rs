use std::{collections::HashMap, sync::Arc};

use crate::udev::device::UdevDevice;

use super::{
    error::InputError,
    event::{EventDecl, EventRegistry, SourceEvent},
    option::{OptionDecl, OptionInfo, OptionTable},
    profile::Profile,
    source::{client::SourceClient, InputSource, SourceDevice, SourceOptions},
};

/// Read-only view of a device manager handed to every device it creates.
/// Devices use it for logging and to resolve configuration-facing names.
#[derive(Debug, Clone, Default)]
pub struct ManagerContext {
    /// Name of the manager, e.g. "gamepad"
    pub name: String,
    /// Configuration-facing name to canonical event or option name
    pub aliases: HashMap<String, String>,
}

/// Declarations shared by every device of one backend family
#[derive(Debug, Default)]
pub struct ManagerDeclarations {
    events: EventRegistry,
    options: OptionTable,
    aliases: HashMap<String, String>,
}

impl ManagerDeclarations {
    /// Declare an event that every device of this family carries
    pub fn register_event(&mut self, decl: EventDecl) -> Result<usize, InputError> {
        self.events.register_event(decl)
    }

    /// Declare an option that every device of this family carries
    pub fn register_option(&mut self, decl: OptionDecl) -> Result<(), InputError> {
        self.options.register_option(decl)
    }

    /// Map a configuration-facing name to a canonical event or option name
    pub fn register_alias(&mut self, alias: &str, name: &str) -> Result<(), InputError> {
        if self.aliases.contains_key(alias) {
            return Err(InputError::DuplicateName(alias.to_string()));
        }
        self.aliases.insert(alias.to_string(), name.to_string());
        Ok(())
    }

    /// Declarations to seed a new device with, in id order
    fn event_decls(&self) -> Vec<EventDecl> {
        self.events
            .get_events()
            .iter()
            .map(|event| {
                EventDecl::new(&event.name, &event.description, event.event_type)
                    .with_id(event.id)
                    .with_state(event.state)
            })
            .collect()
    }
}

/// A [ManagerBackend] decides which devices a [DeviceManager] manages and
/// supplies the declarations shared by all of them.
pub trait ManagerBackend: Send {
    /// Name of the backend family. Devices are named after it.
    fn name(&self) -> String;

    /// Declare the events, options and aliases shared by every device.
    /// Called once when the manager is created.
    fn declare(&self, _decls: &mut ManagerDeclarations) -> Result<(), InputError> {
        Ok(())
    }

    /// Returns true if the given device should be managed
    fn accept_device(&self, device: &UdevDevice) -> bool;
}

/// Owns every live [InputSource] of one backend family
///
/// Devices only hold a read-only [ManagerContext] snapshot, so the manager
/// can be torn down at any point: dropping it stops and joins every device
/// thread first.
pub struct DeviceManager {
    backend: Box<dyn ManagerBackend>,
    options: SourceOptions,
    declarations: ManagerDeclarations,
    context: Arc<ManagerContext>,
    profile: Arc<Profile>,
    devices: Vec<InputSource>,
    next_index: usize,
}

impl DeviceManager {
    /// Create a new manager and collect the declarations of its backend
    pub fn new(
        backend: Box<dyn ManagerBackend>,
        options: SourceOptions,
    ) -> Result<Self, InputError> {
        let mut declarations = ManagerDeclarations::default();
        backend.declare(&mut declarations)?;
        let context = Arc::new(ManagerContext {
            name: backend.name(),
            aliases: declarations.aliases.clone(),
        });
        log::debug!("Created device manager '{}'", context.name);

        Ok(Self {
            backend,
            options,
            declarations,
            context,
            profile: Arc::new(Profile::default()),
            devices: Vec::new(),
            next_index: 0,
        })
    }

    pub fn name(&self) -> &str {
        self.context.name.as_str()
    }

    /// Current context snapshot handed to new devices
    pub fn context(&self) -> Arc<ManagerContext> {
        self.context.clone()
    }

    fn check_no_devices(&self) -> Result<(), InputError> {
        if !self.devices.is_empty() {
            return Err(InputError::InvalidState(format!(
                "{} already manages devices",
                self.name()
            )));
        }
        Ok(())
    }

    /// Declare an event shared by every device. Only possible before the
    /// first device is added.
    pub fn register_event(&mut self, decl: EventDecl) -> Result<usize, InputError> {
        self.check_no_devices()?;
        self.declarations.register_event(decl)
    }

    /// Declare an option shared by every device. Only possible before the
    /// first device is added.
    pub fn register_option(&mut self, decl: OptionDecl) -> Result<(), InputError> {
        self.check_no_devices()?;
        self.declarations.register_option(decl)
    }

    /// Map a configuration-facing name to a canonical one. Only possible
    /// before the first device is added.
    pub fn register_alias(&mut self, alias: &str, name: &str) -> Result<(), InputError> {
        self.check_no_devices()?;
        self.declarations.register_alias(alias, name)?;
        self.context = Arc::new(ManagerContext {
            name: self.context.name.clone(),
            aliases: self.declarations.aliases.clone(),
        });
        Ok(())
    }

    /// Returns the events shared by every device
    pub fn get_events(&self) -> &[SourceEvent] {
        self.declarations.events.get_events()
    }

    /// Returns the options shared by every device
    pub fn list_options(&self) -> Vec<OptionInfo> {
        self.declarations.options.list_options()
    }

    /// Create and start a device for the given kernel device, backed by the
    /// given backend. Returns a client to reconfigure the device.
    pub fn add_device(
        &mut self,
        device: UdevDevice,
        backend: Box<dyn SourceDevice>,
    ) -> Result<SourceClient, InputError> {
        if !self.backend.accept_device(&device) {
            log::debug!("{}: rejected device {}", self.name(), device.devnode());
            return Err(InputError::DeviceRejected(device.devnode().to_string()));
        }

        let mut source = InputSource::new(
            self.context.clone(),
            self.profile.clone(),
            backend,
            self.options.clone(),
        )?;
        let name = format!("{}{}", self.name(), self.next_index);
        self.next_index += 1;
        source.set_name(&name)?;
        for decl in self.declarations.event_decls() {
            source.register_event(decl)?;
        }
        for decl in self.declarations.options.list_options() {
            source.register_option(decl)?;
        }
        source.set_device(device);
        source.setup()?;
        source.start_thread()?;

        log::info!(
            "{}: added device {name} ({})",
            self.context.name,
            source.get_description()
        );
        let client = source.client();
        self.devices.push(source);

        Ok(client)
    }

    /// Stop the device with the given name and stop managing it
    pub fn remove_device(&mut self, name: &str) -> Result<(), InputError> {
        let Some(idx) = self.devices.iter().position(|d| d.get_name() == name) else {
            return Err(InputError::UnknownDevice(name.to_string()));
        };
        let mut source = self.devices.remove(idx);
        source.end_thread();
        log::info!("{}: removed device {name}", self.context.name);
        Ok(())
    }

    pub fn get_device(&self, name: &str) -> Option<&InputSource> {
        self.devices.iter().find(|d| d.get_name() == name)
    }

    /// Call the given function for every managed device. Devices must only
    /// be changed through their clients.
    pub fn for_all_devices<F>(&self, mut f: F)
    where
        F: FnMut(&InputSource),
    {
        for device in self.devices.iter() {
            f(device);
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Replace the profile and hand the new snapshot to every device
    pub fn set_profile(&mut self, profile: Profile) {
        log::info!("{}: loading profile '{}'", self.context.name, profile.name());
        self.profile = Arc::new(profile);
        for device in self.devices.iter_mut() {
            if let Err(e) = device.set_profile(self.profile.clone()) {
                log::error!(
                    "{}: failed to set profile on {}: {e}",
                    self.context.name,
                    device.get_name()
                );
            }
        }
    }

    pub fn get_profile(&self) -> Arc<Profile> {
        self.profile.clone()
    }

    /// Stop and join every device thread
    pub fn shutdown(&mut self) {
        if self.devices.is_empty() {
            return;
        }
        log::debug!("{}: stopping {} devices", self.context.name, self.devices.len());
        for device in self.devices.iter_mut() {
            device.end_thread();
        }
        self.devices.clear();
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

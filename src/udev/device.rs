use std::{error::Error, ffi::OsStr, path::Path};

/// Identity of a kernel device node. This is what a device manager looks at
/// to decide if it wants to manage a device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UdevDevice {
    devnode: String,
    subsystem: String,
    syspath: String,
    sysname: String,
}

impl UdevDevice {
    pub fn new(devnode: &str, subsystem: &str, syspath: &str, sysname: &str) -> Self {
        Self {
            devnode: devnode.to_string(),
            subsystem: subsystem.to_string(),
            syspath: syspath.to_string(),
            sysname: sysname.to_string(),
        }
    }

    /// Returns a UdevDevice object from the given base path and name. The
    /// subsystem is guessed from the node name.
    /// e.g. UdevDevice::from_devnode("/dev/input", "event3");
    pub fn from_devnode(base_path: &str, name: &str) -> Self {
        let subsystem = match base_path {
            "/dev/input" => "input",
            "/dev" if name.starts_with("hidraw") => "hidraw",
            "/dev" if name.starts_with("iio:") => "iio",
            "/dev" if name.starts_with("tty") => "tty",
            _ => "",
        };

        Self {
            devnode: format!("{base_path}/{name}"),
            subsystem: subsystem.to_string(),
            syspath: String::new(),
            sysname: name.to_string(),
        }
    }

    /// Returns a udev::Device from the stored syspath
    pub fn get_device(&self) -> Result<::udev::Device, Box<dyn Error + Send + Sync>> {
        Ok(::udev::Device::from_syspath(Path::new(self.syspath.as_str()))?)
    }

    /// Returns the value of the given sysfs attribute, looking at the parents
    /// of the device if it does not carry the attribute itself.
    pub fn get_attribute(&self, attribute: &str) -> Option<String> {
        let device = self.get_device().ok()?;
        let mut current = Some(device);
        while let Some(dev) = current {
            if let Some(value) = dev.attribute_value(attribute) {
                return Some(value.to_string_lossy().trim().to_string());
            }
            current = dev.parent();
        }
        None
    }

    /// Unique identifier of the physical device, e.g. a bluetooth address
    pub fn uniq(&self) -> Option<String> {
        self.get_attribute("uniq").filter(|v| !v.is_empty())
    }

    pub fn devnode(&self) -> &str {
        self.devnode.as_str()
    }

    pub fn subsystem(&self) -> &str {
        self.subsystem.as_str()
    }

    pub fn sysname(&self) -> &str {
        self.sysname.as_str()
    }

    pub fn syspath(&self) -> &str {
        self.syspath.as_str()
    }
}

impl From<::udev::Device> for UdevDevice {
    fn from(device: ::udev::Device) -> Self {
        let devnode = device
            .devnode()
            .unwrap_or(Path::new(""))
            .to_string_lossy()
            .to_string();
        let subsystem = device
            .subsystem()
            .unwrap_or(OsStr::new(""))
            .to_string_lossy()
            .to_string();
        let sysname = device.sysname().to_string_lossy().to_string();
        let syspath = device.syspath().to_string_lossy().to_string();

        Self {
            devnode,
            subsystem,
            sysname,
            syspath,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UdevDevice;

    #[test]
    fn test_from_devnode() {
        let device = UdevDevice::from_devnode("/dev/input", "event3");
        assert_eq!(device.devnode(), "/dev/input/event3");
        assert_eq!(device.subsystem(), "input");
        assert_eq!(device.sysname(), "event3");

        let device = UdevDevice::from_devnode("/dev", "hidraw1");
        assert_eq!(device.subsystem(), "hidraw");

        let device = UdevDevice::from_devnode("/tmp", "pipe");
        assert_eq!(device.subsystem(), "");
    }
}

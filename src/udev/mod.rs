//! Identity of the kernel devices that input sources are created for
pub mod device;

pub use device::UdevDevice;

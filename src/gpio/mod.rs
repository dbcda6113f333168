// OS-specific. for now linux only.
mod sysfs;

pub use self::sysfs::{
	SysfsGpio,
	SysfsPin,
};

use std::ffi::CString;
use std::fs;
use std::io::{
	self,
	Write,
};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileExt;
use std::os::unix::io::{
	AsRawFd,
	FromRawFd,
};
use std::path::{
	Path,
	PathBuf,
};

use libc::{
	LOCK_EX,
	LOCK_UN,
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	flock,
	open,
};

use crate::twi::{
	Hardware,
	Line,
};

const GPIO_CLASS: &str = "/sys/class/gpio";

fn open_attribute(path: &Path) -> io::Result<fs::File> {
	let path = CString::new(path.as_os_str().as_bytes())?;

	let fd = unsafe { open(path.as_ptr(), O_RDWR | O_CLOEXEC | O_SYNC) };
	if -1 == fd {
		return Err(io::Error::last_os_error());
	}
	// now get fd managed to prevent resource leak
	Ok(unsafe { fs::File::from_raw_fd(fd) })
}

fn export(number: u32) -> crate::AResult<PathBuf> {
	let dir = Path::new(GPIO_CLASS).join(format!("gpio{}", number));
	if dir.exists() {
		return Ok(dir);
	}

	with_context!(("export GPIO {}", number), {
		// needs to be written in one syscall
		fs::OpenOptions::new()
			.write(true)
			.open(Path::new(GPIO_CLASS).join("export"))?
			.write_all(number.to_string().as_bytes())?;
		Ok(())
	})?;
	info!("exported GPIO {}", number);

	Ok(dir)
}

/// A single GPIO through the sysfs interface, used as open-drain line
#[derive(Debug)]
pub struct SysfsPin {
	number: u32,
	direction: fs::File,
	value: fs::File,
	floating: Option<bool>,
}

impl SysfsPin {
	pub fn open(number: u32) -> crate::AResult<Self> {
		let dir = export(number)?;

		with_context!(("open GPIO {}", number), {
			let direction = open_attribute(&dir.join("direction"))?;
			let value = open_attribute(&dir.join("value"))?;

			Ok(SysfsPin {
				number,
				direction,
				value,
				floating: None,
			})
		})
	}

	pub fn number(&self) -> u32 {
		self.number
	}

	fn write_direction(&mut self, floating: bool) -> io::Result<()> {
		if self.floating == Some(floating) {
			return Ok(());
		}
		// "low" switches to output and clears the level atomically; the pin is
		// never driven high
		let direction: &[u8] = if floating { b"in" } else { b"low" };
		let l = self.direction.write_at(direction, 0)?;
		if l != direction.len() {
			return Err(io::Error::new(io::ErrorKind::Other, "short write to GPIO direction"));
		}
		self.floating = Some(floating);
		Ok(())
	}

	fn set_direction(&mut self, floating: bool) {
		self.write_direction(floating).expect("writing GPIO direction must not fail");
	}

	pub fn float(&mut self) {
		self.set_direction(true);
	}

	pub fn drive_low(&mut self) {
		self.set_direction(false);
	}

	pub fn sample(&mut self) -> bool {
		let mut buf = [0u8; 1];
		let l = self.value.read_at(&mut buf, 0).expect("reading GPIO value must not fail");
		assert_eq!(l, 1, "empty GPIO value");
		buf[0] == b'1'
	}

	fn lock(&mut self, operation: libc::c_int) {
		let res = unsafe { flock(self.value.as_raw_fd(), operation) };
		if 0 != res {
			panic!("flock on GPIO {} failed: {}", self.number, io::Error::last_os_error());
		}
	}
}

/// Clock and data line on two sysfs GPIOs.
///
/// Both pins need pull-ups (external, or configured elsewhere). Frames take
/// an advisory lock on both value files, which keeps cooperating processes
/// off the bus; everything else touching the pins breaks the timing.
#[derive(Debug)]
pub struct SysfsGpio {
	clock: SysfsPin,
	data: SysfsPin,
}

impl SysfsGpio {
	pub fn open(clock: u32, data: u32) -> crate::AResult<Self> {
		ensure!(clock != data, "clock and data need separate GPIOs (both are {})", clock);
		let mut gpio = SysfsGpio {
			clock: SysfsPin::open(clock)?,
			data: SysfsPin::open(data)?,
		};
		// start with an idle bus
		gpio.clock.float();
		gpio.data.float();
		debug!("opened bus on GPIO {} (clock), {} (data)", clock, data);
		Ok(gpio)
	}

	fn pin(&mut self, line: Line) -> &mut SysfsPin {
		match line {
			Line::Clock => &mut self.clock,
			Line::Data => &mut self.data,
		}
	}
}

impl Drop for SysfsGpio {
	fn drop(&mut self) {
		// leave the bus idle
		for pin in &mut [&mut self.clock, &mut self.data] {
			if let Err(e) = pin.write_direction(true) {
				error!("couldn't release GPIO {}: {}", pin.number, e);
			}
		}
	}
}

impl Hardware for SysfsGpio {
	fn float(&mut self, line: Line) {
		self.pin(line).float();
	}

	fn drive_low(&mut self, line: Line) {
		self.pin(line).drive_low();
	}

	fn sample(&mut self, line: Line) -> bool {
		self.pin(line).sample()
	}

	fn acquire(&mut self) {
		self.clock.lock(LOCK_EX);
		self.data.lock(LOCK_EX);
	}

	fn release(&mut self) {
		self.data.lock(LOCK_UN);
		self.clock.lock(LOCK_UN);
	}
}

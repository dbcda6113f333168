use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Line {
	Clock,
	Data,
}

/// Access to the two bus lines.
///
/// Lines are open-drain: there is deliberately no way to drive a line HIGH,
/// it can only be released to the pull-up (`float`) or pulled LOW.
///
/// While a frame is in progress nothing else may touch the lines or delay
/// the caller long enough to break the bit timing; `acquire` / `release`
/// bracket every frame-level operation to make that possible (mask
/// interrupts, lock the device, ...).
pub trait Hardware {
	/// switch line to input; the pull-up takes it HIGH
	fn float(&mut self, line: Line);

	/// switch line to output with level LOW
	fn drive_low(&mut self, line: Line);

	/// current level; only meaningful while the line is floating
	fn sample(&mut self, line: Line) -> bool;

	// delay for (at least) `us` microseconds
	fn delay_us(&mut self, us: u32) {
		reliable_sleep(Duration::from_micros(u64::from(us)));
	}

	fn acquire(&mut self) {
	}

	fn release(&mut self) {
	}
}

impl<'a, H: ?Sized + Hardware> Hardware for &'a mut H {
	fn float(&mut self, line: Line) {
		H::float(*self, line)
	}
	fn drive_low(&mut self, line: Line) {
		H::drive_low(*self, line)
	}
	fn sample(&mut self, line: Line) -> bool {
		H::sample(*self, line)
	}
	fn delay_us(&mut self, us: u32) {
		H::delay_us(*self, us)
	}
	fn acquire(&mut self) {
		H::acquire(*self)
	}
	fn release(&mut self) {
		H::release(*self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reliable_sleep_waits_at_least_duration() {
		let duration = Duration::from_micros(200);
		let now = Instant::now();
		reliable_sleep(duration);
		assert!(now.elapsed() >= duration);
	}
}

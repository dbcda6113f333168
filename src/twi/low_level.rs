use std::ops::{
	Deref,
	DerefMut,
};

use super::{
	Hardware,
	Line,
};

/// Device didn't pull DATA low after a written byte
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "no ACK after {} polls", attempts)]
pub struct AckFailure {
	pub attempts: u32,
}

/// Exclusive access to the bus lines; released on drop
pub struct Exclusive<'a, H: ?Sized+Hardware+'a>(&'a mut H);

impl<'a, H: ?Sized+Hardware> Drop for Exclusive<'a, H> {
	fn drop(&mut self) {
		self.0.release();
	}
}

impl<'a, H: ?Sized+Hardware> Deref for Exclusive<'a, H> {
	type Target = H;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'a, H: ?Sized+Hardware> DerefMut for Exclusive<'a, H> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

pub trait LowLevel: Hardware {
	// let the pull-up raise CLK; wait for the rise time on both sides
	fn clock_high(&mut self) {
		self.delay_us(1);
		self.float(Line::Clock);
		self.delay_us(1);
	}

	// device samples DATA while CLK is low, give it time
	fn clock_low(&mut self) {
		self.delay_us(1);
		self.drive_low(Line::Clock);
		self.delay_us(2);
	}

	fn clock_cycle(&mut self) {
		self.clock_low();
		self.clock_high();
	}

	fn clock_cycles(&mut self, count: u32) {
		for _ in 0..count {
			self.clock_cycle();
		}
	}

	fn data_high(&mut self) {
		self.delay_us(1);
		self.float(Line::Data);
		self.delay_us(2);
	}

	fn data_low(&mut self) {
		self.delay_us(1);
		self.drive_low(Line::Data);
		self.delay_us(2);
	}

	// leaves DATA floating, so the device can drive it afterwards
	fn read_data_bit(&mut self) -> bool {
		self.delay_us(1);
		self.float(Line::Data);
		self.delay_us(4);
		self.sample(Line::Data)
	}

	// DATA falls while CLK is high
	fn start(&mut self) {
		self.clock_low();
		self.data_high();
		self.delay_us(4);
		self.clock_high();
		self.delay_us(4);
		self.data_low();
		self.delay_us(4);
		self.clock_low();
		self.delay_us(4);
	}

	// DATA rises while CLK is high; leaves both lines floating (bus idle)
	fn stop(&mut self) {
		self.clock_low();
		self.data_low();
		self.clock_high();
		self.delay_us(8);
		self.data_high();
		self.delay_us(4);
	}

	// answer a received byte: ACK (LOW) to continue, NAK (HIGH) after the last
	fn ack_nak(&mut self, ack: bool) {
		self.clock_low();
		if ack {
			self.data_low();
		} else {
			self.data_high();
		}
		self.clock_high();
		self.clock_low();
	}

	// synchronous mode sync after power up: DATA high, then clock the device.
	// no stop afterwards, the first command follows directly.
	fn power_on(&mut self, clocks: u32) {
		self.data_high();
		self.clock_low();
		self.clock_cycles(clocks);
	}

	// send byte starting with highest bit, then poll for the ACK
	//
	// the ACK is only sampled (up to `ack_tries` times) during a single
	// CLK-HIGH phase; the device holds DATA low until CLK falls again.
	fn write_byte(&mut self, value: u8, ack_tries: u32) -> Result<(), AckFailure> {
		for bit in (0..8).rev() {
			self.clock_low();
			if 0 != value & (1u8 << bit) {
				self.data_high();
			} else {
				self.data_low();
			}
			self.clock_high();
		}
		self.clock_low();

		// release DATA for the ACK
		self.data_high();
		self.delay_us(8);
		self.clock_high();
		let acked = (0..ack_tries).any(|_| !self.read_data_bit());
		self.clock_low();

		if acked {
			trace!("wrote {:02x}", value);
			Ok(())
		} else {
			trace!("wrote {:02x}: no ACK", value);
			Err(AckFailure { attempts: ack_tries })
		}
	}

	// read byte starting with highest bit; caller has to send ACK/NAK
	fn read_byte(&mut self) -> u8 {
		self.data_high();
		let mut result = 0u8;
		for bit in (0..8).rev() {
			self.clock_cycle();
			if self.read_data_bit() {
				result |= 1u8 << bit;
			}
			self.clock_low();
		}
		trace!("read {:02x}", result);
		result
	}

	fn exclusive(&mut self) -> Exclusive<Self> {
		self.acquire();
		Exclusive(self)
	}
}

impl<H: Hardware+?Sized> LowLevel for H {
}

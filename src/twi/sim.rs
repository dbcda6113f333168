// Simulated bus with a CryptoMemory-like device for tests.
//
// Both lines are wired-AND: a line is HIGH unless host or device pulls it
// LOW. The device only reacts to edges the host produces; it changes DATA
// only right after a falling CLK edge, like the real chip.

use std::collections::VecDeque;

use super::{
	Hardware,
	Line,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
	// waiting for a start condition
	Idle,
	// shifting in a byte from the host
	Receive { bits: u8, value: u8 },
	// full byte received; drive (or skip) the ACK after the next falling CLK
	AckPending { ack: bool },
	// DATA held LOW for the ACK clock
	Acking,
	// shifting out `value`, currently presenting `bit`
	Transmit { value: u8, bit: u8 },
	// released DATA, host will ACK or NAK on the next rising CLK
	AwaitAck,
	// host answered; continue (ACK) or go idle (NAK) on falling CLK
	Answered { ack: bool },
}

#[derive(Debug)]
pub struct Device {
	state: State,
	data_low: bool,
	frame_bytes: usize,

	/// stop acknowledging at this byte index within a frame
	pub nak_from: Option<usize>,
	/// start transmitting `reply` once this many bytes were received in a frame
	pub reply_after: usize,
	pub reply: VecDeque<u8>,
	/// queue every received byte for reading back
	pub echo: bool,

	pub written: Vec<u8>,
	pub starts: usize,
	pub stops: usize,
	pub host_acks: usize,
	pub host_naks: usize,
}

impl Device {
	fn new() -> Self {
		Device {
			state: State::Idle,
			data_low: false,
			frame_bytes: 0,
			nak_from: None,
			reply_after: 0,
			reply: VecDeque::new(),
			echo: false,
			written: Vec::new(),
			starts: 0,
			stops: 0,
			host_acks: 0,
			host_naks: 0,
		}
	}

	fn start(&mut self) {
		self.starts += 1;
		self.data_low = false;
		self.frame_bytes = 0;
		self.state = State::Receive { bits: 0, value: 0 };
	}

	fn stop(&mut self) {
		self.stops += 1;
		self.data_low = false;
		self.state = State::Idle;
	}

	fn present(&mut self, value: u8, bit: u8) {
		self.data_low = 0 == value & (1 << bit);
		self.state = State::Transmit { value, bit };
	}

	fn transmit_next(&mut self) {
		let value = self.reply.pop_front().unwrap_or(0xff);
		self.present(value, 7);
	}

	fn rising(&mut self, data: bool) {
		match self.state {
			State::Receive { bits, value } => {
				let value = (value << 1) | (data as u8);
				if bits == 7 {
					self.written.push(value);
					if self.echo {
						self.reply.push_back(value);
					}
					let index = self.frame_bytes;
					self.frame_bytes += 1;
					let ack = self.nak_from.map_or(true, |n| index < n);
					self.state = State::AckPending { ack };
				} else {
					self.state = State::Receive { bits: bits + 1, value };
				}
			},
			State::AwaitAck => {
				let ack = !data;
				if ack {
					self.host_acks += 1;
				} else {
					self.host_naks += 1;
				}
				self.state = State::Answered { ack };
			},
			_ => (),
		}
	}

	fn falling(&mut self) {
		match self.state {
			State::AckPending { ack: true } => {
				self.data_low = true;
				self.state = State::Acking;
			},
			State::AckPending { ack: false } => {
				self.state = State::Idle;
			},
			State::Acking => {
				self.data_low = false;
				if self.frame_bytes >= self.reply_after && !self.reply.is_empty() {
					self.transmit_next();
				} else {
					self.state = State::Receive { bits: 0, value: 0 };
				}
			},
			State::Transmit { value, bit } => {
				if bit == 0 {
					self.data_low = false;
					self.state = State::AwaitAck;
				} else {
					self.present(value, bit - 1);
				}
			},
			State::Answered { ack: true } => self.transmit_next(),
			State::Answered { ack: false } => {
				self.state = State::Idle;
			},
			_ => (),
		}
	}
}

#[derive(Debug)]
pub struct SimBus {
	clock_low: bool,
	data_low: bool,

	pub device: Device,
	/// virtual clock, advanced by `delay_us`
	pub elapsed_us: u64,
	pub rising_edges: usize,
	pub acquired: usize,
	pub released: usize,
}

impl SimBus {
	pub fn new() -> Self {
		SimBus {
			clock_low: false,
			data_low: false,
			device: Device::new(),
			elapsed_us: 0,
			rising_edges: 0,
			acquired: 0,
			released: 0,
		}
	}

	pub fn clock_level(&self) -> bool {
		!self.clock_low
	}

	pub fn data_level(&self) -> bool {
		!(self.data_low || self.device.data_low)
	}

	/// neither host nor device pulls a line down
	pub fn is_idle(&self) -> bool {
		self.clock_level() && self.data_level()
	}

	fn set_host(&mut self, line: Line, low: bool) {
		let clock_before = self.clock_level();
		let data_before = self.data_level();

		match line {
			Line::Clock => self.clock_low = low,
			Line::Data => self.data_low = low,
		}

		let clock = self.clock_level();
		let data = self.data_level();

		if clock_before && clock && data_before != data {
			if data {
				self.device.stop();
			} else {
				self.device.start();
			}
		} else if !clock_before && clock {
			self.rising_edges += 1;
			self.device.rising(data);
		} else if clock_before && !clock {
			self.device.falling();
		}
	}
}

impl Hardware for SimBus {
	fn float(&mut self, line: Line) {
		self.set_host(line, false);
	}

	fn drive_low(&mut self, line: Line) {
		self.set_host(line, true);
	}

	fn sample(&mut self, line: Line) -> bool {
		match line {
			Line::Clock => self.clock_level(),
			Line::Data => self.data_level(),
		}
	}

	fn delay_us(&mut self, us: u32) {
		self.elapsed_us += u64::from(us);
	}

	fn acquire(&mut self) {
		assert_eq!(self.acquired, self.released, "nested bus acquisition");
		self.acquired += 1;
	}

	fn release(&mut self) {
		self.released += 1;
		assert_eq!(self.acquired, self.released, "release without acquire");
	}
}

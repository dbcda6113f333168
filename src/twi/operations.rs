use super::{
	BusConfig,
	Hardware,
	LowLevel,
};

// bare clocks per `wait_clock` loop
const WAIT_CLOCK_CYCLES: u32 = 15;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Fail)]
pub enum TransferError {
	#[fail(display = "device didn't acknowledge instruction byte after repeated start")]
	Start,
	#[fail(display = "device didn't acknowledge command byte")]
	CommandByte,
	#[fail(display = "device didn't acknowledge data byte")]
	DataWrite,
}

fn send_command<H>(hw: &mut H, config: &BusConfig, command: &[u8]) -> Result<(), TransferError>
where
	H: LowLevel + ?Sized,
{
	assert!(!command.is_empty(), "command needs at least the instruction byte");

	let mut attempt = 0;
	loop {
		attempt += 1;
		hw.start();
		match hw.write_byte(command[0], config.ack_tries) {
			Ok(()) => break,
			Err(e) if attempt < config.start_tries => {
				warn!("instruction {:02x} (attempt {}/{}): {}", command[0], attempt, config.start_tries, e);
			},
			Err(e) => {
				warn!("instruction {:02x}: giving up after {} attempts: {}", command[0], attempt, e);
				return Err(TransferError::Start);
			},
		}
	}

	for (index, &byte) in command.iter().enumerate().skip(1) {
		if let Err(e) = hw.write_byte(byte, config.ack_tries) {
			warn!("command byte {} ({:02x}): {}", index, byte, e);
			return Err(TransferError::CommandByte);
		}
	}

	debug!("sent command {:02x?}", command);
	Ok(())
}

fn send_data<H>(hw: &mut H, config: &BusConfig, data: &[u8]) -> Result<(), TransferError>
where
	H: LowLevel + ?Sized,
{
	let mut result = Ok(());
	for (index, &byte) in data.iter().enumerate() {
		if let Err(e) = hw.write_byte(byte, config.ack_tries) {
			warn!("data byte {} ({:02x}): {}", index, byte, e);
			result = Err(TransferError::DataWrite);
			break;
		}
	}

	// stop even if nothing was sent or a byte failed
	hw.stop();

	if result.is_ok() {
		debug!("sent {} data bytes", data.len());
	}
	result
}

fn receive_data<H>(hw: &mut H, buf: &mut [u8])
where
	H: LowLevel + ?Sized,
{
	if let Some((last, head)) = buf.split_last_mut() {
		for byte in head {
			*byte = hw.read_byte();
			hw.ack_nak(true);
		}
		*last = hw.read_byte();
		hw.ack_nak(false);
	}

	hw.stop();

	debug!("received {:02x?}", buf);
}

/// Frame-level access to a CryptoMemory device on two open-drain lines.
///
/// Every operation runs with the hardware acquired (see `Hardware`), but a
/// command frame spans several operations: `send_command` leaves the frame
/// open for `send_data` or `receive_data`, which close it with a stop.
pub struct Bus<H: Hardware> {
	hardware: H,
	config: BusConfig,
}

impl<H: Hardware> Bus<H> {
	pub fn new(hardware: H) -> Self {
		Self::with_config(hardware, BusConfig::default())
	}

	pub fn with_config(hardware: H, config: BusConfig) -> Self {
		assert!(config.ack_tries > 0 && config.start_tries > 0, "invalid bus config: {:?}", config);
		Bus {
			hardware,
			config,
		}
	}

	pub fn config(&self) -> BusConfig {
		self.config
	}

	pub fn hardware(&self) -> &H {
		&self.hardware
	}

	pub fn hardware_mut(&mut self) -> &mut H {
		&mut self.hardware
	}

	pub fn into_inner(self) -> H {
		self.hardware
	}

	/// Sync sequence after powering the device; must precede the first command
	pub fn power_on(&mut self) {
		let clocks = self.config.power_on_clocks;
		self.hardware.exclusive().power_on(clocks);
		debug!("power on: {} clocks", clocks);
	}

	/// Start a frame and send the command bytes.
	///
	/// The first byte (instruction) is retried with a fresh start condition
	/// up to `start_tries` times; a missing ACK on any later byte fails the
	/// command immediately. On success the frame stays open: follow up with
	/// `send_data` or `receive_data`.
	///
	/// Panics if `command` is empty.
	pub fn send_command(&mut self, command: &[u8]) -> Result<(), TransferError> {
		send_command(&mut *self.hardware.exclusive(), &self.config, command)
	}

	/// Send data bytes and close the frame with a stop condition.
	///
	/// The stop is sent in every case, also after a failed byte.
	pub fn send_data(&mut self, data: &[u8]) -> Result<(), TransferError> {
		send_data(&mut *self.hardware.exclusive(), &self.config, data)
	}

	/// Fill `buf` from the device and close the frame with a stop condition.
	///
	/// Every byte but the last gets an ACK, the last one a NAK. An empty
	/// buffer only sends the stop.
	pub fn receive_data(&mut self, buf: &mut [u8]) -> Result<(), TransferError> {
		receive_data(&mut *self.hardware.exclusive(), buf);
		Ok(())
	}

	/// `send_command` followed by `send_data`, in a single acquisition.
	///
	/// Always ends with a stop condition.
	pub fn transfer_write(&mut self, command: &[u8], data: &[u8]) -> Result<(), TransferError> {
		let config = self.config;
		let mut hw = self.hardware.exclusive();
		if let Err(e) = send_command(&mut *hw, &config, command) {
			hw.stop();
			return Err(e);
		}
		send_data(&mut *hw, &config, data)
	}

	/// `send_command` followed by `receive_data`, in a single acquisition.
	///
	/// Always ends with a stop condition.
	pub fn transfer_read(&mut self, command: &[u8], buf: &mut [u8]) -> Result<(), TransferError> {
		let config = self.config;
		let mut hw = self.hardware.exclusive();
		if let Err(e) = send_command(&mut *hw, &config, command) {
			hw.stop();
			return Err(e);
		}
		receive_data(&mut *hw, buf);
		Ok(())
	}

	/// Give the device time: `loops` times start, 15 clocks, stop.
	///
	/// `start` pulls DATA low itself; touching DATA before it while CLK is
	/// high would be a start condition of its own.
	pub fn wait_clock(&mut self, loops: u32) {
		let mut hw = self.hardware.exclusive();
		for _ in 0..loops {
			hw.start();
			hw.clock_cycles(WAIT_CLOCK_CYCLES);
			hw.stop();
		}
	}
}

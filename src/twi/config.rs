// defaults from the reference port header for the CryptoMemory library
const DEFAULT_ACK_TRIES: u32 = 8;
const DEFAULT_START_TRIES: u32 = 10;
const DEFAULT_POWER_ON_CLOCKS: u32 = 15;

/// Protocol constants; fixed for the lifetime of a `Bus`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BusConfig {
	/// how often to sample DATA for an ACK after writing a byte
	pub ack_tries: u32,
	/// how many start + instruction byte attempts a command gets
	pub start_tries: u32,
	/// clock cycles to sync the device after power up
	pub power_on_clocks: u32,
}

impl BusConfig {
	pub fn ack_tries(mut self, tries: u32) -> Self {
		self.ack_tries = tries;
		self
	}

	pub fn start_tries(mut self, tries: u32) -> Self {
		self.start_tries = tries;
		self
	}

	pub fn power_on_clocks(mut self, clocks: u32) -> Self {
		self.power_on_clocks = clocks;
		self
	}

	pub fn validate(&self) -> crate::AResult<()> {
		ensure!(self.ack_tries > 0, "need at least one ACK poll per byte");
		ensure!(self.start_tries > 0, "need at least one start attempt per command");
		Ok(())
	}
}

impl Default for BusConfig {
	fn default() -> Self {
		BusConfig {
			ack_tries: DEFAULT_ACK_TRIES,
			start_tries: DEFAULT_START_TRIES,
			power_on_clocks: DEFAULT_POWER_ON_CLOCKS,
		}
	}
}

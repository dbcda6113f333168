//! Bit-banged two-wire protocol for Atmel CryptoMemory (AT88SC family)
//!
//! Looks like TWI/I²C, but isn't quite: there is no repeated start with a
//! read bit. A read is a command frame (start + instruction byte + address
//! and length bytes) immediately followed by the data phase in the same
//! frame, with the device now driving the data line.
//!
//! Both lines are open-drain: the host only ever floats a line (pull-up
//! provides the HIGH level) or drives it LOW.
//!
//! Frame layout:
//! - start: DATA falls while CLK is high
//! - bytes: 8 bits MSB first, sampled on rising CLK, followed by an ACK bit
//!   (LOW = acknowledged) driven by the receiving side
//! - stop: DATA rises while CLK is high
//!
//! When reading, the host ACKs every byte but the last one, which gets a NAK.

mod config;
mod hardware;
mod low_level;
mod operations;
#[cfg(test)]
mod sim;

pub use self::config::BusConfig;

pub use self::hardware::{
	Hardware,
	Line,
	reliable_sleep,
};

pub use self::low_level::{
	AckFailure,
	Exclusive,
	LowLevel,
};

pub use self::operations::{
	Bus,
	TransferError,
};

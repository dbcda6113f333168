#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate cryptomem_twi;
use cryptomem_twi::*;

use std::process::exit;

use cryptomem_twi::gpio::SysfsGpio;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_optional_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<Option<T>>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	if matches.is_present(name) {
		get_param(matches, name).map(Some)
	} else {
		Ok(None)
	}
}

fn parse_hex_byte(s: &str) -> AResult<u8> {
	let digits = s.trim_start_matches("0x").trim_start_matches("0X");
	u8::from_str_radix(digits, 16).map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid hex byte {:?}: {}", s, e);
		e.context(msg).into()
	})
}

fn get_bytes(matches: &clap::ArgMatches, name: &str) -> AResult<Vec<u8>> {
	match matches.values_of(name) {
		Some(values) => values.map(parse_hex_byte).collect(),
		None => Ok(Vec::new()),
	}
}

fn format_bytes(bytes: &[u8]) -> String {
	bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

fn bus_config(matches: &clap::ArgMatches) -> AResult<BusConfig> {
	let mut config = BusConfig::default();
	if let Some(tries) = get_optional_param(matches, "ack_tries")? {
		config = config.ack_tries(tries);
	}
	if let Some(tries) = get_optional_param(matches, "start_tries")? {
		config = config.start_tries(tries);
	}
	if let Some(clocks) = get_optional_param(matches, "power_on_clocks")? {
		config = config.power_on_clocks(clocks);
	}
	config.validate()?;
	Ok(config)
}

fn open_bus(matches: &clap::ArgMatches) -> AResult<Bus<SysfsGpio>> {
	let clock: u32 = get_param(matches, "CLOCK")?;
	let data: u32 = get_param(matches, "DATA")?;
	let config = bus_config(matches)?;

	Ok(Bus::with_config(SysfsGpio::open(clock, data)?, config))
}

fn command(bus: &mut Bus<SysfsGpio>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let command = get_bytes(sub_m, "COMMAND")?;
	ensure!(!command.is_empty(), "empty command");

	// the device expects a data phase; close the frame in any case
	let result = bus.send_command(&command);
	bus.send_data(&[])?;
	result?;

	info!("command {} acknowledged", format_bytes(&command));
	Ok(())
}

fn write(bus: &mut Bus<SysfsGpio>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let command = get_bytes(sub_m, "COMMAND")?;
	let data = get_bytes(sub_m, "PAYLOAD")?;
	ensure!(!command.is_empty(), "empty command");

	bus.transfer_write(&command, &data)?;

	info!("wrote {} data bytes", data.len());
	Ok(())
}

fn read(bus: &mut Bus<SysfsGpio>, sub_m: &clap::ArgMatches) -> AResult<()> {
	let len: usize = get_param(sub_m, "LEN")?;
	let command = get_bytes(sub_m, "COMMAND")?;
	ensure!(!command.is_empty(), "empty command");

	let mut buf = vec![0u8; len];
	bus.transfer_read(&command, &mut buf)?;

	println!("{}", format_bytes(&buf));
	Ok(())
}

fn app() -> clap::App<'static, 'static> {
	clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg CLOCK: -c --clock +takes_value +required "GPIO number of the clock line")
		(@arg DATA: -d --data +takes_value +required "GPIO number of the data line")
		(@arg ack_tries: --("ack-tries") +takes_value "ACK polls per written byte")
		(@arg start_tries: --("start-tries") +takes_value "start attempts per command")
		(@arg power_on_clocks: --("power-on-clocks") +takes_value "clock cycles for the power on sequence")
		(@subcommand power_on =>
			(about: "send the power on sync sequence")
		)
		(@subcommand command =>
			(about: "send a command frame without data phase")
			(@arg COMMAND: +required +multiple "command bytes (hex)")
		)
		(@subcommand write =>
			(about: "send a command frame followed by data")
			(@arg PAYLOAD: -w --write +takes_value +use_delimiter "data bytes (hex, comma separated)")
			(@arg COMMAND: +required +multiple "command bytes (hex)")
		)
		(@subcommand read =>
			(about: "send a command frame and read the answer")
			(@arg LEN: +required "number of bytes to read")
			(@arg COMMAND: +required +multiple "command bytes (hex)")
		)
		(@subcommand wait_clock =>
			(about: "give the device some idle clocks")
			(@arg LOOPS: +required "number of start / 15 clocks / stop loops")
		)
	)
}

fn main_app() -> AResult<()> {
	let matches = app().get_matches();

	let mut bus = open_bus(&matches)?;

	match matches.subcommand() {
		("power_on", _) => {
			bus.power_on();
			Ok(())
		},
		("command", Some(sub_m)) => {
			command(&mut bus, sub_m)
		},
		("write", Some(sub_m)) => {
			write(&mut bus, sub_m)
		},
		("read", Some(sub_m)) => {
			read(&mut bus, sub_m)
		},
		("wait_clock", Some(sub_m)) => {
			let loops: u32 = get_param(sub_m, "LOOPS")?;
			bus.wait_clock(loops);
			Ok(())
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}

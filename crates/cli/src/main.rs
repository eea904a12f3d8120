use std::io;

use clap::Parser;
use nv_i2c::{cli::Cli, commands, error::CliError, logging};
use nvif_runtime::find_driver;

fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(&cli) {
		// transfer failures were already reported inline
		if !err.is_output_already_printed() {
			eprintln!("nv-i2c: {err}");
		}
		std::process::exit(err.exit_code());
	}
}

fn run(cli: &Cli) -> Result<(), CliError> {
	let driver = find_driver(&cli.driver)?;
	let stdout = io::stdout();
	commands::run(cli, driver.as_ref(), &mut stdout.lock())
}

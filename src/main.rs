//! relup: a client-side application update manager core.
use std::process::ExitCode;

fn main() -> ExitCode
{
	let clargs = relup::command::parse();
	match relup::command::run(clargs) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:#}");
			ExitCode::FAILURE
		},
	}
}

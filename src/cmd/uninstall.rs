//! $0 uninstall
use anyhow::bail;

use crate::command::CmdArg;

pub(crate) fn run(carg: CmdArg) -> Result<(), anyhow::Error>
{
	let pipeline = crate::command::mk_pipeline(&carg.config)?;

	println!("Uninstalling...");
	let sink = |_: u8| {};
	match pipeline.full_uninstall(&sink) {
		Ok(()) => println!("Done."),
		Err(e) => bail!("uninstall failed: {e}"),
	}

	Ok(())
}

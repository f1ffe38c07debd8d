//! $0 update-manifest
use anyhow::bail;

use crate::command::CmdArg;

pub(crate) fn run(carg: CmdArg) -> Result<(), anyhow::Error>
{
	let pipeline = crate::command::mk_pipeline(&carg.config)?;

	let sink = |_: u8| {};
	let manifest = match pipeline.update_local_manifest(&sink) {
		Ok(m) => m,
		Err(e) => bail!("rebuilding manifest failed: {e}"),
	};

	println!("Rebuilt packages/RELEASES with {} entr{}.",
			manifest.entries.len(),
			match manifest.entries.len() { 1 => "y", _ => "ies" });

	Ok(())
}

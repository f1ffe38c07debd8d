//! $0 download
use anyhow::bail;
use indicatif::{ProgressBar, ProgressStyle};

use crate::command::CmdArg;

pub(crate) fn run(carg: CmdArg) -> Result<(), anyhow::Error>
{
	let pipeline = crate::command::mk_pipeline(&carg.config)?;

	let sink = |_: u8| {};
	let plan = match pipeline.check_for_update(&sink)? {
		Some(p) => p,
		None => { println!("Already up to date, nothing to download."); return Ok(()); },
	};

	println!("Downloading {} release{}...", plan.releases_to_apply.len(),
			crate::util::plural(plan.releases_to_apply.len()));

	let pb = ProgressBar::new(100);
	pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len}")?);
	let sink = { let pb = pb.clone(); move |p: u8| pb.set_position(p as u64) };

	let res = pipeline.download_releases(&plan.releases_to_apply, &sink);
	pb.finish();

	match res {
		Ok(()) => println!("Done."),
		Err(e) => bail!("download failed: {e}"),
	}

	Ok(())
}

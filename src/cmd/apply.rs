//! $0 apply
use anyhow::bail;
use indicatif::{ProgressBar, ProgressStyle};

use crate::command::CmdArg;

pub(crate) fn run(carg: CmdArg) -> Result<(), anyhow::Error>
{
	let pipeline = crate::command::mk_pipeline(&carg.config)?;

	let sink = |_: u8| {};
	let plan = match pipeline.check_for_update(&sink)? {
		Some(p) => p,
		None => { println!("Already up to date, nothing to apply."); return Ok(()); },
	};

	println!("Installing {}...", plan.future_release_entry.version);

	let pb = ProgressBar::new(100);
	pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len}")?);
	let sink = { let pb = pb.clone(); move |p: u8| pb.set_position(p as u64) };

	let res = pipeline.apply_releases(&plan, &sink);
	pb.finish();

	let result = match res {
		Ok(r) => r,
		Err(e) => bail!("install failed: {e}"),
	};

	println!("Now at {}.", result.installed_entry.version);
	if let Some(launch) = &result.launch_path
	{ println!("Launch: {}", launch.display()); }

	Ok(())
}

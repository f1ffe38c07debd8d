//! $0 check
use indicatif::{ProgressBar, ProgressStyle};

use crate::command::CmdArg;

pub(crate) fn run(carg: CmdArg) -> Result<(), anyhow::Error>
{
	let pipeline = crate::command::mk_pipeline(&carg.config)?;

	let pb = ProgressBar::new(100);
	pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len}")?);
	let sink = { let pb = pb.clone(); move |p: u8| pb.set_position(p as u64) };

	let plan = pipeline.check_for_update(&sink)?;
	pb.finish();

	match plan {
		None => println!("Already up to date."),
		Some(plan) => {
			let action = match plan.is_bootstrapping {
				true => "Bootstrap install",
				false => "Update",
			};
			println!("{action} available: {} release{} to apply, landing on {}.",
					plan.releases_to_apply.len(),
					crate::util::plural(plan.releases_to_apply.len()),
					plan.future_release_entry.version);
			for entry in &plan.releases_to_apply
			{
				println!("  {}", entry.filename);
			}
			println!("Run `{0} download` then `{0} apply` to install it.",
					crate::util::cmdname());
		},
	}

	Ok(())
}

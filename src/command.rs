//! General command handling. This is the central dispatch for every
//! operation the Update Pipeline (C9) exposes.

/// Command-line parsing and handling
mod line;
pub(crate) use line::FrArgs;
pub(crate) use line::FrCmds;
pub(crate) use line::RelupArgs;
pub use line::parse;



use std::process::ExitCode;


/// Pass a bunch of info to the individual command runners as a block
#[derive(Debug)]
pub(crate) struct CmdArg
{
	/// The command-line args
	pub(crate) clargs: FrArgs,

	/// The working config
	pub(crate) config: crate::config::Config,
}


/// Dispatch a command
pub fn run(clargs: FrArgs) -> Result<ExitCode, anyhow::Error>
{
	let config = crate::config::load_config_file(
		&clargs.global.config.clone().unwrap_or_else(default_config_path),
		&clargs.global,
	)?;

	let carg = CmdArg { clargs, config };

	use line::FrCmds as FC;
	match carg.clargs.command {
		FC::RunPostInstall => return crate::cmd::run_post_install::run(carg),

		FC::Check => crate::cmd::check::run(carg)?,
		FC::Download => crate::cmd::download::run(carg)?,
		FC::Apply => crate::cmd::apply::run(carg)?,
		FC::Uninstall => crate::cmd::uninstall::run(carg)?,
		FC::UpdateManifest => crate::cmd::update_manifest::run(carg)?,

		#[cfg(test)]
		FC::Dummy => unreachable!("Not a real thing"),
	};

	Ok(ExitCode::SUCCESS)
}

fn default_config_path() -> std::path::PathBuf
{
	std::path::PathBuf::from("/etc/relup.conf")
}


/// Build a `Pipeline` from a loaded config: every `cmd::*` runner needs
/// exactly this, so it's shared here rather than repeated per-command.
pub(crate) fn mk_pipeline(config: &crate::config::Config) -> Result<crate::pipeline::Pipeline, anyhow::Error>
{
	let root = config.resolved_root()?;
	let mut pipeline = crate::pipeline::Pipeline::new(
		root,
		config.source.clone(),
		config.app_framework_version.clone(),
	);
	pipeline.ignore_delta_updates = config.ignore_delta_updates;
	Ok(pipeline)
}

//! Command line handling
//!
//! General invocation:
//! $0 [options] <command>
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Add extra default'ing to make config tests easier

/// Global args: config file location, plus CLI overrides for anything the
/// config file can also set.
#[cfg_attr(test, derive(Default))]
#[derive(Debug, Clone)]
#[derive(clap::Args)]
pub struct RelupArgs
{
	/// Config file
	#[arg(short, long, global = true)]
	pub(crate) config: Option<PathBuf>,

	/// Overrides `AppId` from the config file.
	#[arg(long, global = true)]
	pub(crate) app_id: Option<String>,

	/// Overrides `Source` from the config file.
	#[arg(long, global = true)]
	pub(crate) source: Option<String>,

	/// Overrides `AppFrameworkVersion` from the config file.
	#[arg(long, global = true)]
	pub(crate) app_framework_version: Option<String>,

	/// Overrides `Root` from the config file.
	#[arg(long, global = true)]
	pub(crate) root: Option<PathBuf>,

	/// Forces `IgnoreDeltaUpdates` on regardless of the config file.
	#[arg(long, global = true)]
	pub(crate) ignore_delta_updates: bool,

	/// Worker count for CPU-bound pools (C6's `HashCheck`); unset means
	/// `JOBS_CPU`'s built-in default.
	#[arg(long, global = true)]
	pub(crate) jobs_cpu: Option<u32>,

	/// Worker count for network-bound pools (C6's `Fetch`); unset means
	/// `JOBS_NET`'s built-in default.
	#[arg(long, global = true)]
	pub(crate) jobs_net: Option<u32>,
}


/// Main arg entry point
#[derive(Debug)]
#[derive(Parser)]
#[command(about = "Client-side application update manager")]
#[command(version)]
pub struct FrArgs
{
	#[command(subcommand)]
	pub(crate) command: FrCmds,

	#[command(flatten)]
	pub(crate) global: RelupArgs,
}


/// The operations the Update Pipeline (C9) exposes.
#[derive(Debug, Clone)]
#[derive(Subcommand)]
pub(crate) enum FrCmds
{
	/// Reconcile the local and remote manifests; report the plan, if any.
	Check,

	/// Fetch and verify whatever `check` found into the artifact store.
	Download,

	/// Run the Installer state machine against a plan already downloaded
	/// into the store.
	Apply,

	/// Remove the application entirely.
	Uninstall,

	/// Rebuild `packages/RELEASES` from what's actually on disk, without
	/// installing anything.
	UpdateManifest,

	/// Runs inside the isolated post-install subprocess (spec §4.8's
	/// `AppSetup` hook isolation). Reads a `PostInstallRequest` as JSON on
	/// stdin, writes a `PostInstallResponse` as JSON to stdout. Not meant
	/// to be invoked directly.
	#[command(name = "__run-post-install", hide = true)]
	RunPostInstall,

	/// Exists only so tests have a `FrCmds` variant to construct without
	/// needing a real subcommand.
	#[cfg(test)]
	#[command(skip)]
	Dummy,
}

impl std::fmt::Display for FrCmds
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
	{
		let s = match self {
			FrCmds::Check => "check",
			FrCmds::Download => "download",
			FrCmds::Apply => "apply",
			FrCmds::Uninstall => "uninstall",
			FrCmds::UpdateManifest => "update-manifest",
			FrCmds::RunPostInstall => "__run-post-install",
			#[cfg(test)]
			FrCmds::Dummy => "dummy",
		};
		write!(f, "{s}")
	}
}

#[cfg(test)]
impl Default for FrCmds
{
	fn default() -> Self { FrCmds::Dummy }
}


/// Parse `std::env::args()`, wiring up the pool worker counts as a side
/// effect before returning.
pub fn parse() -> FrArgs
{
	let ret = FrArgs::parse();
	crate::pool::init_jobs(ret.global.jobs_net, ret.global.jobs_cpu);
	ret
}

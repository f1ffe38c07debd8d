//! `__run-post-install`: the isolated POST_INSTALL subprocess entry
//! point (spec §4.8, §9). Never invoked by a user directly -- `relup`
//! re-execs itself under this hidden subcommand from
//! `postinstall::run_post_install_subprocess`.
use std::io::{Read as _, Write as _};
use std::process::ExitCode;

use crate::command::CmdArg;
use crate::postinstall::{self, PostInstallRequest};

pub(crate) fn run(_carg: CmdArg) -> Result<ExitCode, anyhow::Error>
{
	let mut payload = String::new();
	std::io::stdin().read_to_string(&mut payload)?;
	let req: PostInstallRequest = serde_json::from_str(&payload)?;

	let resp = postinstall::run_post_install(req)?;

	let out = serde_json::to_vec(&resp)?;
	std::io::stdout().write_all(&out)?;

	Ok(ExitCode::SUCCESS)
}

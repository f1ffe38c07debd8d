//! Loading and dealing with relup's config file and runtime usage of its
//! bits.
use std::path::PathBuf;
use thiserror::Error;


#[derive(Debug)]
#[derive(derivative::Derivative)]
#[derivative(Default)]
pub struct Config
{
	/// Identifies the hosted application; used as the install root's leaf
	/// directory name when `root` isn't given explicitly.
	pub(crate) app_id: String,

	/// Where the release feed lives: an `http(s)://` base URL, or a local
	/// directory path (spec §4.5/§6).
	pub(crate) source: String,

	/// The framework profile to extract from `lib/<profile>` entries
	/// (e.g. `net45`).
	pub(crate) app_framework_version: String,

	/// Skip delta releases and always plan full-package installs.
	pub(crate) ignore_delta_updates: bool,

	/// Explicit installation root. When unset, resolved from the local
	/// app-data directory plus `app_id` (spec §6 "Environment").
	pub(crate) root: Option<PathBuf>,
}


impl Config
{
	/// Resolve the installation root: the explicit `root` if given,
	/// otherwise `<local-app-data>/<app_id>` per spec §6.
	pub fn resolved_root(&self) -> Result<PathBuf, ConfigErr>
	{
		if let Some(root) = &self.root { return Ok(root.clone()); }

		let base = dirs::data_local_dir().ok_or(ConfigErr::NoLocalAppData)?;
		Ok(base.join(&self.app_id))
	}
}


/// Problems loading config
#[derive(Debug)]
#[derive(Error)]
pub enum ConfigErr
{
	/// File I/O error of some sort
	#[error("Config file I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Syntax error in the config file
	#[error("Config file syntax error: {0}")]
	Syntax(String),

	/// No `root` given, and no OS-provided local app-data directory to
	/// derive a default from.
	#[error("No installation root given, and no local app-data directory found")]
	NoLocalAppData,
}


/// Load in the config, with appropriate overrides from command-line args
pub(crate) fn load_config_file(cfile: &std::path::Path, clargs: &crate::command::RelupArgs)
		-> Result<Config, ConfigErr>
{
	let conf = match std::fs::read(cfile)
	{
		Ok(bytes) => bytes,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
		Err(e) => return Err(e.into()),
	};
	load_config(&conf, clargs)
}


/// Parse the config, with appropriate overrides from command-line args
pub(crate) fn load_config(conf: &[u8], clargs: &crate::command::RelupArgs)
		-> Result<Config, ConfigErr>
{
	let mut conf = load(conf)?;

	macro_rules! or {
		( $fld:ident ) => {
			conf.$fld = match &clargs.$fld {
				Some(x) => x.clone(),
				None    => conf.$fld,
			};
		};
	}
	or!(app_id);
	or!(source);
	or!(app_framework_version);

	if let Some(root) = &clargs.root { conf.root = Some(root.clone()); }
	if clargs.ignore_delta_updates { conf.ignore_delta_updates = true; }

	Ok(conf)
}


/// Parse out a string of the config: one `Key value` pair per line,
/// `#`-comments and blank lines ignored, same grammar as the Release
/// Manifest Codec's comment handling (spec §4.1).
fn load(conf: &[u8]) -> Result<Config, ConfigErr>
{
	let mut config = Config::default();

	let text = std::str::from_utf8(conf)
			.map_err(|e| ConfigErr::Syntax(format!("config is not valid UTF-8: {e}")))?;

	for line in text.split('\n')
	{
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') { continue; }

		let mut it = line.splitn(2, ' ');
		let par = it.next();
		let val = it.next().map(|v| v.trim());
		let (par, val) = match (par, val) {
			(Some(p), Some(v)) => (p, v),
			(_, _) => continue,
		};
		if val.is_empty() { continue; }

		match par
		{
			"AppId" => config.app_id = val.to_string(),
			"Source" => config.source = val.to_string(),
			"AppFrameworkVersion" => config.app_framework_version = val.to_string(),
			"Root" => config.root = Some(PathBuf::from(val)),
			"IgnoreDeltaUpdates" => {
				config.ignore_delta_updates = boolify(val).ok_or_else(|| {
					ConfigErr::Syntax(format!("Bad IgnoreDeltaUpdates value {val}"))
				})?;
			},
			_ => continue,
		}
	}

	Ok(config)
}

fn boolify(s: &str) -> Option<bool>
{
	match s {
		"yes" => Some(true),
		"no" => Some(false),
		_ => None,
	}
}

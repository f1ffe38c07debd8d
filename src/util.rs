//! Misc util funcs

/// argv[0]
fn argv_0() -> Option<std::ffi::OsString>
{
	std::env::args_os().next()
}


/// What's our command's name?  With fallback...  this is mostly intended
/// for cosmetic use, like telling the user to "run this command".
pub(crate) fn cmdname() -> String
{
	argv_0()
		.and_then(|c| Some(c.to_string_lossy().into_owned()))
		.and_then(|s| Some(s.split('/').next_back()?.to_string()))
		.unwrap_or_else(|| "relup".to_string())
}


/// Pluralize for a number
pub(crate) fn plural(n: usize) -> &'static str
{
	if n == 1 { "" } else { "s" }
}

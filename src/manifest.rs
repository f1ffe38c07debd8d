//! Release manifests: the RELEASES codec (C1), and version/filename
//! rules (C2).

mod structs;
pub use structs::{Manifest, ReleaseEntry, ReleaseEntryErr};

pub mod version;
pub use version::Version;

mod parse;
pub use parse::{parse, serialize, ManifestErr};

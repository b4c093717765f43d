pub mod base;
pub mod buffer;
pub mod config;
pub mod error;
pub mod image;
pub mod misc;
pub mod pref;

pub use crate::base::BasePathResolver;
pub use crate::buffer::SysPath;
pub use crate::config::{Config, Layout};
pub use crate::error::PathErr;
pub use crate::pref::{Home, PrefPathResolver};

/// Directory containing the running executable, ending in `/`.
pub fn base_path() -> Result<SysPath, PathErr> {
    BasePathResolver::current().resolve()
}

/// Per-application preferences directory under `$HOME`, created if missing.
///
/// `org` is currently not part of the path; see [`Layout`].
pub fn pref_path(org: &str, app: &str) -> Result<SysPath, PathErr> {
    pref_path_with(Config::default(), org, app)
}

pub fn pref_path_with(config: Config, org: &str, app: &str) -> Result<SysPath, PathErr> {
    PrefPathResolver::from_env(config).resolve(org, app)
}

use crate::error::PathErr;

use std::fmt;
use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Serialize, Deserialize};

pub const DEFAULT_PREF_SUBDIR: &str = "config/settings";
pub const DEFAULT_DIR_MODE: u32 = 0o700;

// Whether the organization identifier takes part in the preferences path.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum Layout {
    // HOME/subdir/app/, org is ignored.
    #[default]
    AppOnly,
    // HOME/subdir/org/app/
    OrgApp,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // For use by clap, lower case since actual cli arguments would be lower case
        match self {
            Layout::AppOnly => write!(f, "app-only"),
            Layout::OrgApp => write!(f, "org-app"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, better_default::Default)]
#[serde(default)]
pub struct Config {
    // Relative to the home directory.
    #[default(DEFAULT_PREF_SUBDIR.to_owned())]
    pub pref_subdir: String,

    pub layout: Layout,

    #[default(DEFAULT_DIR_MODE)]
    pub dir_mode: u32,

    // Ask the passwd database for a home directory when HOME is unset.
    pub home_fallback: bool,
}

fn ts<E: ToString>(e: E) -> PathErr {
    PathErr::Config(e.to_string())
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, PathErr> {
        let path = path.as_ref();
        let conf_str = fs::read_to_string(path).map_err(|e|
            PathErr::Config(format!("Error reading config '{}': {e}", path.display()))
        )?;

        let conf: Config = serde_json::from_str(&conf_str).map_err(ts)?;
        if Path::new(&conf.pref_subdir).is_absolute() {
            return Err(PathErr::Config(
                format!("Config's 'pref_subdir' must be relative, got '{}'", conf.pref_subdir)
            ));
        }

        Ok(conf)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), PathErr> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self).map_err(|e|
            PathErr::Config(format!("Error serializing config {self:?}: {e}"))
        )?;

        fs::write(path, config_json).map_err(|e|
            PathErr::Config(format!("Error writing config to '{}': {e}", path.display()))
        )?;

        Ok(())
    }
}

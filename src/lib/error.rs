use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum PathErr {
    OutOfMemory,
    // HOME unset or empty.
    HomeUnavailable,
    // The image table held no application image.
    NoAppImage,
    OsQuery(String),
    CreateDir { path: PathBuf, source: io::Error },
    InvalidParam(String),
    Config(String),
}

impl PathErr {
    pub fn to_msg(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PathErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathErr::OutOfMemory => write!(f, "Out of memory"),
            PathErr::HomeUnavailable => write!(f, "Home directory unavailable: $HOME is not set"),
            PathErr::NoAppImage => write!(f, "Couldn't find the application image of the running process"),
            PathErr::OsQuery(msg) => write!(f, "{msg}"),
            PathErr::CreateDir { path, source } => write!(
                f,
                "Could not create preferences directory '{}': {source}",
                path.display()
            ),
            PathErr::InvalidParam(name) => write!(f, "Parameter '{name}' is invalid"),
            PathErr::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for PathErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PathErr::CreateDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

macro_rules! os_query_err {
    ($($arg:tt)+) => {{
        $crate::error::PathErr::OsQuery(format!($($arg)*))
    }}
}
pub(crate) use os_query_err;

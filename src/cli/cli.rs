use basepref_lib::config::{Config, Layout};
use basepref_lib::image::{ImageKind, ImageTable, ProcessImages};
use basepref_lib::{bailf, BasePathResolver, PrefPathResolver};

use std::env::VarError;
use std::path::PathBuf;

use core::str::FromStr;

use clap::{Parser, Subcommand};
use log::{error, info};

#[derive(Parser, Debug)]
#[command(about = "Locate the executable's directory and per-app preference directories")]
struct Args {
    /// JSON config file; missing fields take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the config's preferences layout.
    #[arg(long, global = true)]
    layout: Option<Layout>,

    /// Look HOME up in the passwd database when it isn't set.
    #[arg(long, global = true, action)]
    home_fallback: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the directory containing this executable.
    Base,

    /// Print (and create) the preferences directory for an application.
    Pref {
        org: String,

        app: String,
    },

    /// List the images loaded into this process.
    Images,
}

fn init_log() {
    const LEVEL_KEY: &str = "BASEPREF_LOG_LEVEL";
    const LEVEL_PATH: &str = "BASEPREF_LOG_PATH";

    // Default filename if path given is a directory, default directory is $HOME, or no $HOME, stderr
    const DEFAULT_FILE: &str = "basepref_log.txt";

    let mut path = match std::env::var(LEVEL_PATH) {
        Ok(x) => Some(PathBuf::from(x)),
        Err(VarError::NotPresent) => home::home_dir(),
        Err(VarError::NotUnicode(x)) => Some(PathBuf::from(x)),
    };

    if let Some(p) = path.as_mut() {
        if p.is_dir() {
            p.push(DEFAULT_FILE);
        }
    }

    let level = match std::env::var(LEVEL_KEY) {
        Ok(x) => {
            Some(log::Level::from_str(x.as_str()).map_err(|e| e.to_string())).transpose()
        },
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(x)) => {
            Err(format!("Non-unicode {LEVEL_KEY} value: {}", x.to_string_lossy()))
        }
    };

    let (filter, bad_level) = match level {
        Ok(Some(lev)) => (lev.to_level_filter(), None),
        Ok(None) => return, // No logging requested
        Err(msg) => (log::Level::max().to_level_filter(), Some(msg)),
    };

    let res = match path {
        Some(path) => simple_logging::log_to_file(&path, filter)
            .map_err(|e| format!("Couldn't log to '{}': {e}", path.display())),
        None => {
            simple_logging::log_to_stderr(filter);
            Ok(())
        }
    };
    if let Err(msg) = res {
        simple_logging::log_to_stderr(filter);
        error!("{msg}, logging to stderr");
    }

    if let Some(msg) = bad_level {
        error!("Invalid filter {msg}, set to max");
    }
}

fn kind_name(kind: ImageKind) -> &'static str {
    match kind {
        ImageKind::App => "app",
        ImageKind::Library => "library",
        ImageKind::AddOn => "add-on",
        ImageKind::System => "system",
    }
}

// The config file, if any, with command line overrides applied.
fn load_config(args: &Args) -> Result<Config, String> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| e.to_msg())?,
        None => Config::default(),
    };
    if let Some(layout) = args.layout {
        config.layout = layout;
    }
    config.home_fallback |= args.home_fallback;
    Ok(config)
}

fn main() -> Result<(), String> {
    init_log();

    let args = Args::parse();

    let config = load_config(&args)?;

    match args.command {
        Command::Base => {
            let base = BasePathResolver::current().resolve().map_err(|e| e.to_msg())?;
            println!("{base}");
        },
        Command::Pref { org, app } => {
            info!("Resolving preferences path for org '{org}', app '{app}' with {config:?}");

            let pref = PrefPathResolver::from_env(config)
                .resolve(&org, &app)
                .map_err(|e| e.to_msg())?;
            println!("{pref}");
        },
        Command::Images => {
            let images = ProcessImages::current();
            let lines: Vec<String> = images.images()
                .map(|info| format!("{:<8} {}", kind_name(info.kind), info.name.display()))
                .collect();
            if lines.is_empty() {
                bailf!("No images found for this process");
            }
            println!("{}", itertools::join(lines, "\n"));
        },
    }

    Ok(())
}

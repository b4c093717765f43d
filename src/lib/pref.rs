use crate::bail;
use crate::buffer::{BufferAlloc, HeapAlloc, SysPath};
use crate::config::{Config, Layout};
use crate::error::PathErr;

use std::ffi::OsString;
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::PathBuf;

use log::{debug, error, warn};

pub const HOME_VAR: &str = "HOME";

/// The home directory a [`PrefPathResolver`] builds under. `None` when the
/// environment doesn't provide one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Home(Option<PathBuf>);

impl Home {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Home(Some(path.into()))
    }

    pub fn unset() -> Self {
        Home(None)
    }

    // An empty or relative HOME counts as unset.
    pub fn from_env() -> Self {
        Home(std::env::var_os(HOME_VAR)
            .map(PathBuf::from)
            .filter(|x| x.is_absolute()))
    }

    // Like from_env, but asks the passwd database when HOME is unset.
    pub fn from_env_or_passwd() -> Self {
        match Home::from_env() {
            Home(None) => {
                warn!("${HOME_VAR} is not set, falling back to the passwd database");
                Home(home::home_dir().filter(|x| x.is_absolute()))
            }
            home => home,
        }
    }

    pub fn for_config(config: &Config) -> Self {
        if config.home_fallback {
            Home::from_env_or_passwd()
        } else {
            Home::from_env()
        }
    }

    // Only absolute directories are usable.
    pub fn path(&self) -> Option<&PathBuf> {
        self.0.as_ref().filter(|x| x.is_absolute())
    }
}

/// Builds and creates per-application preference directories.
pub struct PrefPathResolver<A = HeapAlloc> {
    home: Home,
    config: Config,
    alloc: A,
}

impl PrefPathResolver {
    pub fn from_env(config: Config) -> Self {
        Self::new(Home::for_config(&config), config, HeapAlloc)
    }
}

impl<A: BufferAlloc> PrefPathResolver<A> {
    pub fn new(home: Home, config: Config, alloc: A) -> Self {
        Self { home, config, alloc }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns `HOME/<pref_subdir>/<app>/` (or `.../<org>/<app>/` with
    /// [`Layout::OrgApp`]), creating it first if needed.
    ///
    /// Under the default [`Layout::AppOnly`] the organization is accepted but
    /// does not appear in the path.
    pub fn resolve(&self, org: &str, app: &str) -> Result<SysPath, PathErr> {
        check_component("app", app)?;

        let home = self.home.path().ok_or_else(|| {
            error!("Can't build preferences path for '{app}': ${HOME_VAR} is not set or not absolute");
            PathErr::HomeUnavailable
        })?;

        let mut parts: Vec<OsString> = vec![home.into(), self.config.pref_subdir.as_str().into()];
        match self.config.layout {
            Layout::AppOnly => (),
            Layout::OrgApp => {
                check_component("org", org)?;
                parts.push(org.into());
            }
        }
        parts.push(app.into());

        let path = SysPath::build(&self.alloc, parts)?;
        create_dir(&path, self.config.dir_mode)?;
        debug!("Preferences path for '{app}' is '{path}'");

        Ok(path)
    }
}

// Identifiers name exactly one directory below the settings root.
fn check_component(name: &str, value: &str) -> Result<(), PathErr> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\0']) {
        error!("Invalid {name} identifier '{}'", value.escape_debug());
        bail!(PathErr::InvalidParam(name.to_owned()));
    }
    Ok(())
}

// Creates missing parents too; an existing directory is fine.
fn create_dir(path: &SysPath, mode: u32) -> Result<(), PathErr> {
    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .map_err(|source| {
            error!("Error creating directory '{path}': {source}");
            PathErr::CreateDir { path: path.as_path().to_owned(), source }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::tests::FailingAlloc;

    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tempdir::TempDir;

    fn resolver(home: &std::path::Path, config: Config) -> PrefPathResolver {
        PrefPathResolver::new(Home::new(home), config, HeapAlloc)
    }

    #[test]
    fn builds_and_creates_app_dir() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let pref = resolver(tmp.path(), Config::default())
            .resolve("AcmeOrg", "MyApp")
            .unwrap();

        let expected = format!("{}/config/settings/MyApp/", tmp.path().display());
        assert_eq!(pref.to_string(), expected);
        assert!(pref.as_path().is_dir());
    }

    #[test]
    fn trailing_slash_on_home_is_not_doubled() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let home = format!("{}/", tmp.path().display());
        let pref = PrefPathResolver::new(Home::new(home), Config::default(), HeapAlloc)
            .resolve("AcmeOrg", "MyApp")
            .unwrap();
        assert_eq!(pref.to_string(), format!("{}/config/settings/MyApp/", tmp.path().display()));
    }

    // The organization doesn't take part in the default layout.
    #[test]
    fn org_is_ignored_by_default() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let r = resolver(tmp.path(), Config::default());
        let a = r.resolve("AcmeOrg", "MyApp").unwrap();
        let b = r.resolve("OtherOrg", "MyApp").unwrap();
        let c = r.resolve("", "MyApp").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn org_app_layout() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let config = Config { layout: Layout::OrgApp, ..Config::default() };
        let pref = resolver(tmp.path(), config).resolve("AcmeOrg", "MyApp").unwrap();
        assert_eq!(
            pref.to_string(),
            format!("{}/config/settings/AcmeOrg/MyApp/", tmp.path().display())
        );
        assert!(pref.as_path().is_dir());
    }

    #[test]
    fn org_app_layout_needs_org() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let config = Config { layout: Layout::OrgApp, ..Config::default() };
        let res = resolver(tmp.path(), config).resolve("", "MyApp");
        assert!(matches!(res, Err(PathErr::InvalidParam(_))));
    }

    #[test]
    fn idempotent() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let r = resolver(tmp.path(), Config::default());
        let first = r.resolve("AcmeOrg", "MyApp").unwrap();
        let second = r.resolve("AcmeOrg", "MyApp").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unset_home() {
        let r = PrefPathResolver::new(Home::unset(), Config::default(), HeapAlloc);
        assert!(matches!(r.resolve("AcmeOrg", "MyApp"), Err(PathErr::HomeUnavailable)));
    }

    #[test]
    fn empty_app() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let res = resolver(tmp.path(), Config::default()).resolve("AcmeOrg", "");
        assert!(matches!(res, Err(PathErr::InvalidParam(_))));
    }

    // Each of these would land outside HOME/config/settings/<app>/.
    #[test]
    fn app_must_be_a_single_component() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let r = resolver(tmp.path(), Config::default());
        for app in ["/", "///", ".", "..", "a/b", "../escape", "a\0b"] {
            match r.resolve("AcmeOrg", app) {
                Err(PathErr::InvalidParam(name)) => assert_eq!(name, "app", "app {app:?}"),
                other => panic!("app {app:?} gave {other:?}"),
            }
        }
        assert!(!tmp.path().join("config").exists());
    }

    #[test]
    fn org_must_be_a_single_component() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let config = Config { layout: Layout::OrgApp, ..Config::default() };
        let r = resolver(tmp.path(), config);
        for org in ["/", "..", "a/b", "a\0b"] {
            match r.resolve(org, "MyApp") {
                Err(PathErr::InvalidParam(name)) => assert_eq!(name, "org", "org {org:?}"),
                other => panic!("org {org:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn relative_home_is_unavailable() {
        let r = PrefPathResolver::new(Home::new("relative/home"), Config::default(), HeapAlloc);
        assert!(matches!(r.resolve("AcmeOrg", "MyApp"), Err(PathErr::HomeUnavailable)));
        assert!(!std::path::Path::new("relative").exists());
    }

    #[test]
    fn owner_only_mode() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let pref = resolver(tmp.path(), Config::default()).resolve("AcmeOrg", "MyApp").unwrap();
        let mode = fs::metadata(pref.as_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
        assert_eq!(mode & 0o700, 0o700);
    }

    #[test]
    fn create_failure_is_reported() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        // A regular file where the settings directory should go.
        fs::create_dir(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join("config").join("settings"), b"").unwrap();

        let res = resolver(tmp.path(), Config::default()).resolve("AcmeOrg", "MyApp");
        match res {
            Err(PathErr::CreateDir { path, .. }) => {
                assert_eq!(path, tmp.path().join("config/settings/MyApp/"));
            }
            other => panic!("expected CreateDir, got {other:?}"),
        }
    }

    #[test]
    fn allocation_failure() {
        let tmp = TempDir::new("basepref-pref").unwrap();
        let r = PrefPathResolver::new(Home::new(tmp.path()), Config::default(), FailingAlloc);
        assert!(matches!(r.resolve("AcmeOrg", "MyApp"), Err(PathErr::OutOfMemory)));
        assert!(!tmp.path().join("config").exists());
    }
}

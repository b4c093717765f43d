use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    App,
    Library,
    AddOn,
    System,
}

/// One binary image loaded into the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub kind: ImageKind,
    pub name: PathBuf,
}

impl ImageInfo {
    pub fn new<P: Into<PathBuf>>(kind: ImageKind, name: P) -> Self {
        Self { kind, name: name.into() }
    }
}

/// Enumeration cursor. Starts at zero, advanced by [`ImageTable::next_image`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImageCookie(pub i32);

pub trait ImageTable {
    /// Returns the image under `cookie` and advances it, or `None` once the
    /// table is exhausted.
    fn next_image(&self, cookie: &mut ImageCookie) -> Option<ImageInfo>;

    fn images(&self) -> Images<'_, Self> {
        Images { table: self, cookie: ImageCookie::default() }
    }
}

pub struct Images<'a, T: ImageTable + ?Sized> {
    table: &'a T,
    cookie: ImageCookie,
}

impl<T: ImageTable + ?Sized> Iterator for Images<'_, T> {
    type Item = ImageInfo;

    fn next(&mut self) -> Option<ImageInfo> {
        self.table.next_image(&mut self.cookie)
    }
}

impl<T: ImageTable + ?Sized> ImageTable for &T {
    fn next_image(&self, cookie: &mut ImageCookie) -> Option<ImageInfo> {
        (**self).next_image(cookie)
    }
}

pub fn find_app_image<T: ImageTable + ?Sized>(table: &T) -> Option<ImageInfo> {
    table.images().find(|info| info.kind == ImageKind::App)
}

////////////////////////////////////////////////////////////////////////////////

/// A fixed list of images, walked in order.
#[derive(Debug, Default, Clone)]
pub struct StaticImages(pub Vec<ImageInfo>);

impl ImageTable for StaticImages {
    fn next_image(&self, cookie: &mut ImageCookie) -> Option<ImageInfo> {
        let idx = usize::try_from(cookie.0).ok()?;
        let info = self.0.get(idx)?.clone();
        cookie.0 += 1;
        Some(info)
    }
}

////////////////////////////////////////////////////////////////////////////////

// Haiku's image_type values, as carried in image_info.
#[cfg_attr(not(target_os = "haiku"), allow(dead_code))]
const APP_IMAGE: i32 = 1;
#[cfg_attr(not(target_os = "haiku"), allow(dead_code))]
const LIBRARY_IMAGE: i32 = 2;
#[cfg_attr(not(target_os = "haiku"), allow(dead_code))]
const ADD_ON_IMAGE: i32 = 3;
#[cfg_attr(not(target_os = "haiku"), allow(dead_code))]
const SYSTEM_IMAGE: i32 = 4;

// Unknown values are treated as libraries so they never win the app search.
#[cfg_attr(not(target_os = "haiku"), allow(dead_code))]
fn kind_from_raw(raw: i32) -> ImageKind {
    match raw {
        APP_IMAGE => ImageKind::App,
        LIBRARY_IMAGE => ImageKind::Library,
        ADD_ON_IMAGE => ImageKind::AddOn,
        SYSTEM_IMAGE => ImageKind::System,
        _ => ImageKind::Library,
    }
}

#[cfg(target_os = "haiku")]
pub use haiku::ProcessImages;

#[cfg(not(target_os = "haiku"))]
pub use snapshot::ProcessImages;

#[cfg(target_os = "haiku")]
mod haiku {
    use super::{ImageCookie, ImageInfo, ImageTable};

    use std::ffi::{CStr, OsStr};
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    const _: () = assert!(libc::image_type::B_APP_IMAGE as i32 == super::APP_IMAGE);
    const _: () = assert!(libc::image_type::B_LIBRARY_IMAGE as i32 == super::LIBRARY_IMAGE);
    const _: () = assert!(libc::image_type::B_ADD_ON_IMAGE as i32 == super::ADD_ON_IMAGE);
    const _: () = assert!(libc::image_type::B_SYSTEM_IMAGE as i32 == super::SYSTEM_IMAGE);

    /// The kernel's image table for the current team.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct ProcessImages;

    impl ProcessImages {
        pub fn current() -> Self {
            ProcessImages
        }
    }

    impl ImageTable for ProcessImages {
        fn next_image(&self, cookie: &mut ImageCookie) -> Option<ImageInfo> {
            let mut info = MaybeUninit::<libc::image_info>::uninit();
            // Team 0 is the calling team.
            let rc = unsafe { libc::get_next_image_info(0, &mut cookie.0, info.as_mut_ptr()) };
            if rc != libc::B_OK {
                return None;
            }
            let info = unsafe { info.assume_init() };

            let kind = super::kind_from_raw(info.image_type);
            let name = unsafe { CStr::from_ptr(info.name.as_ptr()) };
            Some(ImageInfo::new(kind, OsStr::from_bytes(name.to_bytes())))
        }
    }
}

#[cfg(not(target_os = "haiku"))]
mod snapshot {
    use super::{ImageCookie, ImageInfo, ImageKind, ImageTable};

    use std::cell::OnceCell;
    use std::path::PathBuf;

    use log::warn;

    /// The images mapped into this process. The executable comes first; the
    /// library list is only read once the cursor walks past it.
    #[derive(Debug, Clone)]
    pub struct ProcessImages {
        exe: Option<PathBuf>,
        libs: OnceCell<Vec<ImageInfo>>,
    }

    impl ProcessImages {
        pub fn current() -> Self {
            let exe = std::env::current_exe()
                .map_err(|e| warn!("Failed to get current exe: {e}"))
                .ok();
            ProcessImages { exe, libs: OnceCell::new() }
        }

        #[cfg(test)]
        pub(crate) fn libraries_loaded(&self) -> bool {
            self.libs.get().is_some()
        }

        fn libs(&self) -> &[ImageInfo] {
            self.libs.get_or_init(libraries)
        }
    }

    impl ImageTable for ProcessImages {
        fn next_image(&self, cookie: &mut ImageCookie) -> Option<ImageInfo> {
            let idx = usize::try_from(cookie.0).ok()?;
            let info = match (&self.exe, idx) {
                (Some(exe), 0) => ImageInfo::new(ImageKind::App, exe),
                (Some(_), n) => self.libs().get(n - 1)?.clone(),
                (None, n) => self.libs().get(n)?.clone(),
            };
            cookie.0 += 1;
            Some(info)
        }
    }

    #[cfg(target_os = "linux")]
    fn libraries() -> Vec<ImageInfo> {
        match std::fs::read_to_string("/proc/self/maps") {
            Ok(maps) => super::parse_maps(&maps),
            Err(e) => {
                warn!("Couldn't read /proc/self/maps: {e}");
                Vec::new()
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn libraries() -> Vec<ImageInfo> {
        Vec::new()
    }
}

// Shared objects named in a /proc/<pid>/maps listing, deduplicated, in
// mapping order.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_maps(maps: &str) -> Vec<ImageInfo> {
    use itertools::Itertools;

    maps.lines()
        .filter_map(|line| line.splitn(6, char::is_whitespace).nth(5))
        .map(str::trim)
        .filter(|name| name.starts_with('/'))
        .filter(|name| name.ends_with(".so") || name.contains(".so."))
        .unique()
        .map(|name| ImageInfo::new(ImageKind::Library, name))
        .collect()
}

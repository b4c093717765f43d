use crate::buffer::{BufferAlloc, HeapAlloc, SysPath};
use crate::error::{os_query_err, PathErr};
use crate::image::{find_app_image, ImageTable, ProcessImages};

use log::{debug, error};

/// Finds the directory holding the application image of an [`ImageTable`].
pub struct BasePathResolver<T, A = HeapAlloc> {
    table: T,
    alloc: A,
}

impl BasePathResolver<ProcessImages> {
    pub fn current() -> Self {
        Self::new(ProcessImages::current(), HeapAlloc)
    }
}

impl<T: ImageTable, A: BufferAlloc> BasePathResolver<T, A> {
    pub fn new(table: T, alloc: A) -> Self {
        Self { table, alloc }
    }

    pub fn resolve(&self) -> Result<SysPath, PathErr> {
        let app = find_app_image(&self.table).ok_or_else(|| {
            error!("No application image among the loaded images");
            PathErr::NoAppImage
        })?;
        debug!("Application image is '{}'", app.name.display());

        // Follows symlinks.
        let path = app.name.canonicalize().map_err(|e|
            os_query_err!("Couldn't resolve application image '{}': {e}", app.name.display())
        )?;

        // Chop the file name, keep the directory.
        let dir = path.parent().ok_or_else(||
            os_query_err!("Couldn't get parent directory of '{}'", path.display())
        )?;

        SysPath::build(&self.alloc, [dir])
    }
}

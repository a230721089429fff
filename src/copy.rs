//! Verbatim copies for everything that is not a markup page.

use crate::build::BuildError;
use std::fs::File;
use std::io;
use std::path::Path;

/// Copy all bytes of `src` into `dst`, creating or truncating `dst`.
///
/// `io::copy` between two files uses the kernel copy path where the platform
/// offers one. Returns the number of bytes written.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, BuildError> {
    let mut reader = File::open(src).map_err(|source| BuildError::FileAccess {
        path: src.to_path_buf(),
        source,
    })?;
    let mut writer = File::create(dst).map_err(|source| BuildError::FileAccess {
        path: dst.to_path_buf(),
        source,
    })?;
    io::copy(&mut reader, &mut writer).map_err(|source| BuildError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    })
}

//! Slot archive codec
//!
//! Packs a slot's storage directory into a gzip-compressed tar blob and
//! unpacks it again. Paths inside the archive are relative to the directory.

use crate::error::{SlotCacheError, SlotCacheResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::path::Path;
use tar::{Archive, Builder};
use tracing::debug;

/// Pack the contents of `dir` into a blob
pub fn pack(dir: &Path) -> SlotCacheResult<Vec<u8>> {
    let archive_err = |source| SlotCacheError::Archive {
        path: dir.to_path_buf(),
        source,
    };

    if !dir.is_dir() {
        return Err(archive_err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not a directory",
        )));
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);
    builder.append_dir_all(".", dir).map_err(archive_err)?;

    let encoder = builder.into_inner().map_err(archive_err)?;
    let blob = encoder.finish().map_err(archive_err)?;

    debug!("Packed {} into {} bytes", dir.display(), blob.len());
    Ok(blob)
}

/// Unpack a blob produced by `pack` into `dir`, creating it if needed
///
/// Existing files with the same relative paths are overwritten; other files
/// already in `dir` are left alone.
pub fn unpack(blob: &[u8], dir: &Path) -> SlotCacheResult<()> {
    let archive_err = |source| SlotCacheError::Archive {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(archive_err)?;

    let mut archive = Archive::new(GzDecoder::new(blob));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive.unpack(dir).map_err(archive_err)?;

    debug!("Unpacked {} bytes into {}", blob.len(), dir.display());
    Ok(())
}

//! Decompression of archived scene files into temporary files.
//!
//! Scene archives are often stored as `*.h5.bz2`. The store backends need a
//! plain file path, so the archive is streamed into a temporary `msg_*.h5`
//! file that lives exactly as long as its [`TempResource`] handle.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::{LoaderError, Result};
use crate::filename::Compression;

const TEMP_PREFIX: &str = "msg_";
const TEMP_SUFFIX: &str = ".h5";

/// A decompressed copy of a scene archive.
///
/// The file is deleted by [`TempResource::release`] or, failing that, when
/// the handle is dropped.
#[derive(Debug)]
pub struct TempResource {
    file: Option<NamedTempFile>,
    path: PathBuf,
    source: PathBuf,
}

impl TempResource {
    /// Path of the decompressed file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive this file was decompressed from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_released(&self) -> bool {
        self.file.is_none()
    }

    /// Delete the temporary file. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };

        match file.close() {
            Ok(()) => debug!(path = %self.path.display(), "Released temporary scene file"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temporary scene file"
            ),
        }
    }
}

impl Drop for TempResource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates [`TempResource`]s in a fixed directory.
#[derive(Debug, Clone)]
pub struct Decompressor {
    temp_dir: PathBuf,
}

impl Decompressor {
    /// Decompressor writing into `temp_dir`, or the best available scratch
    /// directory when None.
    pub fn new(temp_dir: Option<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.unwrap_or_else(optimal_temp_dir),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Decompress `path`, logging and returning None on failure.
    pub fn materialize(&self, path: &Path, compression: &Compression) -> Option<TempResource> {
        match self.try_materialize(path, compression) {
            Ok(resource) => resource,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not decompress scene file");
                None
            }
        }
    }

    /// Decompress `path` according to `compression`.
    ///
    /// Returns `Ok(None)` for uncompressed files. A partially written
    /// temporary file is removed before an error is returned.
    pub fn try_materialize(
        &self,
        path: &Path,
        compression: &Compression,
    ) -> Result<Option<TempResource>> {
        let open = || {
            File::open(path).map(BufReader::new).map_err(|e| {
                error!(path = %path.display(), error = %e, "Cannot open scene archive");
                LoaderError::Decompression(path.to_path_buf())
            })
        };

        let reader: Box<dyn Read> = match compression {
            Compression::None => return Ok(None),
            Compression::Unsupported(suffix) => {
                return Err(LoaderError::UnsupportedCompression(suffix.clone()))
            }
            Compression::Bzip2 => Box::new(BzDecoder::new(open()?)),
            Compression::Gzip => Box::new(GzDecoder::new(open()?)),
        };

        let file = self.decompress_into_temp(reader).map_err(|e| {
            error!(
                path = %path.display(),
                compression = compression.name(),
                error = %e,
                "Decompression failed"
            );
            LoaderError::Decompression(path.to_path_buf())
        })?;

        let temp_path = file.path().to_path_buf();
        info!(
            source = %path.display(),
            temp = %temp_path.display(),
            compression = compression.name(),
            "Decompressed scene file"
        );

        Ok(Some(TempResource {
            file: Some(file),
            path: temp_path,
            source: path.to_path_buf(),
        }))
    }

    fn decompress_into_temp(&self, mut reader: Box<dyn Read>) -> io::Result<NamedTempFile> {
        // Dropping `file` on any error below deletes it
        let mut file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.temp_dir)?;

        let bytes = io::copy(&mut reader, &mut file)?;
        file.flush()?;
        debug!(path = %file.path().display(), bytes, "Wrote decompressed scene data");
        Ok(file)
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Pick a scratch directory for decompressed scenes.
///
/// On Linux, prefers `/dev/shm` (memory-backed) when it is writable.
/// Falls back to the system temp directory.
pub fn optimal_temp_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let shm_path = Path::new("/dev/shm");
        if shm_path.is_dir() {
            let marker = shm_path.join(format!(".msg_marker_{}", std::process::id()));
            if std::fs::write(&marker, b"marker").is_ok() {
                let _ = std::fs::remove_file(&marker);
                return shm_path.to_path_buf();
            }
        }
    }

    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use flate2::write::GzEncoder;

    fn bz2_bytes(data: &[u8]) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn gz_bytes(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_bzip2_round_trip_and_release() {
        let src = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let archive = src.path().join("scene.h5.bz2");
        std::fs::write(&archive, bz2_bytes(b"hello seviri")).unwrap();

        let decompressor = Decompressor::new(Some(scratch.path().to_path_buf()));
        let mut resource = decompressor
            .materialize(&archive, &Compression::Bzip2)
            .expect("should decompress");

        let name = resource.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("msg_"));
        assert!(name.ends_with(".h5"));
        assert_eq!(resource.source(), archive.as_path());
        assert_eq!(std::fs::read(resource.path()).unwrap(), b"hello seviri");

        resource.release();
        assert!(resource.is_released());
        assert_eq!(entries(scratch.path()), 0);

        // Second release is harmless
        resource.release();
        assert!(resource.is_released());
    }

    #[test]
    fn test_gzip_released_on_drop() {
        let src = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let archive = src.path().join("scene.h5.gz");
        std::fs::write(&archive, gz_bytes(b"gzip payload")).unwrap();

        let decompressor = Decompressor::new(Some(scratch.path().to_path_buf()));
        {
            let resource = decompressor
                .materialize(&archive, &Compression::Gzip)
                .unwrap();
            assert_eq!(std::fs::read(resource.path()).unwrap(), b"gzip payload");
            assert_eq!(entries(scratch.path()), 1);
        }
        assert_eq!(entries(scratch.path()), 0);
    }

    #[test]
    fn test_corrupt_archive_leaves_nothing_behind() {
        let src = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let archive = src.path().join("scene.h5.bz2");
        std::fs::write(&archive, b"definitely not bzip2").unwrap();

        let decompressor = Decompressor::new(Some(scratch.path().to_path_buf()));
        let err = decompressor
            .try_materialize(&archive, &Compression::Bzip2)
            .unwrap_err();
        assert!(matches!(err, LoaderError::Decompression(_)));
        assert!(decompressor
            .materialize(&archive, &Compression::Bzip2)
            .is_none());
        assert_eq!(entries(scratch.path()), 0);
    }

    #[test]
    fn test_missing_archive() {
        let scratch = tempfile::tempdir().unwrap();
        let decompressor = Decompressor::new(Some(scratch.path().to_path_buf()));
        let err = decompressor
            .try_materialize(&scratch.path().join("absent.h5.bz2"), &Compression::Bzip2)
            .unwrap_err();
        assert!(matches!(err, LoaderError::Decompression(_)));
        assert_eq!(entries(scratch.path()), 0);
    }

    #[test]
    fn test_uncompressed_and_unsupported() {
        let scratch = tempfile::tempdir().unwrap();
        let decompressor = Decompressor::new(Some(scratch.path().to_path_buf()));
        let path = scratch.path().join("scene.h5");

        assert!(decompressor
            .try_materialize(&path, &Compression::None)
            .unwrap()
            .is_none());

        let err = decompressor
            .try_materialize(&path, &Compression::Unsupported(".xz".to_string()))
            .unwrap_err();
        assert!(matches!(err, LoaderError::UnsupportedCompression(ref s) if s == ".xz"));
    }

    #[test]
    fn test_optimal_temp_dir_exists() {
        assert!(optimal_temp_dir().is_dir());
    }
}

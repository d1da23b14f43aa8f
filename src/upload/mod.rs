//! Uploaded files and their temp-file reaper.
//!
//! Every multipart file part becomes an [`UploadedFile`]. With
//! `upload.use_temp_files` the part is spooled to a uniquely named file in
//! the spool directory; otherwise it is held in memory.
//!
//! The request owns its files through an [`UploadSet`]. Dropping an
//! `UploadedFile` removes its temp file, so cleanup happens exactly once
//! when the request scope ends, whether the handler returned normally,
//! bailed out early or unwound.

mod multipart;

pub use multipart::{boundary, insert_field, read_multipart};

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use tempfile::{Builder as TempFileBuilder, NamedTempFile};
use thiserror::Error;

use crate::{debug, log};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file `{field}` exceeds the upload limit of {limit} bytes")]
    TooLarge { field: String, limit: u64 },

    #[error("field `{field}` exceeds the body limit of {limit} bytes")]
    FieldTooLarge { field: String, limit: u64 },

    #[error("failed to store upload: {0}")]
    Io(#[from] io::Error),

    #[error("malformed multipart body: {0}")]
    Malformed(String),
}

/// Where and how large uploads may be spooled.
#[derive(Debug, Clone)]
pub struct SpoolOptions {
    /// Spool directory; `None` keeps uploads in memory.
    pub dir: Option<PathBuf>,
    /// Largest accepted file part.
    pub max_file_size: u64,
    /// Largest accepted text field.
    pub max_field_size: u64,
}

#[derive(Debug)]
enum Storage {
    Disk(NamedTempFile),
    Memory(Vec<u8>),
}

/// One uploaded file part.
#[derive(Debug)]
pub struct UploadedFile {
    /// Client-side file name.
    pub name: String,
    /// Form field the file arrived in.
    pub field_name: String,
    pub mimetype: String,
    pub size: u64,
    storage: Option<Storage>,
}

impl UploadedFile {
    /// An upload held in memory.
    #[cfg(test)]
    pub fn in_memory(
        field_name: impl Into<String>,
        name: impl Into<String>,
        mimetype: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            field_name: field_name.into(),
            mimetype: mimetype.into(),
            size: data.len() as u64,
            storage: Some(Storage::Memory(data)),
        }
    }

    /// Read `reader` into a new upload, spooling to `options.dir` when set.
    ///
    /// Fails with [`UploadError::TooLarge`] once more than
    /// `options.max_file_size` bytes arrive; a partially written temp file
    /// is removed on that path too.
    pub fn spool(
        field_name: &str,
        name: &str,
        mimetype: &str,
        reader: impl Read,
        options: &SpoolOptions,
    ) -> Result<Self, UploadError> {
        let limit = options.max_file_size;
        let mut limited = reader.take(limit.saturating_add(1));

        let (size, storage) = match &options.dir {
            Some(dir) => {
                let mut file = TempFileBuilder::new().prefix("upload-").tempfile_in(dir)?;
                let size = io::copy(&mut limited, file.as_file_mut())?;
                (size, Storage::Disk(file))
            }
            None => {
                let mut data = Vec::new();
                let size = limited.read_to_end(&mut data)? as u64;
                (size, Storage::Memory(data))
            }
        };

        let upload = Self {
            name: name.to_string(),
            field_name: field_name.to_string(),
            mimetype: mimetype.to_string(),
            size,
            storage: Some(storage),
        };

        if size > limit {
            // `upload` drops here and takes its temp file with it.
            return Err(UploadError::TooLarge {
                field: field_name.to_string(),
                limit,
            });
        }

        if let Some(path) = upload.temp_file_path() {
            debug!("upload"; "{} -> {} ({} bytes)", field_name, path.display(), size);
        }
        Ok(upload)
    }

    /// On-disk location while the upload is alive; `None` for in-memory uploads.
    pub fn temp_file_path(&self) -> Option<&Path> {
        match &self.storage {
            Some(Storage::Disk(file)) => Some(file.path()),
            _ => None,
        }
    }

    /// Stream the upload's bytes.
    pub fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        match &self.storage {
            Some(Storage::Disk(file)) => Ok(Box::new(fs::File::open(file.path())?)),
            Some(Storage::Memory(data)) => Ok(Box::new(Cursor::new(data.as_slice()))),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "upload released")),
        }
    }

    /// Copy the upload to `dest`, returning the number of bytes written.
    pub fn copy_to(&self, dest: &Path) -> io::Result<u64> {
        match &self.storage {
            Some(Storage::Disk(file)) => fs::copy(file.path(), dest),
            _ => {
                let mut out = fs::File::create(dest)?;
                io::copy(&mut self.open()?, &mut out)
            }
        }
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        let Some(Storage::Disk(file)) = self.storage.take() else {
            return;
        };

        let path = file.path().to_path_buf();
        match file.close() {
            Ok(()) => debug!("upload"; "removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("upload"; "{} already gone", path.display());
            }
            Err(e) => log!("upload"; "failed to remove {}: {}", path.display(), e),
        }
    }
}

/// Files uploaded with one request.
#[derive(Debug, Default)]
pub struct UploadSet {
    files: Vec<UploadedFile>,
}

impl UploadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// First file uploaded under `field`.
    pub fn get(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field_name == field)
    }

    pub fn push(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter()
    }
}

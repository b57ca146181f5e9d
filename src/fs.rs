//! File-system capability used by `exists`, `delete`, `saveto` and the
//! `load*` operators.
//!
//! Failures are split into *open* failures (the file could not be opened,
//! created or removed) and *read/write* failures (the handle was obtained but
//! the transfer failed).  The load operators propagate both; `saveto` and
//! `delete` turn them into a `{success, error}` record.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::info;

use crate::error::{ExprError, Result};

pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    fn load_text(&self, path: &Path) -> Result<String>;

    fn load_binary(&self, path: &Path) -> Result<Vec<u8>>;

    fn remove(&self, path: &Path) -> Result<()>;

    /// Create or truncate `path` and write `data`.
    fn save(&self, path: &Path, data: &[u8]) -> Result<()>;
}

/// Shared handles delegate, so a caller can keep inspecting a file system it
/// handed to an environment.
impl<F: FileSystem + ?Sized> FileSystem for Rc<F> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn load_text(&self, path: &Path) -> Result<String> {
        (**self).load_text(path)
    }

    fn load_binary(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).load_binary(path)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        (**self).remove(path)
    }

    fn save(&self, path: &Path, data: &[u8]) -> Result<()> {
        (**self).save(path, data)
    }
}

fn open_error(path: &Path, source: io::Error) -> ExprError {
    ExprError::Open {
        path: path.to_path_buf(),
        source,
    }
}

fn rw_error(path: &Path, source: io::Error) -> ExprError {
    ExprError::ReadWrite {
        path: path.to_path_buf(),
        source,
    }
}

/// The real file system, through `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn load_text(&self, path: &Path) -> Result<String> {
        info!("Loading text from {:?}", path);

        let mut file = File::open(path).map_err(|e| open_error(path, e))?;
        let mut text = String::new();
        file.read_to_string(&mut text).map_err(|e| rw_error(path, e))?;

        Ok(text)
    }

    fn load_binary(&self, path: &Path) -> Result<Vec<u8>> {
        info!("Loading bytes from {:?}", path);

        let mut file = File::open(path).map_err(|e| open_error(path, e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| rw_error(path, e))?;

        Ok(buf)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        info!("Removing {:?}", path);

        fs::remove_file(path).map_err(|e| open_error(path, e))
    }

    fn save(&self, path: &Path, data: &[u8]) -> Result<()> {
        info!("Saving {} bytes to {:?}", data.len(), path);

        let mut file = File::create(path).map_err(|e| open_error(path, e))?;
        file.write_all(data).map_err(|e| rw_error(path, e))?;
        file.flush().map_err(|e| rw_error(path, e))
    }
}

/// In-memory file system.  Paths listed as read-only refuse `save` and
/// `remove` with an open failure.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<HashMap<PathBuf, Vec<u8>>>,
    read_only: RefCell<Vec<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&self, path: P, data: &[u8]) {
        self.files.borrow_mut().insert(path.into(), data.to_vec());
    }

    pub fn protect<P: Into<PathBuf>>(&self, path: P) {
        self.read_only.borrow_mut().push(path.into());
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        if self.read_only.borrow().iter().any(|p| p == path) {
            return Err(open_error(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "read-only file"),
            ));
        }
        Ok(())
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn load_text(&self, path: &Path) -> Result<String> {
        let bytes = self.load_binary(path)?;

        String::from_utf8(bytes)
            .map_err(|e| rw_error(path, io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    fn load_binary(&self, path: &Path) -> Result<Vec<u8>> {
        self.contents(path)
            .ok_or_else(|| open_error(path, io::Error::from(io::ErrorKind::NotFound)))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.check_writable(path)?;

        self.files
            .borrow_mut()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| open_error(path, io::Error::from(io::ErrorKind::NotFound)))
    }

    fn save(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.check_writable(path)?;
        self.insert(path, data);

        Ok(())
    }
}

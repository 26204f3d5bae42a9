use std::fmt::Debug;
use std::io;
use std::path::Path;

/// A file system abstraction for the compiler.
///
/// Imported files are read through this trait, so embedders can supply an
/// in-memory or sandboxed file system.
pub trait Fs: Debug {
    /// Whether the path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether the path exists and is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// The entire contents of a file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// A file system that contains no files.
#[derive(Debug)]
pub struct NullFs;

impl Fs for NullFs {
    fn is_dir(&self, _path: &Path) -> bool {
        false
    }

    fn is_file(&self, _path: &Path) -> bool {
        false
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no file system: {}", path.display()),
        ))
    }
}

/// A file system backed by [`std::fs`].
#[derive(Debug)]
pub struct StdFs;

impl Fs for StdFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

//! In-memory file storage
//!
//! Keeps file contents in RAM and records every transfer, with hooks to
//! corrupt reads or fail writes. Used to exercise the testers without
//! touching a real device.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::disk::{FileStorage, OpenMode, StorageFile};

/// A transfer observed by [`MemoryStorage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Read { offset: u64, len: usize },
    Write { offset: u64, len: usize },
}

impl IoOp {
    pub fn is_read(&self) -> bool {
        matches!(self, IoOp::Read { .. })
    }

    pub fn is_write(&self) -> bool {
        matches!(self, IoOp::Write { .. })
    }
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<PathBuf, Vec<u8>>,
    ops: Vec<IoOp>,
    free_space: u64,
    read_corruptions: Vec<(u64, u8)>,
    fail_writes_from: Option<usize>,
    fail_opens: bool,
    writes_seen: usize,
}

/// Shared in-memory storage; clones see the same files
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Rc<RefCell<Inner>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        let inner = Inner {
            free_space: u64::MAX,
            ..Inner::default()
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Report `bytes` as the free space of every volume
    pub fn with_free_space(self, bytes: u64) -> Self {
        self.inner.borrow_mut().free_space = bytes;
        self
    }

    /// XOR `mask` into the byte at `offset` whenever a read covers it
    pub fn corrupt_reads_at(&self, offset: u64, mask: u8) {
        self.inner.borrow_mut().read_corruptions.push((offset, mask));
    }

    /// Fail every write call after `count` successful ones
    pub fn fail_writes_after(&self, count: usize) {
        self.inner.borrow_mut().fail_writes_from = Some(count);
    }

    /// Make every subsequent create/open fail
    pub fn fail_opens(&self) {
        self.inner.borrow_mut().fail_opens = true;
    }

    /// Place a file with the given contents
    pub fn insert(&self, path: impl Into<PathBuf>, contents: Vec<u8>) {
        self.inner.borrow_mut().files.insert(path.into(), contents);
    }

    /// Copy of a file's contents
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.inner.borrow().files.get(path).cloned()
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.inner.borrow().files.contains_key(path)
    }

    /// All transfers performed so far, in order
    pub fn ops(&self) -> Vec<IoOp> {
        self.inner.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.inner.borrow_mut().ops.clear();
    }

    fn handle(&self, path: &Path, writable: bool) -> Box<dyn StorageFile> {
        Box::new(MemoryFile {
            inner: Rc::clone(&self.inner),
            path: path.to_path_buf(),
            position: 0,
            writable,
        })
    }

    fn check_open(&self, path: &Path) -> io::Result<()> {
        if self.inner.borrow().fail_opens {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("open refused: {}", path.display()),
            ));
        }
        Ok(())
    }
}

impl FileStorage for MemoryStorage {
    fn create(&self, path: &Path) -> io::Result<Box<dyn StorageFile>> {
        self.check_open(path)?;
        self.inner
            .borrow_mut()
            .files
            .insert(path.to_path_buf(), Vec::new());
        Ok(self.handle(path, true))
    }

    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Box<dyn StorageFile>> {
        self.check_open(path)?;
        if !self.exists(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            ));
        }
        Ok(self.handle(path, mode == OpenMode::ReadWrite))
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        self.inner
            .borrow_mut()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        self.inner
            .borrow()
            .files
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn free_space(&self, _path: &Path) -> io::Result<u64> {
        Ok(self.inner.borrow().free_space)
    }
}

struct MemoryFile {
    inner: Rc<RefCell<Inner>>,
    path: PathBuf,
    position: u64,
    writable: bool,
}

impl StorageFile for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        let data = inner
            .files
            .get(&self.path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file deleted"))?;

        let start = (self.position as usize).min(data.len());
        let len = buf.len().min(data.len() - start);
        buf[..len].copy_from_slice(&data[start..start + len]);

        for &(offset, mask) in &inner.read_corruptions {
            if offset >= self.position && offset < self.position + len as u64 {
                buf[(offset - self.position) as usize] ^= mask;
            }
        }

        inner.ops.push(IoOp::Read {
            offset: self.position,
            len,
        });
        self.position += len as u64;
        Ok(len)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file opened read-only",
            ));
        }
        let mut inner = self.inner.borrow_mut();
        if let Some(limit) = inner.fail_writes_from {
            if inner.writes_seen >= limit {
                return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
            }
        }
        inner.writes_seen += 1;

        let position = self.position;
        let data = inner
            .files
            .get_mut(&self.path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file deleted"))?;
        let end = position as usize + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[position as usize..end].copy_from_slice(buf);

        inner.ops.push(IoOp::Write {
            offset: position,
            len: buf.len(),
        });
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.position = offset;
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let storage = MemoryStorage::new();
        let path = Path::new("mem.fil");
        let mut file = storage.create(path).unwrap();
        file.write(&[1, 2, 3, 4]).unwrap();
        file.seek(1).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(file.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [2, 3]);
        assert_eq!(
            storage.ops(),
            vec![
                IoOp::Write { offset: 0, len: 4 },
                IoOp::Read { offset: 1, len: 2 }
            ]
        );
    }

    #[test]
    fn test_corrupted_read() {
        let storage = MemoryStorage::new();
        let path = Path::new("mem.fil");
        storage.insert(path, vec![0u8; 16]);
        storage.corrupt_reads_at(5, 0xFF);

        let mut file = storage.open(path, OpenMode::ReadOnly).unwrap();
        let mut buf = [0u8; 16];
        file.read(&mut buf).unwrap();
        assert_eq!(buf[5], 0xFF);
        assert_eq!(storage.contents(path).unwrap()[5], 0);
    }

    #[test]
    fn test_injected_failures() {
        let storage = MemoryStorage::new();
        let path = Path::new("mem.fil");
        let mut file = storage.create(path).unwrap();
        storage.fail_writes_after(1);
        assert!(file.write(&[0u8; 8]).is_ok());
        assert!(file.write(&[0u8; 8]).is_err());

        let read_only = storage.open(path, OpenMode::ReadOnly);
        assert!(read_only.unwrap().write(&[1]).is_err());

        storage.fail_opens();
        assert!(storage.open(path, OpenMode::ReadWrite).is_err());
    }
}

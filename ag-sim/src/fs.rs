//! 内存中的文件系统
//!
//! All paths handed to [`FileSystem`] are canonical absolute paths, see
//! [`crate::path::Path::canonicalize`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use derive_more::Display;

use crate::path::Path;

/// 文件内容，被打开的文件描述符共享
pub type FileData = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FsError {
    #[display(fmt = "file exists")]
    AlreadyExists,
    #[display(fmt = "no such file or directory")]
    NotFound,
    #[display(fmt = "is a directory")]
    IsADirectory,
    #[display(fmt = "not a directory")]
    NotADirectory,
    #[display(fmt = "directory not empty")]
    DirectoryNotEmpty,
    #[display(fmt = "invalid path")]
    InvalidPath,
    #[display(fmt = "directory in use")]
    InUse,
}

#[derive(Debug)]
enum Node {
    File(FileData),
    Dir(Directory),
}

#[derive(Debug, Default)]
struct Directory {
    entries: BTreeMap<String, Node>,
}

#[derive(Debug, Default)]
pub struct FileSystem {
    root: Directory,
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl FileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn dir(&self, path: &str) -> Result<&Directory, FsError> {
        components(path).try_fold(&self.root, |dir, name| match dir.entries.get(name) {
            Some(Node::Dir(dir)) => Ok(dir),
            Some(Node::File(_)) => Err(FsError::NotADirectory),
            None => Err(FsError::NotFound),
        })
    }

    fn dir_mut(&mut self, path: &str) -> Result<&mut Directory, FsError> {
        components(path).try_fold(&mut self.root, |dir, name| {
            match dir.entries.get_mut(name) {
                Some(Node::Dir(dir)) => Ok(dir),
                Some(Node::File(_)) => Err(FsError::NotADirectory),
                None => Err(FsError::NotFound),
            }
        })
    }

    fn node(&self, path: &str) -> Result<&Node, FsError> {
        let (parent, name) = path.parent_file().ok_or(FsError::IsADirectory)?;
        self.dir(parent)?.entries.get(name).ok_or(FsError::NotFound)
    }

    /// Creates a regular file, truncating an existing one.
    pub fn create(&mut self, path: &str) -> Result<FileData, FsError> {
        let (parent, name) = path.parent_file().ok_or(FsError::IsADirectory)?;
        let dir = self.dir_mut(parent)?;

        match dir.entries.get(name) {
            Some(Node::File(data)) => {
                data.lock().unwrap_or_else(|e| e.into_inner()).clear();
                return Ok(data.clone());
            }
            Some(Node::Dir(_)) => return Err(FsError::IsADirectory),
            None => (),
        }

        let data = FileData::default();
        dir.entries
            .insert(name.to_owned(), Node::File(data.clone()));
        Ok(data)
    }

    pub fn open(&self, path: &str) -> Result<FileData, FsError> {
        match self.node(path)? {
            Node::File(data) => Ok(data.clone()),
            Node::Dir(_) => Err(FsError::IsADirectory),
        }
    }

    pub fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        let (parent, name) = path.parent_file().ok_or(FsError::IsADirectory)?;
        let dir = self.dir_mut(parent)?;

        match dir.entries.get(name) {
            Some(Node::File(_)) => (),
            Some(Node::Dir(_)) => return Err(FsError::IsADirectory),
            None => return Err(FsError::NotFound),
        }
        dir.entries.remove(name);

        Ok(())
    }

    pub fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        let (parent, name) = path.parent_file().ok_or(FsError::AlreadyExists)?;
        let dir = self.dir_mut(parent)?;

        if dir.entries.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        dir.entries
            .insert(name.to_owned(), Node::Dir(Directory::default()));

        Ok(())
    }

    pub fn rmdir(&mut self, path: &str) -> Result<(), FsError> {
        // 根目录不可删除
        let (parent, name) = path.parent_file().ok_or(FsError::InvalidPath)?;
        let dir = self.dir_mut(parent)?;

        match dir.entries.get(name) {
            Some(Node::Dir(child)) if child.entries.is_empty() => (),
            Some(Node::Dir(_)) => return Err(FsError::DirectoryNotEmpty),
            Some(Node::File(_)) => return Err(FsError::NotADirectory),
            None => return Err(FsError::NotFound),
        }
        dir.entries.remove(name);

        Ok(())
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.dir(path).is_ok()
    }

    pub fn exists(&self, path: &str) -> bool {
        path == "/" || self.node(path).is_ok()
    }

    /// Writes a whole file, creating missing parent directories.
    pub fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), FsError> {
        let (parent, _) = path.parent_file().ok_or(FsError::IsADirectory)?;
        self.create_dir_all(parent)?;

        let data = self.create(path)?;
        data.lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(contents);

        Ok(())
    }

    pub fn create_dir_all(&mut self, path: &str) -> Result<(), FsError> {
        let mut dir = &mut self.root;
        for name in components(path) {
            let node = dir
                .entries
                .entry(name.to_owned())
                .or_insert_with(|| Node::Dir(Directory::default()));
            dir = match node {
                Node::Dir(dir) => dir,
                Node::File(_) => return Err(FsError::NotADirectory),
            };
        }

        Ok(())
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let data = self.open(path)?;
        let contents = data.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> FileSystem {
        let mut fs = FileSystem::new();
        fs.write_file("/test/asdf", b"hello").unwrap();
        fs
    }

    #[test]
    fn create_and_unlink() {
        let mut fs = FileSystem::new();
        assert!(!fs.exists("/aa"));

        fs.create("/aa").unwrap();
        assert!(fs.exists("/aa"));

        fs.unlink("/aa").unwrap();
        assert!(!fs.exists("/aa"));
        assert_eq!(Err(FsError::NotFound), fs.unlink("/aa"));
    }

    #[test]
    fn create_truncates() {
        let mut fs = seeded();
        let data = fs.create("/test/asdf").unwrap();
        assert!(data.lock().unwrap().is_empty());
        assert_eq!(Ok(Vec::new()), fs.read_file("/test/asdf"));
    }

    #[test]
    fn rmdir_requires_empty_directory() {
        let mut fs = seeded();
        assert_eq!(Err(FsError::DirectoryNotEmpty), fs.rmdir("/test"));
        assert_eq!(Err(FsError::NotADirectory), fs.rmdir("/test/asdf"));
        assert_eq!(Err(FsError::IsADirectory), fs.unlink("/test"));

        fs.unlink("/test/asdf").unwrap();
        fs.rmdir("/test").unwrap();
        assert!(!fs.exists("/test"));
        assert_eq!(Err(FsError::InvalidPath), fs.rmdir("/"));
    }

    #[test]
    fn mkdir_rejects_existing_names() {
        let mut fs = seeded();
        assert_eq!(Err(FsError::AlreadyExists), fs.mkdir("/test"));
        assert_eq!(Err(FsError::NotFound), fs.mkdir("/missing/blah"));

        fs.mkdir("/blah").unwrap();
        assert!(fs.is_dir("/blah"));
        assert!(!fs.is_dir("/test/asdf"));
    }

    #[test]
    fn unlinked_data_survives() {
        let mut fs = seeded();
        let data = fs.open("/test/asdf").unwrap();
        fs.unlink("/test/asdf").unwrap();
        assert_eq!(b"hello", data.lock().unwrap().as_slice());
    }

    #[test]
    fn files_are_not_directories() {
        let mut fs = seeded();
        assert_eq!(Err(FsError::NotADirectory), fs.create("/test/asdf/x").map(|_| ()));
        assert_eq!(Err(FsError::IsADirectory), fs.open("/test").map(|_| ()));
        assert_eq!(Err(FsError::NotADirectory), fs.create_dir_all("/test/asdf/y"));
    }
}

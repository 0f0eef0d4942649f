//! Slash-separated paths, always resolved from the root directory.

use crate::{Disk, FsError, InodeId, PseudoFileSystem, Result, ROOT_INODE};

pub trait Path {
    /// Names to look up in turn, skipping empty and `.` segments.
    fn components(&self) -> impl Iterator<Item = &Self>;

    /// Returns the path's `(parent directory, file name)`, or `None` for the root.
    ///
    /// Trailing slashes are ignored; a path with no other slash lives in `/`.
    fn parent_file(&self) -> Option<(&Self, &Self)>;
}

impl Path for str {
    fn components(&self) -> impl Iterator<Item = &Self> {
        self.split('/').filter(|cmp| !cmp.is_empty() && *cmp != ".")
    }

    fn parent_file(&self) -> Option<(&Self, &Self)> {
        let path = self.trim_end_matches('/');
        if path.is_empty() {
            return None;
        }

        match path.rsplit_once('/') {
            Some((parent, file)) if parent.is_empty() => Some(("/", file)),
            Some((parent, file)) => Some((parent, file)),
            None => Some(("/", path)),
        }
    }
}

impl<D: Disk> PseudoFileSystem<D> {
    /// Inode id reached by walking `path` down from the root.
    pub fn resolve(&self, path: &str) -> Result<InodeId> {
        path.components().try_fold(ROOT_INODE, |dir_id, name| {
            self.find(dir_id, name)?.ok_or(FsError::NotFound)
        })
    }

    /// Resolve the directory that would hold `path`, with the final name.
    ///
    /// Fails with [`FsError::InvalidPath`] for the root itself.
    pub fn resolve_parent<'p>(&self, path: &'p str) -> Result<(InodeId, &'p str)> {
        let (parent, name) = path
            .parent_file()
            .ok_or_else(|| FsError::InvalidPath(path.to_owned()))?;
        let parent_id = self.resolve(parent)?;
        if !self.read_inode(parent_id)?.is_dir() {
            return Err(FsError::NotADirectory);
        }

        Ok((parent_id, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_parent() {
        assert_eq!("/a/b/c".parent_file(), Some(("/a/b", "c")));
        assert_eq!("/a".parent_file(), Some(("/", "a")));
        assert_eq!("a".parent_file(), Some(("/", "a")));
        assert_eq!("a/b".parent_file(), Some(("a", "b")));
        assert_eq!("/a/b/".parent_file(), Some(("/a", "b")));
        assert_eq!("/".parent_file(), None);
        assert_eq!("".parent_file(), None);
    }

    #[test]
    fn components_skip_dots_and_empties() {
        let cmps: Vec<_> = "//a/./b//..//c/".components().collect();
        assert_eq!(cmps, vec!["a", "b", "..", "c"]);
        assert_eq!("/".components().count(), 0);
    }
}

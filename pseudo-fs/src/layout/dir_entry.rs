use std::borrow::Cow;

use binrw::binrw;

use super::{decode, encode};
use crate::{FsError, InodeId, Result, BLOCK_SIZE, NAME_MAX_LEN};

/// One (inode, name) record of a directory.
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirEntry {
    inode_id: InodeId,
    // the last byte is reserved for \0
    name: [u8; NAME_MAX_LEN + 1],
}

impl DirEntry {
    /// Records are always 16 bytes
    pub const SIZE: usize = 16;
    pub const PER_BLOCK: usize = BLOCK_SIZE / Self::SIZE;

    /// Build a record; `name` must already have passed [`DirEntry::check_name`].
    #[inline]
    pub fn new(name: &str, inode_id: InodeId) -> Self {
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_MAX_LEN);
        let mut name = [0; NAME_MAX_LEN + 1];
        name[..len].copy_from_slice(&bytes[..len]);

        Self { inode_id, name }
    }

    /// Reject names that cannot be stored as a user entry.
    pub fn check_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name.len() <= NAME_MAX_LEN
            && name != "."
            && name != ".."
            && !name.bytes().any(|c| c == b'/' || c == 0);

        if valid {
            Ok(())
        } else {
            Err(FsError::InvalidName(name.to_owned()))
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        !self.is_free() && self.name_bytes() == name.as_bytes()
    }

    /// A free slot has an empty name.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    /// "." or "..".
    #[inline]
    pub fn is_dot(&self) -> bool {
        matches!(self.name_bytes(), b"." | b"..")
    }

    #[inline]
    pub fn inode_id(&self) -> InodeId {
        self.inode_id
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    fn name_bytes(&self) -> &[u8] {
        let len = self.name.iter().position(|&c| c == 0).unwrap_or(self.name.len());
        &self.name[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_layout() {
        let entry = DirEntry::new("hello.txt", 42);
        let bytes = entry.to_bytes().unwrap();
        assert_eq!(bytes.len(), DirEntry::SIZE);
        assert_eq!(&bytes[..4], &42u32.to_le_bytes());
        assert_eq!(&bytes[4..13], b"hello.txt");
        assert!(bytes[13..].iter().all(|&c| c == 0));

        let decoded = DirEntry::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.name(), "hello.txt");
        assert!(decoded.matches("hello.txt"));
        assert!(!decoded.matches("hello"));
    }

    #[test]
    fn zeroed_record_is_free() {
        let entry = DirEntry::from_bytes(&[0; DirEntry::SIZE]).unwrap();
        assert!(entry.is_free());
        assert!(!entry.matches(""));
        assert!(DirEntry::new("..", 0).is_dot());
    }

    #[test]
    fn name_rules() {
        assert!(DirEntry::check_name("abcdefghijk").is_ok());
        for bad in ["", ".", "..", "abcdefghijkl", "a/b", "nul\0"] {
            assert!(
                matches!(DirEntry::check_name(bad), Err(FsError::InvalidName(_))),
                "{bad:?}"
            );
        }
    }
}

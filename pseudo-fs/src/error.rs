use std::io;

use thiserror::Error;

use crate::layout::ResourceClass;
use crate::MAX_FILE_SIZE;

pub type Result<T> = core::result::Result<T, FsError>;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,
    #[error("entry already exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    #[error("no free {0} left")]
    ResourceExhausted(ResourceClass),
    /// All direct blocks of the directory are full of entries.
    #[error("directory has no free entry slot")]
    DirectoryFull,
    #[error("{0} bytes exceed the {}-byte file limit", MAX_FILE_SIZE)]
    TooLarge(usize),
    #[error("invalid entry name {0:?}")]
    InvalidName(String),
    #[error("invalid path {0:?}")]
    InvalidPath(String),
    #[error("disk of {0} bytes leaves no room for the data area")]
    DiskTooSmall(i64),
    #[error("disk of {0} bytes exceeds the addressable size")]
    DiskTooLarge(i64),
    #[error("image has no valid superblock")]
    InvalidImage,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Codec(#[from] binrw::Error),
}

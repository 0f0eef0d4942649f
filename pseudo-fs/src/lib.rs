/* pseudo-fs layers, top-down */

// Composite operations: mkdir, rm, cp, mv, concatenate, append, import.
mod ops;
pub use ops::DirItem;

// Introspection records.
mod stat;
pub use stat::{FsStat, Stat, StatKind};

// Path resolution from the root inode.
pub mod path;

// Byte content of a file spread over its direct blocks.
mod file;

// Directory records stored in a directory's data blocks.
mod dir;

// Block and inode managers bound to one image.
mod fs;
pub use fs::{format_image, open_image, FormatOptions, PseudoFileSystem, Reservation};

// On-disk structures and their byte layout.
pub mod layout;
pub use layout::{BlockId, DirEntry, DiskInode, DiskInodeKind, Geometry, ResourceClass, SuperBlock};

// The byte-addressed image the filesystem lives in.
mod disk;
pub use disk::{Disk, ImageFile, MemDisk};

mod error;
pub use error::{FsError, Result};

pub const BLOCK_SIZE: usize = 1024;
/// Direct block pointers per inode.
pub const DIRECT_COUNT: usize = 5;
/// Reserved indirect pointers per inode, never populated.
pub const INDIRECT_COUNT: usize = 2;
/// Longest entry name, excluding the terminating NUL.
pub const NAME_MAX_LEN: usize = 11;
pub const MAX_FILE_SIZE: usize = DIRECT_COUNT * BLOCK_SIZE;
pub const ROOT_INODE: InodeId = 0;

pub type InodeId = u32;

type DataBlock = [u8; BLOCK_SIZE];

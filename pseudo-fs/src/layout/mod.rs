//! # On-disk structure layer
//!
//! Byte layout of every region of the image, in order:
//! superblock, inode bitmap, data bitmap, inode table, data area.

mod super_block;
pub use super_block::SuperBlock;

/// Region offsets computed from the image size
mod geometry;
pub use geometry::{parse_size, Geometry};

mod bitmap;
pub use bitmap::{Bitmap, ResourceClass};

mod inode;
pub use inode::{BlockId, DiskInode, DiskInodeKind};

/// Directory records, also stored in data blocks
mod dir_entry;
pub use dir_entry::DirEntry;

use std::io::Cursor;

use binrw::meta::{ReadEndian, WriteEndian};
use binrw::{BinRead, BinWrite};

use crate::Result;

/// Decode one fixed-size record from its bytes.
pub(crate) fn decode<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'a> BinRead<Args<'a> = ()> + ReadEndian,
{
    Ok(T::read_args(&mut Cursor::new(bytes), ())?)
}

/// Encode one fixed-size record into a fresh buffer.
pub(crate) fn encode<T>(record: &T) -> Result<Vec<u8>>
where
    T: for<'a> BinWrite<Args<'a> = ()> + WriteEndian,
{
    let mut cursor = Cursor::new(Vec::new());
    record.write_args(&mut cursor, ())?;
    Ok(cursor.into_inner())
}

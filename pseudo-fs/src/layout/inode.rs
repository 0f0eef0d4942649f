//! Inode records.
//!
//! Every file or directory owns one 40-byte record in the inode table.
//! Content lives in at most [`DIRECT_COUNT`] data blocks pointed to directly;
//! the two indirect pointers are reserved and always unused.
//!
//! On disk an unused pointer is the sentinel `-1`; in memory it is `None`.

use binrw::binrw;
use derive_more::{Display, From, Into};

use super::{decode, encode};
use crate::{InodeId, Result, BLOCK_SIZE, DIRECT_COUNT, INDIRECT_COUNT};

/// Index of a block in the data area.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct BlockId(u32);

impl BlockId {
    const UNUSED: i32 = -1;

    fn decode(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    fn encode(block_id: Option<Self>) -> i32 {
        block_id.map_or(Self::UNUSED, |block_id| block_id.0 as i32)
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiskInode {
    pub id: InodeId,
    #[br(map = |raw: u8| if raw != 0 { DiskInodeKind::Directory } else { DiskInodeKind::File })]
    #[bw(map = |kind: &DiskInodeKind| u8::from(*kind == DiskInodeKind::Directory))]
    pub kind: DiskInodeKind,
    /// Hard link count
    #[brw(pad_after = 2)]
    pub links: u8,
    /// Content size in bytes; a directory counts its whole blocks
    pub size: u32,
    #[br(map = |raw: [i32; DIRECT_COUNT]| raw.map(BlockId::decode))]
    #[bw(map = |direct: &[Option<BlockId>; DIRECT_COUNT]| direct.map(BlockId::encode))]
    pub direct: [Option<BlockId>; DIRECT_COUNT],
    #[br(map = |raw: [i32; INDIRECT_COUNT]| raw.map(BlockId::decode))]
    #[bw(map = |indirect: &[Option<BlockId>; INDIRECT_COUNT]| indirect.map(BlockId::encode))]
    indirect: [Option<BlockId>; INDIRECT_COUNT],
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum DiskInodeKind {
    #[default]
    File,
    Directory,
}

impl DiskInode {
    pub const SIZE: usize = 40;

    /// A freshly created inode with one link and no content.
    #[inline]
    pub fn new(id: InodeId, kind: DiskInodeKind) -> Self {
        Self {
            id,
            kind,
            links: 1,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == DiskInodeKind::Directory
    }

    /// Allocated blocks, in pointer order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.direct.iter().flatten().copied()
    }

    #[inline]
    pub fn indirect(&self) -> &[Option<BlockId>; INDIRECT_COUNT] {
        &self.indirect
    }

    /// Blocks needed to hold `size` bytes.
    #[inline]
    pub fn count_data_block(size: usize) -> usize {
        size.div_ceil(BLOCK_SIZE)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }
}

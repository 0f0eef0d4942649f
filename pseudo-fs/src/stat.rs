use enumflags2::bitflags;

use crate::layout::{BlockId, DiskInode, ResourceClass};
use crate::{Disk, InodeId, PseudoFileSystem, Result, BLOCK_SIZE, INDIRECT_COUNT};

/// Metadata of one inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub inode: InodeId,
    pub kind: StatKind,
    pub links: u8,
    pub size: u32,
    /// Allocated direct blocks, in pointer order
    pub direct: Vec<BlockId>,
    pub indirect: [Option<BlockId>; INDIRECT_COUNT],
}

#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatKind {
    DIR = 0o040000,
    #[default]
    FILE = 0o100000,
}

impl StatKind {
    pub(crate) fn of(inode: &DiskInode) -> Self {
        if inode.is_dir() {
            Self::DIR
        } else {
            Self::FILE
        }
    }
}

impl Stat {
    fn new(inode: &DiskInode) -> Self {
        Self {
            inode: inode.id,
            kind: StatKind::of(inode),
            links: inode.links,
            size: inode.size,
            direct: inode.blocks().collect(),
            indirect: *inode.indirect(),
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == StatKind::DIR
    }
}

/// Usage counters of a whole image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStat {
    pub disk_size: u64,
    pub block_size: u32,
    pub inodes_used: u32,
    pub inodes_free: u32,
    pub blocks_used: u32,
    pub blocks_free: u32,
    /// Allocated inodes that are directories, the root included
    pub directories: u32,
}

impl<D: Disk> PseudoFileSystem<D> {
    pub fn stat(&self, path: &str) -> Result<Stat> {
        self.stat_inode(self.resolve(path)?)
    }

    pub fn stat_inode(&self, inode_id: InodeId) -> Result<Stat> {
        Ok(Stat::new(&self.read_inode(inode_id)?))
    }

    pub fn statfs(&self) -> Result<FsStat> {
        let geometry = self.geometry();
        let inode_capacity = geometry.bitmap(ResourceClass::Inode).capacity();
        let block_capacity = geometry.bitmap(ResourceClass::Data).capacity();
        let inodes_used = self.count_used(ResourceClass::Inode)?;
        let blocks_used = self.count_used(ResourceClass::Data)?;

        let mut directories = 0;
        for inode_id in 0..inode_capacity {
            if self.is_set(ResourceClass::Inode, inode_id)? && self.read_inode(inode_id)?.is_dir()
            {
                directories += 1;
            }
        }

        Ok(FsStat {
            disk_size: geometry.disk_size,
            block_size: BLOCK_SIZE as u32,
            inodes_used,
            inodes_free: inode_capacity - inodes_used,
            blocks_used,
            blocks_free: block_capacity - blocks_used,
            directories,
        })
    }
}

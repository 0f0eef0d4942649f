//! # Directory layer
//!
//! A directory's data blocks hold a flat array of [`DirEntry`] records,
//! 64 to a block. Records are scanned in pointer order, then slot order;
//! removal leaves a hole that the next insertion may fill.

use log::debug;

use crate::fs::Reservation;
use crate::layout::{BlockId, DirEntry, DiskInode};
use crate::{Disk, FsError, InodeId, PseudoFileSystem, Result};
use crate::{DataBlock, BLOCK_SIZE};

/// Position of one record inside a directory.
#[derive(Debug, Clone, Copy)]
struct Slot {
    block_id: BlockId,
    index: usize,
}

impl<D: Disk> PseudoFileSystem<D> {
    /// Look `name` up in directory `dir_id`.
    pub fn find(&self, dir_id: InodeId, name: &str) -> Result<Option<InodeId>> {
        let dir = self.read_dir_inode(dir_id)?;
        Ok(self
            .search(&dir, name)?
            .map(|(_, entry)| entry.inode_id()))
    }

    /// Record `name` → `inode_id` in directory `dir_id`.
    pub fn insert(&self, dir_id: InodeId, name: &str, inode_id: InodeId) -> Result<()> {
        let mut reservation = self.reserve();
        self.insert_staged(&mut reservation, dir_id, name, inode_id)?;
        reservation.commit();
        Ok(())
    }

    /// Remove `name` from directory `dir_id`, returning the inode it named.
    pub fn remove(&self, dir_id: InodeId, name: &str) -> Result<InodeId> {
        let dir = self.read_dir_inode(dir_id)?;
        let (slot, entry) = self.search(&dir, name)?.ok_or(FsError::NotFound)?;
        self.write_slot(slot, &DirEntry::default())?;

        debug!("unlinked {name:?} (inode {}) from inode {dir_id}", entry.inode_id());
        Ok(entry.inode_id())
    }

    /// Whether only "." and ".." remain.
    pub fn is_empty(&self, dir_id: InodeId) -> Result<bool> {
        let dir = self.read_dir_inode(dir_id)?;
        for block_id in dir.blocks() {
            let entries = self.load_entries(block_id)?;
            if entries.iter().any(|entry| !entry.is_free() && !entry.is_dot()) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Every occupied record, "." and ".." included, in scan order.
    pub fn entries(&self, dir_id: InodeId) -> Result<Vec<DirEntry>> {
        let dir = self.read_dir_inode(dir_id)?;
        let mut entries = Vec::new();
        for block_id in dir.blocks() {
            entries.extend(
                self.load_entries(block_id)?
                    .into_iter()
                    .filter(|entry| !entry.is_free()),
            );
        }

        Ok(entries)
    }
}

impl<D: Disk> PseudoFileSystem<D> {
    /// Insert, staging any block the directory grows by in `reservation`.
    ///
    /// The first free slot of the allocated blocks wins. A directory with no
    /// free slot grows by one zeroed block until all direct pointers are used,
    /// after which the insert fails with [`FsError::DirectoryFull`].
    pub(crate) fn insert_staged(
        &self,
        reservation: &mut Reservation<'_, D>,
        dir_id: InodeId,
        name: &str,
        inode_id: InodeId,
    ) -> Result<()> {
        DirEntry::check_name(name)?;
        let mut dir = self.read_dir_inode(dir_id)?;
        let entry = DirEntry::new(name, inode_id);

        let mut free_slot = None;
        for block_id in dir.blocks() {
            for (index, existing) in self.load_entries(block_id)?.iter().enumerate() {
                if existing.matches(name) {
                    return Err(FsError::AlreadyExists);
                }
                if free_slot.is_none() && existing.is_free() {
                    free_slot = Some(Slot { block_id, index });
                }
            }
        }

        if let Some(slot) = free_slot {
            self.write_slot(slot, &entry)?;
            debug!("linked {name:?} (inode {inode_id}) into inode {dir_id}");
            return Ok(());
        }

        let pointer = dir
            .direct
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::DirectoryFull)?;
        let block_id = reservation.block()?;
        self.write_block(block_id, &[0; BLOCK_SIZE])?;
        self.write_slot(Slot { block_id, index: 0 }, &entry)?;

        dir.direct[pointer] = Some(block_id);
        dir.size += BLOCK_SIZE as u32;
        self.write_inode(dir_id, &dir)?;

        debug!("inode {dir_id} grew by block {block_id} for {name:?}");
        Ok(())
    }

    /// Fill `block_id` with the records of a new directory.
    pub(crate) fn init_directory(
        &self,
        block_id: BlockId,
        self_id: InodeId,
        parent_id: InodeId,
    ) -> Result<()> {
        let mut block: DataBlock = [0; BLOCK_SIZE];
        let dots = [DirEntry::new(".", self_id), DirEntry::new("..", parent_id)];
        for (index, entry) in dots.iter().enumerate() {
            let offset = index * DirEntry::SIZE;
            block[offset..offset + DirEntry::SIZE].copy_from_slice(&entry.to_bytes()?);
        }

        self.write_block(block_id, &block)
    }

    /// Point the ".." record of directory `dir_id` at `parent_id`.
    pub(crate) fn set_parent(&self, dir_id: InodeId, parent_id: InodeId) -> Result<()> {
        let dir = self.read_dir_inode(dir_id)?;
        let (slot, _) = self.search(&dir, "..")?.ok_or(FsError::NotFound)?;
        self.write_slot(slot, &DirEntry::new("..", parent_id))
    }

    fn read_dir_inode(&self, dir_id: InodeId) -> Result<DiskInode> {
        let dir = self.read_inode(dir_id)?;
        if !dir.is_dir() {
            return Err(FsError::NotADirectory);
        }
        Ok(dir)
    }

    fn search(&self, dir: &DiskInode, name: &str) -> Result<Option<(Slot, DirEntry)>> {
        for block_id in dir.blocks() {
            let found = self
                .load_entries(block_id)?
                .into_iter()
                .enumerate()
                .find(|(_, entry)| entry.matches(name));
            if let Some((index, entry)) = found {
                return Ok(Some((Slot { block_id, index }, entry)));
            }
        }

        Ok(None)
    }

    fn load_entries(&self, block_id: BlockId) -> Result<Vec<DirEntry>> {
        let mut block: DataBlock = [0; BLOCK_SIZE];
        self.read_block(block_id, &mut block)?;
        block
            .chunks_exact(DirEntry::SIZE)
            .map(DirEntry::from_bytes)
            .collect()
    }

    fn write_slot(&self, slot: Slot, entry: &DirEntry) -> Result<()> {
        self.write_in_block(slot.block_id, slot.index * DirEntry::SIZE, &entry.to_bytes()?)
    }
}

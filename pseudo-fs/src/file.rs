//! # File content layer
//!
//! A file's bytes are laid out over its direct blocks in pointer order;
//! the tail of the last block past the file size is padding.

use log::debug;

use crate::fs::Reservation;
use crate::layout::{DiskInode, ResourceClass};
use crate::{DataBlock, Disk, FsError, InodeId, PseudoFileSystem, Result};
use crate::{BLOCK_SIZE, DIRECT_COUNT, MAX_FILE_SIZE};

impl<D: Disk> PseudoFileSystem<D> {
    /// Exactly `inode.size` bytes of content.
    pub fn read_content(&self, inode: &DiskInode) -> Result<Vec<u8>> {
        let size = inode.size as usize;
        let mut content = Vec::with_capacity(size);
        let mut block: DataBlock = [0; BLOCK_SIZE];

        for block_id in inode.blocks() {
            if content.len() >= size {
                break;
            }
            self.read_block(block_id, &mut block)?;
            let take = (size - content.len()).min(BLOCK_SIZE);
            content.extend_from_slice(&block[..take]);
        }

        Ok(content)
    }

    /// Store `bytes` in freshly allocated blocks and point inode `inode_id` at them.
    ///
    /// Blocks the inode pointed to before are not freed. Either every block
    /// is allocated and linked, or none stays allocated.
    pub fn write_new(&self, inode_id: InodeId, bytes: &[u8]) -> Result<DiskInode> {
        let mut reservation = self.reserve();
        let inode = self.write_staged(&mut reservation, inode_id, bytes)?;
        reservation.commit();
        Ok(inode)
    }

    /// [`Self::write_new`], staging the new blocks in `reservation`.
    pub(crate) fn write_staged(
        &self,
        reservation: &mut Reservation<'_, D>,
        inode_id: InodeId,
        bytes: &[u8],
    ) -> Result<DiskInode> {
        if bytes.len() > MAX_FILE_SIZE {
            return Err(FsError::TooLarge(bytes.len()));
        }

        let count = DiskInode::count_data_block(bytes.len());
        let blocks = (0..count)
            .map(|_| reservation.block())
            .collect::<Result<Vec<_>>>()?;

        for (&block_id, chunk) in blocks.iter().zip(bytes.chunks(BLOCK_SIZE)) {
            let mut block: DataBlock = [0; BLOCK_SIZE];
            block[..chunk.len()].copy_from_slice(chunk);
            self.write_block(block_id, &block)?;
        }

        let mut inode = self.read_inode(inode_id)?;
        inode.direct = [None; DIRECT_COUNT];
        for (pointer, &block_id) in inode.direct.iter_mut().zip(&blocks) {
            *pointer = Some(block_id);
        }
        inode.size = bytes.len() as u32;
        self.write_inode(inode_id, &inode)?;

        debug!("inode {inode_id} now holds {} bytes in {count} blocks", bytes.len());
        Ok(inode)
    }

    /// Clear the bitmap bits of every block `inode` points to.
    pub(crate) fn free_blocks(&self, inode: &DiskInode) -> Result<()> {
        for block_id in inode.blocks() {
            self.set(ResourceClass::Data, block_id.into(), false)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BlockId, DiskInodeKind};
    use crate::{FormatOptions, MemDisk};

    fn with_file() -> (PseudoFileSystem<MemDisk>, InodeId) {
        let fs =
            PseudoFileSystem::format(MemDisk::new(), 64 * 1024, &FormatOptions::default()).unwrap();
        let inode_id = fs.alloc(ResourceClass::Inode).unwrap();
        fs.write_inode(inode_id, &DiskInode::new(inode_id, DiskInodeKind::File))
            .unwrap();
        (fs, inode_id)
    }

    #[test]
    fn partial_block_is_padded() {
        let (fs, inode_id) = with_file();
        let inode = fs.write_new(inode_id, &[7; 1500]).unwrap();
        assert_eq!(inode.size, 1500);
        assert_eq!(
            inode.blocks().collect::<Vec<_>>(),
            vec![BlockId::from(1), BlockId::from(2)]
        );

        let mut block: DataBlock = [0xff; BLOCK_SIZE];
        fs.read_block(BlockId::from(2), &mut block).unwrap();
        assert!(block[..476].iter().all(|&c| c == 7));
        assert!(block[476..].iter().all(|&c| c == 0));

        let stored = fs.read_inode(inode_id).unwrap();
        assert_eq!(fs.read_content(&stored).unwrap(), vec![7; 1500]);
    }

    #[test]
    fn empty_content_takes_no_block() {
        let (fs, inode_id) = with_file();
        let inode = fs.write_new(inode_id, b"").unwrap();
        assert_eq!(inode.blocks().count(), 0);
        assert_eq!(fs.read_content(&inode).unwrap(), b"");
        assert_eq!(fs.find_free(ResourceClass::Data).unwrap(), Some(1));
    }

    #[test]
    fn over_capacity_allocates_nothing() {
        let (fs, inode_id) = with_file();
        assert!(fs.write_new(inode_id, &[1; MAX_FILE_SIZE]).is_ok());
        let used = fs.count_used(ResourceClass::Data).unwrap();

        let err = fs.write_new(inode_id, &[1; MAX_FILE_SIZE + 1]).unwrap_err();
        assert!(matches!(err, FsError::TooLarge(5121)));
        assert_eq!(fs.count_used(ResourceClass::Data).unwrap(), used);
    }

    #[test]
    fn exhaustion_leaves_no_orphans() {
        let (fs, inode_id) = with_file();
        // leave exactly two free blocks
        let capacity = fs.geometry().data_block_count();
        for _ in 1..capacity - 2 {
            fs.alloc(ResourceClass::Data).unwrap();
        }
        let used = fs.count_used(ResourceClass::Data).unwrap();

        let err = fs.write_new(inode_id, &[1; 3 * BLOCK_SIZE]).unwrap_err();
        assert!(matches!(
            err,
            FsError::ResourceExhausted(ResourceClass::Data)
        ));
        assert_eq!(fs.count_used(ResourceClass::Data).unwrap(), used);
        assert_eq!(fs.read_inode(inode_id).unwrap().size, 0);
    }
}

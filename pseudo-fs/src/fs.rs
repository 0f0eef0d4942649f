//! # Block and inode manager layer
//!
//! Builds the image layout and hands out inodes and data blocks from it.

use std::path::Path;

use log::{debug, info, warn};

use crate::layout::*;
use crate::DataBlock;
use crate::{Disk, FsError, ImageFile, InodeId, Result, BLOCK_SIZE, ROOT_INODE};

/// Identity written into the superblock at format time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Author signature, at most 8 bytes are kept
    pub signature: String,
    /// Volume label, at most 250 bytes are kept
    pub label: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            signature: String::from("r-login"),
            label: String::from("pseudo-fs volume"),
        }
    }
}

/// Handle to one filesystem image.
///
/// Only the geometry is kept in memory; every inode, bitmap byte and
/// directory record is read from the disk when it is needed.
#[derive(Debug)]
pub struct PseudoFileSystem<D> {
    disk: D,
    geometry: Geometry,
}

impl<D: Disk> PseudoFileSystem<D> {
    /// Lay out an empty filesystem of `disk_size` bytes over `disk`,
    /// destroying whatever it held before.
    pub fn format(disk: D, disk_size: i64, options: &FormatOptions) -> Result<Self> {
        let geometry = Geometry::compute(disk_size)?;

        disk.set_len(0)?;
        disk.set_len(geometry.disk_size)?;

        let mut super_block = SuperBlock::new(&options.signature, &options.label);
        super_block.disk_size = geometry.disk_size as i32;
        super_block.block_count = geometry.block_count as i32;
        super_block.inode_bitmap_start = geometry.inode_bitmap_start as i32;
        super_block.data_bitmap_start = geometry.data_bitmap_start as i32;
        super_block.inode_table_start = geometry.inode_table_start as i32;
        super_block.data_start = geometry.data_start as i32;
        disk.write_at(0, &super_block.to_bytes()?)?;

        let fs = Self { disk, geometry };

        // root inode and its block are taken before anything else
        fs.set(ResourceClass::Inode, ROOT_INODE, true)?;
        fs.set(ResourceClass::Data, 0, true)?;

        let root_block = BlockId::from(0);
        let mut root = DiskInode::new(ROOT_INODE, DiskInodeKind::Directory);
        root.size = BLOCK_SIZE as u32;
        root.direct[0] = Some(root_block);

        let mut table = root.to_bytes()?;
        let empty = DiskInode::default().to_bytes()?;
        for _ in 1..geometry.inode_count() {
            table.extend_from_slice(&empty);
        }
        fs.disk.write_at(geometry.inode_table_start, &table)?;

        fs.init_directory(root_block, ROOT_INODE, ROOT_INODE)?;
        fs.disk.sync()?;

        info!(
            "formatted {} bytes: {} inodes, {} data blocks",
            geometry.disk_size,
            geometry.inode_count(),
            geometry.data_block_count()
        );
        Ok(fs)
    }

    /// Load an image formatted earlier.
    pub fn open(disk: D) -> Result<Self> {
        let mut bytes = [0u8; SuperBlock::SIZE];
        disk.read_at(0, &mut bytes).map_err(|_| FsError::InvalidImage)?;
        let super_block = SuperBlock::from_bytes(&bytes)?;
        let geometry = Geometry::from_super_block(&super_block)?;

        if disk.size()? < geometry.disk_size {
            return Err(FsError::InvalidImage);
        }

        debug!("opened image of {} bytes", geometry.disk_size);
        Ok(Self { disk, geometry })
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn into_disk(self) -> D {
        self.disk
    }

    pub fn super_block(&self) -> Result<SuperBlock> {
        let mut bytes = [0u8; SuperBlock::SIZE];
        self.disk.read_at(0, &mut bytes)?;
        SuperBlock::from_bytes(&bytes)
    }

    pub fn sync(&self) -> Result<()> {
        Ok(self.disk.sync()?)
    }

    /// Lowest free index of `class`, if any.
    #[inline]
    pub fn find_free(&self, class: ResourceClass) -> Result<Option<u32>> {
        self.geometry.bitmap(class).find_free(&self.disk)
    }

    #[inline]
    pub fn set(&self, class: ResourceClass, index: u32, used: bool) -> Result<()> {
        self.geometry.bitmap(class).set(&self.disk, index, used)
    }

    #[inline]
    pub fn is_set(&self, class: ResourceClass, index: u32) -> Result<bool> {
        self.geometry.bitmap(class).is_set(&self.disk, index)
    }

    pub fn count_used(&self, class: ResourceClass) -> Result<u32> {
        self.geometry.bitmap(class).count_used(&self.disk)
    }

    /// Take the lowest free index of `class`.
    pub(crate) fn alloc(&self, class: ResourceClass) -> Result<u32> {
        let index = self
            .find_free(class)?
            .ok_or(FsError::ResourceExhausted(class))?;
        self.set(class, index, true)?;

        debug!("alloc {class} {index}");
        Ok(index)
    }

    /// Open a staging area for allocations of one composite operation.
    pub fn reserve(&self) -> Reservation<'_, D> {
        Reservation {
            fs: self,
            journal: Vec::new(),
        }
    }

    pub fn read_inode(&self, inode_id: InodeId) -> Result<DiskInode> {
        debug_assert!(inode_id < self.geometry.inode_count());
        let mut bytes = [0u8; DiskInode::SIZE];
        self.disk
            .read_at(self.geometry.inode_offset(inode_id), &mut bytes)?;
        DiskInode::from_bytes(&bytes)
    }

    pub fn write_inode(&self, inode_id: InodeId, inode: &DiskInode) -> Result<()> {
        debug_assert!(inode_id < self.geometry.inode_count());
        self.disk
            .write_at(self.geometry.inode_offset(inode_id), &inode.to_bytes()?)?;
        Ok(())
    }

    pub fn root_inode(&self) -> Result<DiskInode> {
        self.read_inode(ROOT_INODE)
    }

    pub(crate) fn read_block(&self, block_id: BlockId, buf: &mut DataBlock) -> Result<()> {
        Ok(self.disk.read_at(self.geometry.block_offset(block_id), buf)?)
    }

    pub(crate) fn write_block(&self, block_id: BlockId, buf: &DataBlock) -> Result<()> {
        Ok(self.disk.write_at(self.geometry.block_offset(block_id), buf)?)
    }

    /// Write `bytes` at `offset` inside one block.
    pub(crate) fn write_in_block(
        &self,
        block_id: BlockId,
        offset: usize,
        bytes: &[u8],
    ) -> Result<()> {
        debug_assert!(offset + bytes.len() <= BLOCK_SIZE);
        let at = self.geometry.block_offset(block_id) + offset as u64;
        Ok(self.disk.write_at(at, bytes)?)
    }
}

/// Create the image file at `path` and format it with a size such as `"1MB"`.
pub fn format_image(
    path: impl AsRef<Path>,
    size_spec: &str,
    options: &FormatOptions,
) -> Result<PseudoFileSystem<ImageFile>> {
    // geometry is checked before the host file is touched
    let disk_size = parse_size(size_spec);
    Geometry::compute(disk_size)?;

    let image = ImageFile::create(path)?;
    PseudoFileSystem::format(image, disk_size, options)
}

pub fn open_image(path: impl AsRef<Path>) -> Result<PseudoFileSystem<ImageFile>> {
    PseudoFileSystem::open(ImageFile::open(path)?)
}

#[derive(Debug, Clone, Copy)]
enum Staged {
    Taken(ResourceClass, u32),
    Released(ResourceClass, u32),
}

/// Bitmap changes made by a composite operation that is not finished yet.
///
/// Dropping a reservation without [`Reservation::commit`] undoes every
/// change it recorded, newest first.
#[must_use]
pub struct Reservation<'a, D: Disk> {
    fs: &'a PseudoFileSystem<D>,
    journal: Vec<Staged>,
}

impl<D: Disk> Reservation<'_, D> {
    pub fn inode(&mut self) -> Result<InodeId> {
        self.take(ResourceClass::Inode)
    }

    pub fn block(&mut self) -> Result<BlockId> {
        self.take(ResourceClass::Data).map(BlockId::from)
    }

    /// Free `index` now, marking it used again if the operation fails.
    pub fn release(&mut self, class: ResourceClass, index: u32) -> Result<()> {
        self.fs.set(class, index, false)?;
        self.journal.push(Staged::Released(class, index));
        Ok(())
    }

    /// Keep every change made through this reservation.
    pub fn commit(mut self) {
        self.journal.clear();
    }

    fn take(&mut self, class: ResourceClass) -> Result<u32> {
        let index = self.fs.alloc(class)?;
        self.journal.push(Staged::Taken(class, index));
        Ok(index)
    }
}

impl<D: Disk> Drop for Reservation<'_, D> {
    fn drop(&mut self) {
        for staged in self.journal.drain(..).rev() {
            let (class, index, used) = match staged {
                Staged::Taken(class, index) => (class, index, false),
                Staged::Released(class, index) => (class, index, true),
            };
            match self.fs.set(class, index, used) {
                Ok(()) => warn!("rolled back {class} {index}"),
                Err(err) => warn!("failed to roll back {class} {index}: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemDisk;

    fn formatted() -> PseudoFileSystem<MemDisk> {
        PseudoFileSystem::format(MemDisk::new(), 64 * 1024, &FormatOptions::default()).unwrap()
    }

    #[test]
    fn format_reserves_root() {
        let fs = formatted();
        assert!(fs.is_set(ResourceClass::Inode, 0).unwrap());
        assert!(fs.is_set(ResourceClass::Data, 0).unwrap());
        assert_eq!(fs.find_free(ResourceClass::Inode).unwrap(), Some(1));
        assert_eq!(fs.find_free(ResourceClass::Data).unwrap(), Some(1));

        let root = fs.root_inode().unwrap();
        assert!(root.is_dir());
        assert_eq!(root.links, 1);
        assert_eq!(root.size, 1024);
        assert_eq!(root.blocks().collect::<Vec<_>>(), vec![BlockId::from(0)]);
        assert_eq!(fs.disk().size().unwrap(), 64 * 1024);
    }

    #[test]
    fn reopen_reads_same_geometry() {
        let fs = formatted();
        let geometry = *fs.geometry();
        let fs = PseudoFileSystem::open(fs.into_disk()).unwrap();
        assert_eq!(fs.geometry(), &geometry);
        assert_eq!(fs.super_block().unwrap().signature(), "r-login");
    }

    #[test]
    fn open_rejects_garbage() {
        let disk = MemDisk::new();
        disk.set_len(4096).unwrap();
        assert!(matches!(
            PseudoFileSystem::open(disk),
            Err(FsError::InvalidImage)
        ));
        assert!(matches!(
            PseudoFileSystem::open(MemDisk::new()),
            Err(FsError::InvalidImage)
        ));
    }

    #[test]
    fn uncommitted_reservation_rolls_back() {
        let fs = formatted();
        {
            let mut reservation = fs.reserve();
            assert_eq!(reservation.inode().unwrap(), 1);
            assert_eq!(reservation.block().unwrap(), BlockId::from(1));
            reservation.release(ResourceClass::Data, 0).unwrap();
            assert!(!fs.is_set(ResourceClass::Data, 0).unwrap());
        }
        assert!(!fs.is_set(ResourceClass::Inode, 1).unwrap());
        assert!(!fs.is_set(ResourceClass::Data, 1).unwrap());
        assert!(fs.is_set(ResourceClass::Data, 0).unwrap());

        let mut reservation = fs.reserve();
        reservation.inode().unwrap();
        reservation.commit();
        assert!(fs.is_set(ResourceClass::Inode, 1).unwrap());
    }

    #[test]
    fn exhaustion_is_reported() {
        let fs = formatted();
        let capacity = fs.geometry().data_block_count();
        for _ in 1..capacity {
            fs.alloc(ResourceClass::Data).unwrap();
        }
        assert!(matches!(
            fs.alloc(ResourceClass::Data),
            Err(FsError::ResourceExhausted(ResourceClass::Data))
        ));
    }
}

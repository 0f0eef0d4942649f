use super::{Bitmap, BlockId, DiskInode, ResourceClass, SuperBlock};
use crate::{FsError, InodeId, Result, BLOCK_SIZE};

/// Byte offsets of every region of an image, derived from its size alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub disk_size: u64,
    /// Number of 1024-byte blocks the disk size covers; both bitmaps are sized by it.
    pub block_count: u32,
    pub inode_bitmap_start: u64,
    pub data_bitmap_start: u64,
    pub inode_table_start: u64,
    pub data_start: u64,
}

impl Geometry {
    pub fn compute(disk_size: i64) -> Result<Self> {
        if disk_size > i32::MAX as i64 {
            return Err(FsError::DiskTooLarge(disk_size));
        }
        if disk_size <= 0 {
            return Err(FsError::DiskTooSmall(disk_size));
        }

        let block_count = (disk_size as u64 / BLOCK_SIZE as u64) as u32;
        let bitmap_bytes = Bitmap::bytes_for(block_count) as u64;

        let inode_bitmap_start = SuperBlock::SIZE as u64;
        let data_bitmap_start = inode_bitmap_start + bitmap_bytes;
        let inode_table_start = data_bitmap_start + bitmap_bytes;
        let data_start = inode_table_start + block_count as u64 * DiskInode::SIZE as u64;

        let disk_size = disk_size as u64;
        // at least the root directory block must fit behind the metadata
        if data_start + BLOCK_SIZE as u64 > disk_size {
            return Err(FsError::DiskTooSmall(disk_size as i64));
        }

        Ok(Self {
            disk_size,
            block_count,
            inode_bitmap_start,
            data_bitmap_start,
            inode_table_start,
            data_start,
        })
    }

    /// Geometry recorded in a superblock, rejected unless it is exactly
    /// what formatting an image of that size produces.
    pub fn from_super_block(super_block: &SuperBlock) -> Result<Self> {
        if !super_block.is_valid() {
            return Err(FsError::InvalidImage);
        }
        let geometry =
            Self::compute(super_block.disk_size as i64).map_err(|_| FsError::InvalidImage)?;
        if geometry.block_count != super_block.block_count as u32
            || geometry.inode_bitmap_start != super_block.inode_bitmap_start as u64
            || geometry.data_bitmap_start != super_block.data_bitmap_start as u64
            || geometry.inode_table_start != super_block.inode_table_start as u64
            || geometry.data_start != super_block.data_start as u64
        {
            return Err(FsError::InvalidImage);
        }

        Ok(geometry)
    }

    #[inline]
    pub fn inode_count(&self) -> u32 {
        self.block_count
    }

    /// Blocks that actually fit between the data start and the end of the image.
    pub fn data_block_count(&self) -> u32 {
        let fitting = (self.disk_size - self.data_start) / BLOCK_SIZE as u64;
        self.block_count.min(fitting as u32)
    }

    pub fn bitmap(&self, class: ResourceClass) -> Bitmap {
        match class {
            ResourceClass::Inode => Bitmap::new(self.inode_bitmap_start, self.inode_count()),
            ResourceClass::Data => Bitmap::new(self.data_bitmap_start, self.data_block_count()),
        }
    }

    #[inline]
    pub fn inode_offset(&self, inode_id: InodeId) -> u64 {
        self.inode_table_start + inode_id as u64 * DiskInode::SIZE as u64
    }

    #[inline]
    pub fn block_offset(&self, block_id: BlockId) -> u64 {
        self.data_start + u64::from(u32::from(block_id)) * BLOCK_SIZE as u64
    }
}

/// Parse a size such as `"1MB"`, `"100KB"` or `"4096"` into bytes.
///
/// The leading integer is read like `strtol` (no digits means 0) and is
/// returned untouched when not positive. A "KB"/"kB" anywhere, or a
/// trailing "kb" in any case, scales by 1024; otherwise an "MB" anywhere,
/// or a trailing "mb" in any case, scales by 1024².
pub fn parse_size(spec: &str) -> i64 {
    let digits = spec.trim_start();
    let (negative, digits) = match digits.as_bytes().first() {
        Some(b'-') => (true, &digits[1..]),
        Some(b'+') => (false, &digits[1..]),
        _ => (false, digits),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add((digit - b'0') as i64)
        });
    let size = if negative { -magnitude } else { magnitude };
    if size <= 0 {
        return size;
    }

    let ends_with_ci = |suffix: &str| {
        spec.len() >= suffix.len()
            && spec.as_bytes()[spec.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
    };

    if spec.contains("KB") || spec.contains("kB") || ends_with_ci("kb") {
        size.saturating_mul(1024)
    } else if spec.contains("MB") || ends_with_ci("mb") {
        size.saturating_mul(1024 * 1024)
    } else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_suffixes() {
        assert_eq!(parse_size("4096"), 4096);
        assert_eq!(parse_size("100KB"), 100 * 1024);
        assert_eq!(parse_size("100kB"), 100 * 1024);
        assert_eq!(parse_size("100kb"), 100 * 1024);
        assert_eq!(parse_size("1MB"), 1024 * 1024);
        assert_eq!(parse_size("10mb"), 10 * 1024 * 1024);
        assert_eq!(parse_size("10Mb"), 10 * 1024 * 1024);
        assert_eq!(parse_size("  7"), 7);
    }

    #[test]
    fn size_without_digits_or_sign() {
        assert_eq!(parse_size("MB"), 0);
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_size("-5KB"), -5);
        // a suffix in the middle only counts in its exact case
        assert_eq!(parse_size("5mbx"), 5);
    }

    #[test]
    fn one_megabyte_layout() {
        let geometry = Geometry::compute(1024 * 1024).unwrap();
        assert_eq!(geometry.block_count, 1024);
        assert_eq!(geometry.inode_bitmap_start, 288);
        assert_eq!(geometry.data_bitmap_start, 288 + 128);
        assert_eq!(geometry.inode_table_start, 288 + 256);
        assert_eq!(geometry.data_start, 288 + 256 + 1024 * 40);
        assert_eq!(geometry.inode_count(), 1024);
        assert_eq!(geometry.data_block_count(), 983);
        assert_eq!(geometry.bitmap(ResourceClass::Inode).capacity(), 1024);
        assert_eq!(geometry.bitmap(ResourceClass::Data).capacity(), 983);
        assert_eq!(geometry.block_offset(BlockId::from(2)), geometry.data_start + 2048);
        assert_eq!(geometry.inode_offset(3), geometry.inode_table_start + 120);
    }

    #[test]
    fn too_small_and_too_large() {
        assert!(matches!(Geometry::compute(0), Err(FsError::DiskTooSmall(0))));
        assert!(matches!(Geometry::compute(1000), Err(FsError::DiskTooSmall(_))));
        // 2 blocks: 288 + 1 + 1 + 80 = 370, one data block fits
        assert!(Geometry::compute(2048).is_ok());
        assert!(matches!(
            Geometry::compute(i32::MAX as i64 + 1),
            Err(FsError::DiskTooLarge(_))
        ));
    }
}

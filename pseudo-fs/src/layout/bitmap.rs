use core::fmt;

use crate::{Disk, Result};

/// The two kinds of resources tracked by a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Inode,
    Data,
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceClass::Inode => f.write_str("inode"),
            ResourceClass::Data => f.write_str("data block"),
        }
    }
}

/// A bitmap region recording which resources of one class are in use.
///
/// Bit `k` of byte `i` stands for resource `i * 8 + k`; a set bit means used.
#[derive(Debug, Clone, Copy)]
pub struct Bitmap {
    /// Byte offset of the region in the image
    start: u64,
    /// Number of resources the bitmap may hand out
    capacity: u32,
}

impl Bitmap {
    #[inline]
    pub fn new(start: u64, capacity: u32) -> Self {
        Self { start, capacity }
    }

    /// Bytes needed to hold `count` bits.
    #[inline]
    pub fn bytes_for(count: u32) -> usize {
        (count as usize).div_ceil(8)
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Lowest free index, or none when every bit within capacity is set.
    pub fn find_free(&self, disk: &impl Disk) -> Result<Option<u32>> {
        let bytes = self.load(disk)?;

        let free = bytes
            .iter()
            .enumerate()
            .filter(|&(_, &byte)| byte != u8::MAX)
            .map(|(byte_index, &byte)| byte_index as u32 * 8 + byte.trailing_ones())
            .find(|&index| index < self.capacity);

        Ok(free)
    }

    /// Mark `index` used or free with a read-modify-write of its byte.
    pub fn set(&self, disk: &impl Disk, index: u32, used: bool) -> Result<()> {
        debug_assert!(index < self.capacity, "bit {index} out of {}", self.capacity);
        let offset = self.start + (index / 8) as u64;
        let mask = 1u8 << (index % 8);

        let mut byte = [0u8];
        disk.read_at(offset, &mut byte)?;
        if used {
            byte[0] |= mask;
        } else {
            byte[0] &= !mask;
        }
        disk.write_at(offset, &byte)?;

        Ok(())
    }

    pub fn is_set(&self, disk: &impl Disk, index: u32) -> Result<bool> {
        let mut byte = [0u8];
        disk.read_at(self.start + (index / 8) as u64, &mut byte)?;
        Ok(byte[0] & (1 << (index % 8)) != 0)
    }

    /// Number of set bits within capacity.
    pub fn count_used(&self, disk: &impl Disk) -> Result<u32> {
        let bytes = self.load(disk)?;
        let used = (0..self.capacity)
            .filter(|&index| bytes[(index / 8) as usize] & (1 << (index % 8)) != 0)
            .count();

        Ok(used as u32)
    }

    fn load(&self, disk: &impl Disk) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; Self::bytes_for(self.capacity)];
        disk.read_at(self.start, &mut bytes)?;
        Ok(bytes)
    }
}

use binrw::binrw;

use super::{decode, encode};
use crate::{Result, BLOCK_SIZE};

const SIGNATURE_LEN: usize = 9;
const LABEL_LEN: usize = 251;

/// Superblock:
/// - identifies the volume (signature and label);
/// - locates the other contiguous regions.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// Author signature, NUL-terminated
    signature: [u8; SIGNATURE_LEN],
    /// Free-text volume label, NUL-terminated
    label: [u8; LABEL_LEN],
    pub disk_size: i32,
    pub block_size: i32,
    pub block_count: i32,
    pub inode_bitmap_start: i32,
    pub data_bitmap_start: i32,
    pub inode_table_start: i32,
    pub data_start: i32,
}

impl SuperBlock {
    pub const SIZE: usize = 288;

    pub fn new(signature: &str, label: &str) -> Self {
        Self {
            signature: nul_padded(signature),
            label: nul_padded(label),
            disk_size: 0,
            block_size: BLOCK_SIZE as i32,
            block_count: 0,
            inode_bitmap_start: 0,
            data_bitmap_start: 0,
            inode_table_start: 0,
            data_start: 0,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.block_size == BLOCK_SIZE as i32
            && self.inode_table_start < self.data_start
            && self.data_start < self.disk_size
    }

    pub fn signature(&self) -> String {
        until_nul(&self.signature)
    }

    pub fn label(&self) -> String {
        until_nul(&self.label)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }
}

/// Copy `text` into a fixed field, truncated so that one NUL always remains.
fn nul_padded<const N: usize>(text: &str) -> [u8; N] {
    let mut field = [0; N];
    let len = text.len().min(N - 1);
    field[..len].copy_from_slice(&text.as_bytes()[..len]);
    field
}

fn until_nul(field: &[u8]) -> String {
    let len = field.iter().position(|&c| c == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

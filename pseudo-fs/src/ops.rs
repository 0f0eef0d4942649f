//! # Operation layer
//!
//! User-facing actions built from the primitives below. Each one checks
//! every precondition first, stages its allocations in a [`Reservation`]
//! and links the result into the tree last, so a failure leaves no
//! allocated-but-unreachable inode or block behind.
//!
//! [`Reservation`]: crate::Reservation

use log::{info, warn};

use crate::layout::{DirEntry, DiskInode, DiskInodeKind, ResourceClass};
use crate::stat::StatKind;
use crate::{Disk, FsError, InodeId, PseudoFileSystem, Result};
use crate::{BLOCK_SIZE, MAX_FILE_SIZE, ROOT_INODE};

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirItem {
    pub name: String,
    pub inode: InodeId,
    pub kind: StatKind,
}

impl DirItem {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == StatKind::DIR
    }
}

/// An existing entry together with the directory holding it.
struct Located<'p> {
    parent_id: InodeId,
    name: &'p str,
    inode_id: InodeId,
    inode: DiskInode,
}

impl<D: Disk> PseudoFileSystem<D> {
    /// Create an empty directory at `path`.
    pub fn make_directory(&self, path: &str) -> Result<InodeId> {
        let (parent_id, name) = self.vacant(path)?;

        let mut reservation = self.reserve();
        let inode_id = reservation.inode()?;
        let block_id = reservation.block()?;

        self.init_directory(block_id, inode_id, parent_id)?;
        let mut inode = DiskInode::new(inode_id, DiskInodeKind::Directory);
        inode.size = BLOCK_SIZE as u32;
        inode.direct[0] = Some(block_id);
        self.write_inode(inode_id, &inode)?;

        self.insert_staged(&mut reservation, parent_id, name, inode_id)?;
        reservation.commit();

        info!("mkdir {path:?}: inode {inode_id}");
        Ok(inode_id)
    }

    /// Remove the file at `path`.
    pub fn remove_file(&self, path: &str) -> Result<()> {
        let located = self.locate(path)?;
        if located.inode.is_dir() {
            return Err(FsError::IsADirectory);
        }

        self.unlink(located)?;
        info!("rm {path:?}");
        Ok(())
    }

    /// Remove the directory at `path`, which must hold only "." and "..".
    pub fn remove_directory(&self, path: &str) -> Result<()> {
        let located = self.locate(path)?;
        if !located.inode.is_dir() {
            return Err(FsError::NotADirectory);
        }
        if !self.is_empty(located.inode_id)? {
            return Err(FsError::DirectoryNotEmpty);
        }

        self.unlink(located)?;
        info!("rmdir {path:?}");
        Ok(())
    }

    /// Copy the file at `src` to the new path `dst`.
    pub fn copy(&self, src: &str, dst: &str) -> Result<InodeId> {
        let content = self.read_file(src)?;
        let inode_id = self.create_file(dst, &content)?;

        info!("cp {src:?} {dst:?}: inode {inode_id}");
        Ok(inode_id)
    }

    /// Move the entry at `src` (file or directory) to the new path `dst`.
    ///
    /// The destination is linked and a moved directory's ".." rewritten
    /// before the source is unlinked, so the inode stays reachable whatever
    /// step fails.
    pub fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let located = self.locate(src)?;
        let (dst_parent_id, dst_name) = self.vacant(dst)?;

        let moves_dir = located.inode.is_dir() && dst_parent_id != located.parent_id;
        if moves_dir && self.is_within(dst_parent_id, located.inode_id)? {
            return Err(FsError::InvalidPath(dst.to_owned()));
        }

        let dst_parent = self.read_inode(dst_parent_id)?;
        let mut reservation = self.reserve();
        self.insert_staged(&mut reservation, dst_parent_id, dst_name, located.inode_id)?;

        let moved = if moves_dir {
            self.set_parent(located.inode_id, dst_parent_id)
        } else {
            Ok(())
        };
        if let Err(err) = moved.and_then(|()| self.remove(located.parent_id, located.name)) {
            warn!("mv {src:?} {dst:?}: {err}, undoing the new link");

            // the staged blocks may only be freed once nothing points at them
            let unlinked = self
                .remove(dst_parent_id, dst_name)
                .and_then(|_| self.write_inode(dst_parent_id, &dst_parent));
            if let Err(undo_err) = unlinked {
                warn!("mv {src:?} {dst:?}: undo failed, keeping staged blocks: {undo_err}");
                reservation.commit();
                return Err(err);
            }
            if moves_dir {
                if let Err(undo_err) = self.set_parent(located.inode_id, located.parent_id) {
                    warn!("mv {src:?} {dst:?}: restoring \"..\" failed: {undo_err}");
                }
            }
            return Err(err);
        }
        reservation.commit();

        info!("mv {src:?} {dst:?}");
        Ok(())
    }

    /// Store the contents of `first` followed by `second` in the new file `dst`.
    pub fn concatenate(&self, first: &str, second: &str, dst: &str) -> Result<InodeId> {
        let content = joined(&self.read_file(first)?, &self.read_file(second)?)?;
        let inode_id = self.create_file(dst, &content)?;

        info!("xcp {first:?} {second:?} {dst:?}: {} bytes", content.len());
        Ok(inode_id)
    }

    /// Append the contents of `src` to the file at `dst`.
    pub fn append(&self, dst: &str, src: &str) -> Result<()> {
        let dst_id = self.resolve(dst)?;
        let inode = self.read_inode(dst_id)?;
        if inode.is_dir() {
            return Err(FsError::IsADirectory);
        }
        let content = joined(&self.read_content(&inode)?, &self.read_file(src)?)?;

        let mut reservation = self.reserve();
        for block_id in inode.blocks() {
            reservation.release(ResourceClass::Data, block_id.into())?;
        }
        self.write_staged(&mut reservation, dst_id, &content)?;
        reservation.commit();

        info!("add {dst:?} {src:?}: {} bytes", content.len());
        Ok(())
    }

    /// Create the file `path` holding `bytes`, typically read from the host.
    pub fn import(&self, path: &str, bytes: &[u8]) -> Result<InodeId> {
        let inode_id = self.create_file(path, bytes)?;

        info!("imported {} bytes to {path:?}: inode {inode_id}", bytes.len());
        Ok(inode_id)
    }

    /// Whole content of the file at `path`.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let inode = self.read_inode(self.resolve(path)?)?;
        if inode.is_dir() {
            return Err(FsError::IsADirectory);
        }
        self.read_content(&inode)
    }

    /// Entries of the directory at `path`, without "." and "..".
    pub fn list(&self, path: &str) -> Result<Vec<DirItem>> {
        let dir_id = self.resolve(path)?;
        self.entries(dir_id)?
            .into_iter()
            .filter(|entry| !entry.is_dot())
            .map(|entry| -> Result<DirItem> {
                let inode = self.read_inode(entry.inode_id())?;
                Ok(DirItem {
                    name: entry.name().into_owned(),
                    inode: entry.inode_id(),
                    kind: StatKind::of(&inode),
                })
            })
            .collect()
    }
}

impl<D: Disk> PseudoFileSystem<D> {
    fn create_file(&self, path: &str, bytes: &[u8]) -> Result<InodeId> {
        if bytes.len() > MAX_FILE_SIZE {
            return Err(FsError::TooLarge(bytes.len()));
        }
        let (parent_id, name) = self.vacant(path)?;

        let mut reservation = self.reserve();
        let inode_id = reservation.inode()?;
        self.write_inode(inode_id, &DiskInode::new(inode_id, DiskInodeKind::File))?;
        self.write_staged(&mut reservation, inode_id, bytes)?;
        self.insert_staged(&mut reservation, parent_id, name, inode_id)?;
        reservation.commit();

        Ok(inode_id)
    }

    /// Parent directory and name for a new entry at `path`.
    fn vacant<'p>(&self, path: &'p str) -> Result<(InodeId, &'p str)> {
        let (parent_id, name) = self.resolve_parent(path)?;
        DirEntry::check_name(name)?;
        if self.find(parent_id, name)?.is_some() {
            return Err(FsError::AlreadyExists);
        }

        Ok((parent_id, name))
    }

    /// The existing entry named by `path`; "." and ".." cannot be named last.
    fn locate<'p>(&self, path: &'p str) -> Result<Located<'p>> {
        let (parent_id, name) = self.resolve_parent(path)?;
        if name == "." || name == ".." {
            return Err(FsError::InvalidPath(path.to_owned()));
        }
        let inode_id = self.find(parent_id, name)?.ok_or(FsError::NotFound)?;
        let inode = self.read_inode(inode_id)?;

        Ok(Located {
            parent_id,
            name,
            inode_id,
            inode,
        })
    }

    /// Drop the entry from its parent and free the inode once unreferenced.
    fn unlink(&self, located: Located<'_>) -> Result<()> {
        let Located {
            parent_id,
            name,
            inode_id,
            mut inode,
        } = located;
        self.remove(parent_id, name)?;

        inode.links = inode.links.saturating_sub(1);
        if inode.links > 0 {
            return self.write_inode(inode_id, &inode);
        }
        self.free_blocks(&inode)?;
        self.set(ResourceClass::Inode, inode_id, false)
    }

    /// Whether `dir_id` is `ancestor` or lies below it.
    fn is_within(&self, dir_id: InodeId, ancestor: InodeId) -> Result<bool> {
        let mut current = dir_id;
        for _ in 0..=self.geometry().inode_count() {
            if current == ancestor {
                return Ok(true);
            }
            if current == ROOT_INODE {
                return Ok(false);
            }
            current = self.find(current, "..")?.ok_or(FsError::NotFound)?;
        }

        Err(FsError::InvalidImage)
    }
}

/// `first` followed by `second`, if the result still fits in one file.
fn joined(first: &[u8], second: &[u8]) -> Result<Vec<u8>> {
    let len = first.len() + second.len();
    if len > MAX_FILE_SIZE {
        return Err(FsError::TooLarge(len));
    }
    Ok([first, second].concat())
}

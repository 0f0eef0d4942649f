#[cfg(test)]
mod tests;

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use pseudo_fs::{Disk, DirItem, FsError, FsStat, InodeId, PseudoFileSystem, Result, Stat};

/// What a command expects to find at the path it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// An existing file or directory to act on
    File,
    /// A directory to list or to create something in
    Path,
    /// Files whose contents are joined
    Content,
}

/// One-line status the tool prints for `err`.
pub fn status_token(err: &FsError, lookup: Lookup) -> &'static str {
    match err {
        FsError::NotFound if lookup != Lookup::Path => "FILE NOT FOUND",
        FsError::NotFound | FsError::NotADirectory => "PATH NOT FOUND",
        FsError::AlreadyExists => "EXIST",
        // rm, cp, cat and outcp treat a directory as a missing file
        FsError::IsADirectory if lookup == Lookup::Content => "IS DIRECTORY",
        FsError::IsADirectory => "FILE NOT FOUND",
        FsError::DirectoryNotEmpty => "NOT EMPTY",
        FsError::ResourceExhausted(_) | FsError::DirectoryFull => "NO SPACE",
        FsError::TooLarge(_) => "TOO BIG",
        FsError::InvalidName(_) => "INVALID NAME",
        FsError::InvalidPath(_) => "INVALID PATH",
        FsError::DiskTooSmall(_) | FsError::DiskTooLarge(_) => "CANNOT CREATE FILE",
        FsError::InvalidImage => "INVALID IMAGE",
        FsError::Io(err) if err.kind() == io::ErrorKind::NotFound => "FILE NOT FOUND",
        FsError::Io(_) | FsError::Codec(_) => "IO ERROR",
    }
}

/// Copy the host file `host` into the image as `path`.
pub fn import_host<D: Disk>(
    fs: &PseudoFileSystem<D>,
    host: impl AsRef<Path>,
    path: &str,
) -> Result<InodeId> {
    let bytes = fs::read(host)?;
    fs.import(path, &bytes)
}

/// Copy the image file `path` out to the host file `host`.
pub fn export_host<D: Disk>(
    fs: &PseudoFileSystem<D>,
    path: &str,
    host: impl AsRef<Path>,
) -> Result<()> {
    let content = fs.read_file(path)?;
    fs::write(host, content)?;
    Ok(())
}

/// Import every regular file of the host directory `source` into the
/// image directory `dir`, in name order. Returns the imported names.
pub fn pack<D: Disk>(
    fs: &PseudoFileSystem<D>,
    source: impl AsRef<Path>,
    dir: &str,
) -> Result<Vec<String>> {
    let mut apps = fs::read_dir(source)?
        .filter_map(|entry| match entry {
            Ok(entry) if entry.path().is_file() => Some(Ok(entry)),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
        .map(|entry| {
            entry.map(|entry| {
                let name = entry.file_name().to_str().map(str::to_owned);
                (name, entry.path())
            })
        })
        .collect::<io::Result<Vec<_>>>()?;
    apps.sort();

    let mut packed = Vec::with_capacity(apps.len());
    for (name, host) in apps {
        let Some(app) = name else {
            log::warn!("skipping {host:?}: name is not UTF-8");
            continue;
        };
        log::info!("app={app:?}");

        import_host(fs, &host, &child(dir, &app))?;
        packed.push(app);
    }

    Ok(packed)
}

/// `ls` output: one `DIR: name` or `FILE: name` line per entry.
pub fn render_list(items: &[DirItem]) -> String {
    items.iter().fold(String::new(), |mut out, item| {
        let kind = if item.is_dir() { "DIR" } else { "FILE" };
        let _ = writeln!(out, "{kind}: {}", item.name);
        out
    })
}

/// `info` output for the entry called `name`.
pub fn render_info(name: &str, stat: &Stat) -> String {
    let direct = if stat.direct.is_empty() {
        String::from("-")
    } else {
        stat.direct
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let indirect = |slot: usize| {
        stat.indirect[slot].map_or(-1, |block_id| i64::from(u32::from(block_id)))
    };

    format!(
        "{name} - {} B - i-node {}\ndirect: {direct}\nindirect1: {}\nindirect2: {}\n",
        stat.size,
        stat.inode,
        indirect(0),
        indirect(1),
    )
}

/// `statfs` output.
pub fn render_statfs(stat: &FsStat) -> String {
    format!(
        "--- STATFS ---\n\
         Disk: {} B\n\
         Cluster: {} B\n\
         Inodes: {} used, {} free\n\
         Blocks: {} used, {} free\n\
         Directories: {}\n",
        stat.disk_size,
        stat.block_size,
        stat.inodes_used,
        stat.inodes_free,
        stat.blocks_used,
        stat.blocks_free,
        stat.directories,
    )
}

/// `name` inside the image directory `dir`.
pub fn child(dir: &str, name: &str) -> String {
    format!("{}/{name}", dir.trim_end_matches('/'))
}

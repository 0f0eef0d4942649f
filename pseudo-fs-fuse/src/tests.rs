use std::fs;

use pseudo_fs::{format_image, open_image, FormatOptions, FsError, ResourceClass};

use super::*;

#[test]
fn tokens() {
    assert_eq!(status_token(&FsError::NotFound, Lookup::File), "FILE NOT FOUND");
    assert_eq!(status_token(&FsError::NotFound, Lookup::Path), "PATH NOT FOUND");
    assert_eq!(status_token(&FsError::NotADirectory, Lookup::File), "PATH NOT FOUND");
    assert_eq!(status_token(&FsError::AlreadyExists, Lookup::Path), "EXIST");
    assert_eq!(status_token(&FsError::IsADirectory, Lookup::File), "FILE NOT FOUND");
    assert_eq!(status_token(&FsError::IsADirectory, Lookup::Content), "IS DIRECTORY");
    assert_eq!(status_token(&FsError::NotFound, Lookup::Content), "FILE NOT FOUND");
    assert_eq!(status_token(&FsError::DirectoryNotEmpty, Lookup::File), "NOT EMPTY");
    assert_eq!(
        status_token(&FsError::ResourceExhausted(ResourceClass::Inode), Lookup::Path),
        "NO SPACE"
    );
    assert_eq!(status_token(&FsError::DirectoryFull, Lookup::Path), "NO SPACE");
    assert_eq!(status_token(&FsError::TooLarge(6000), Lookup::File), "TOO BIG");
    assert_eq!(status_token(&FsError::DiskTooSmall(1), Lookup::Path), "CANNOT CREATE FILE");
    assert_eq!(status_token(&FsError::InvalidImage, Lookup::Path), "INVALID IMAGE");

    let missing = io::Error::from(io::ErrorKind::NotFound);
    assert_eq!(status_token(&FsError::Io(missing), Lookup::Path), "FILE NOT FOUND");
    let denied = io::Error::from(io::ErrorKind::PermissionDenied);
    assert_eq!(status_token(&FsError::Io(denied), Lookup::Path), "IO ERROR");
}

#[test]
fn host_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("fs.img");
    let host_in = dir.path().join("in.txt");
    let host_out = dir.path().join("out.txt");
    fs::write(&host_in, b"from the host").unwrap();

    let vfs = format_image(&image, "1MB", &FormatOptions::default()).unwrap();
    import_host(&vfs, &host_in, "/copy").unwrap();
    export_host(&vfs, "/copy", &host_out).unwrap();
    assert_eq!(fs::read(&host_out).unwrap(), b"from the host");

    assert!(matches!(
        import_host(&vfs, dir.path().join("absent"), "/x"),
        Err(FsError::Io(_))
    ));
    assert!(matches!(
        export_host(&vfs, "/absent", &host_out),
        Err(FsError::NotFound)
    ));
}

#[test]
fn pack_imports_regular_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("apps");
    fs::create_dir(&source).unwrap();
    fs::write(source.join("hello"), b"hello").unwrap();
    fs::write(source.join("cat"), b"meow").unwrap();
    fs::create_dir(source.join("nested")).unwrap();

    let image = dir.path().join("fs.img");
    {
        let vfs = format_image(&image, "1MB", &FormatOptions::default()).unwrap();
        vfs.make_directory("/bin").unwrap();
        let packed = pack(&vfs, &source, "/bin/").unwrap();
        assert_eq!(packed, vec!["cat", "hello"]);
    }

    let vfs = open_image(&image).unwrap();
    assert_eq!(vfs.read_file("/bin/hello").unwrap(), b"hello");
    assert_eq!(
        render_list(&vfs.list("/bin").unwrap()),
        "FILE: cat\nFILE: hello\n"
    );
}

#[test]
fn listing_and_info() {
    let dir = tempfile::tempdir().unwrap();
    let vfs = format_image(dir.path().join("fs.img"), "1MB", &FormatOptions::default()).unwrap();
    vfs.make_directory("/docs").unwrap();
    vfs.import("/a.txt", &[b'x'; 1500]).unwrap();
    vfs.import("/empty", b"").unwrap();

    assert_eq!(
        render_list(&vfs.list("/").unwrap()),
        "DIR: docs\nFILE: a.txt\nFILE: empty\n"
    );
    assert_eq!(
        render_info("a.txt", &vfs.stat("/a.txt").unwrap()),
        "a.txt - 1500 B - i-node 2\ndirect: 2, 3\nindirect1: -1\nindirect2: -1\n"
    );
    assert_eq!(
        render_info("empty", &vfs.stat("/empty").unwrap()),
        "empty - 0 B - i-node 3\ndirect: -\nindirect1: -1\nindirect2: -1\n"
    );
}

#[test]
fn statfs_report() {
    let dir = tempfile::tempdir().unwrap();
    let vfs = format_image(dir.path().join("fs.img"), "1MB", &FormatOptions::default()).unwrap();
    assert_eq!(
        render_statfs(&vfs.statfs().unwrap()),
        "--- STATFS ---\nDisk: 1048576 B\nCluster: 1024 B\n\
         Inodes: 1 used, 1023 free\nBlocks: 1 used, 982 free\nDirectories: 1\n"
    );
}

#[test]
fn child_paths() {
    assert_eq!(child("/", "a"), "/a");
    assert_eq!(child("/bin", "a"), "/bin/a");
    assert_eq!(child("/bin/", "a"), "/bin/a");
}

#[test]
fn directory_where_a_file_is_expected() {
    let dir = tempfile::tempdir().unwrap();
    let vfs = format_image(dir.path().join("fs.img"), "1MB", &FormatOptions::default()).unwrap();
    vfs.make_directory("/d").unwrap();
    vfs.import("/f", b"x").unwrap();

    let err = vfs.remove_file("/d").unwrap_err();
    assert_eq!(status_token(&err, Lookup::File), "FILE NOT FOUND");
    let err = vfs.copy("/d", "/g").unwrap_err();
    assert_eq!(status_token(&err, Lookup::File), "FILE NOT FOUND");
    let err = vfs.append("/f", "/d").unwrap_err();
    assert_eq!(status_token(&err, Lookup::Content), "IS DIRECTORY");
}

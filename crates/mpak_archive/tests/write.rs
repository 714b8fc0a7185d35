use miette::{IntoDiagnostic, Result};
use mpak_archive::{
    error::Error,
    fs::{export, import, Filesystem},
    write::PackageWriterOptions,
    Archive, Package,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};
use tracing_test::traced_test;
use walkdir::WalkDir;

fn create_tree(root: &Path) -> Result<()> {
    fs::create_dir_all(root.join("sub/deeper")).into_diagnostic()?;
    fs::create_dir_all(root.join("empty")).into_diagnostic()?;
    fs::write(root.join("a.txt"), b"hi\n").into_diagnostic()?;
    fs::write(root.join("zero"), b"").into_diagnostic()?;
    fs::write(root.join("sub/b.bin"), b"\xDE\xAD").into_diagnostic()?;
    fs::write(root.join("sub/deeper/c"), vec![7u8; 4096]).into_diagnostic()?;
    Ok(())
}

/// Every path below `root` relative to it, with file contents
fn snapshot(root: &Path) -> Result<Vec<(String, Option<Vec<u8>>)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.into_diagnostic()?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .into_diagnostic()?
            .to_string_lossy()
            .replace('\\', "/");

        let contents = if entry.file_type().is_file() {
            Some(fs::read(entry.path()).into_diagnostic()?)
        } else {
            None
        };
        entries.push((relative, contents));
    }
    Ok(entries)
}

#[instrument(skip_all)]
fn pack(source: &Path) -> Result<Package<'static>> {
    let package = import(&Filesystem::default(), source, PackageWriterOptions::default())?;
    info!(structure_size = package.structure_size(), "imported");
    Ok(package)
}

#[traced_test]
#[test]
fn filesystem_round_trip() -> Result<()> {
    let work = tempfile::tempdir().into_diagnostic()?;
    let source = work.path().join("tree");
    create_tree(&source)?;

    let archive_path = work.path().join("tree.mpak");
    pack(&source)?.save(&archive_path, false)?;

    let archive = Archive::load(&archive_path)?;
    let package = archive.package()?;
    assert_eq!(package.root().name(), "tree");
    assert_eq!(package.root().total_files(), 4);
    assert_eq!(package.data_size(), 3 + 2 + 4096);

    let out = work.path().join("out");
    fs::create_dir(&out).into_diagnostic()?;
    export(&package, &mut Filesystem::default(), &out)?;

    assert_eq!(snapshot(&out.join("tree"))?, snapshot(&source)?);

    Ok(())
}

#[traced_test]
#[test]
fn files_are_packed_before_folders() -> Result<()> {
    let work = tempfile::tempdir().into_diagnostic()?;
    let source = work.path().join("tree");
    create_tree(&source)?;

    let package = pack(&source)?;
    let root = package.root();

    let files: Vec<_> = root.files().iter().map(|f| f.name()).collect();
    let folders: Vec<_> = root.folders().iter().map(|f| f.name()).collect();
    assert_eq!(files, ["a.txt", "zero"]);
    assert_eq!(folders, ["empty", "sub"]);

    // Offsets follow the packing walk: root files, then sub, then sub/deeper
    assert_eq!(package.resolve("a.txt")?.as_file().map(|f| f.offset()), Some(0));
    assert_eq!(package.resolve("sub/b.bin")?.as_file().map(|f| f.offset()), Some(3));
    assert_eq!(package.resolve("sub/deeper/c")?.as_file().map(|f| f.offset()), Some(5));

    Ok(())
}

#[traced_test]
#[test]
fn import_is_deterministic() -> Result<()> {
    let work = tempfile::tempdir().into_diagnostic()?;
    let source = work.path().join("tree");
    create_tree(&source)?;

    assert_eq!(pack(&source)?.to_bytes()?, pack(&source)?.to_bytes()?);

    Ok(())
}

#[traced_test]
#[test]
fn save_does_not_clobber() -> Result<()> {
    let work = tempfile::tempdir().into_diagnostic()?;
    let source = work.path().join("tree");
    create_tree(&source)?;

    let archive_path = work.path().join("tree.mpak");
    fs::write(&archive_path, b"keep me").into_diagnostic()?;

    let package = pack(&source)?;
    assert!(matches!(
        package.save(&archive_path, false),
        Err(Error::PathIOError { .. })
    ));
    assert_eq!(fs::read(&archive_path).into_diagnostic()?, b"keep me");

    package.save(&archive_path, true)?;
    assert_eq!(Archive::load(&archive_path)?.package()?, package);

    Ok(())
}

#[traced_test]
#[test]
fn export_respects_overwrite() -> Result<()> {
    let work = tempfile::tempdir().into_diagnostic()?;
    let source = work.path().join("tree");
    create_tree(&source)?;
    let package = pack(&source)?;

    let out = work.path().join("out");
    fs::create_dir(&out).into_diagnostic()?;
    export(&package, &mut Filesystem::default(), &out)?;

    assert!(matches!(
        export(&package, &mut Filesystem::default(), &out),
        Err(Error::PathIOError { .. })
    ));

    fs::write(out.join("tree/a.txt"), b"changed").into_diagnostic()?;
    let mut overwrite = Filesystem::builder().overwrite(true).build();
    export(&package, &mut overwrite, &out)?;
    assert_eq!(fs::read(out.join("tree/a.txt")).into_diagnostic()?, b"hi\n");

    Ok(())
}

#[traced_test]
#[test]
fn export_creates_missing_destination() -> Result<()> {
    let work = tempfile::tempdir().into_diagnostic()?;
    let source = work.path().join("tree");
    create_tree(&source)?;
    let package = pack(&source)?;

    let out = work.path().join("not/there/yet");
    export(&package, &mut Filesystem::default(), &out)?;

    assert_eq!(snapshot(&out.join("tree"))?, snapshot(&source)?);

    Ok(())
}

#[test]
fn import_missing_directory_fails() {
    let work = tempfile::tempdir().unwrap();
    let result = import(
        &Filesystem::default(),
        work.path().join("missing"),
        PackageWriterOptions::default(),
    );

    assert!(matches!(result, Err(Error::PathIOError { .. })));
}

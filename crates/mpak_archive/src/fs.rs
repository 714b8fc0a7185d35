//! Building packages from directories and writing them back out
//!
//! The codec never touches the filesystem itself. Import reads through a
//! [`DirectorySource`] and export writes through a [`DirectorySink`]; [`Filesystem`]
//! implements both for the real filesystem.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use bon::Builder;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    package::Package,
    types::{Folder, MAX_DEPTH},
    write::{PackageWriter, PackageWriterOptions},
};

/// One child of an enumerated directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    pub is_directory: bool,
}

/// Read access to a directory hierarchy
pub trait DirectorySource {
    /// List the files and directories directly inside `path`, in the order they should be
    /// packed. Anything that is neither is left out.
    fn enumerate(&self, path: &Path) -> Result<Vec<SourceEntry>>;

    /// Read the full contents of the file at `path`
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Write access to a directory hierarchy
pub trait DirectorySink {
    /// Make sure the directory at `path` and all of its parents exist, existing ones included
    fn prepare_destination(&mut self, path: &Path) -> Result<()>;

    fn create_directory(&mut self, path: &Path) -> Result<()>;

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<()>;
}

/// The real filesystem
///
/// ```
/// use mpak_archive::fs::Filesystem;
///
/// let fs = Filesystem::builder().sorted(false).overwrite(true).build();
/// assert!(!fs.follow_links);
/// ```
#[derive(Debug, Clone, Copy, Builder)]
pub struct Filesystem {
    /// Enumerate entries by name instead of in the order the platform reports them, so
    /// archives of the same directory come out byte for byte the same
    #[builder(default = true)]
    pub sorted: bool,

    /// Pack the targets of symbolic links instead of skipping them
    #[builder(default)]
    pub follow_links: bool,

    /// Replace existing files and reuse existing directories when exporting
    #[builder(default)]
    pub overwrite: bool,
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn path_error(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |source| Error::PathIOError {
        path: path.to_path_buf(),
        source,
    }
}

impl Filesystem {
    /// An existing directory may be reused only when overwriting
    fn reusable(&self, error: &io::Error, path: &Path) -> bool {
        self.overwrite && error.kind() == io::ErrorKind::AlreadyExists && path.is_dir()
    }
}

impl DirectorySource for Filesystem {
    fn enumerate(&self, path: &Path) -> Result<Vec<SourceEntry>> {
        let mut walker = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.follow_links);
        if self.sorted {
            walker = walker.sort_by_file_name();
        }

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(path).to_path_buf();
                Error::PathIOError {
                    path,
                    source: e.into(),
                }
            })?;

            let file_type = entry.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                warn!(
                    path = %entry.path().display(),
                    "skipping entry that is neither file nor directory"
                );
                continue;
            }

            let name = entry
                .file_name()
                .to_str()
                .ok_or_else(|| Error::UnsupportedName {
                    path: entry.path().to_path_buf(),
                })?;

            entries.push(SourceEntry {
                name: name.to_owned(),
                is_directory: file_type.is_dir(),
            });
        }

        Ok(entries)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(path_error(path))
    }
}

impl DirectorySink for Filesystem {
    fn prepare_destination(&mut self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(path_error(path))
    }

    fn create_directory(&mut self, path: &Path) -> Result<()> {
        match fs::create_dir(path) {
            Err(e) if self.reusable(&e, path) => Ok(()),
            result => result.map_err(path_error(path)),
        }
    }

    fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut out = if self.overwrite {
            fs::File::create(path)
        } else {
            fs::File::create_new(path)
        }
        .map_err(path_error(path))?;

        out.write_all(bytes).map_err(path_error(path))
    }
}

/// Pack the directory at `path`, naming the root folder after it.
///
/// Within each folder all files are packed first, in the order the source lists them,
/// followed by every subfolder in turn, so data pool offsets follow that same walk.
#[instrument(skip_all, err, fields(path = %path.as_ref().display()))]
pub fn import<S: DirectorySource>(
    source: &S,
    path: impl AsRef<Path>,
    options: PackageWriterOptions,
) -> Result<Package<'static>> {
    let path = path.as_ref();
    let root_name = root_name(path)?;
    import_as(source, path, root_name, options)
}

/// Pack the directory at `path` under an explicit root folder name
pub fn import_as<S: DirectorySource>(
    source: &S,
    path: impl AsRef<Path>,
    root_name: impl Into<String>,
    options: PackageWriterOptions,
) -> Result<Package<'static>> {
    let mut writer = PackageWriter::new(root_name, options);
    import_folder(source, &mut writer, path.as_ref(), 0)?;

    let package = writer.finish()?;
    info!(
        files = package.root().total_files(),
        data_size = package.data_size(),
        "packed directory"
    );
    Ok(package)
}

fn root_name(path: &Path) -> Result<String> {
    let named = match path.file_name() {
        Some(name) => PathBuf::from(name),
        None => fs::canonicalize(path)
            .map_err(path_error(path))?
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default(),
    };

    named
        .to_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::UnsupportedName {
            path: path.to_path_buf(),
        })
}

fn import_folder<S: DirectorySource>(
    source: &S,
    writer: &mut PackageWriter,
    path: &Path,
    depth: usize,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::TooDeep {
            folder: path.display().to_string(),
            depth,
        });
    }

    let (folders, files): (Vec<_>, Vec<_>) = source
        .enumerate(path)?
        .into_iter()
        .partition(|entry| entry.is_directory);

    for file in files {
        let file_path = path.join(&file.name);
        debug!(path = %file_path.display(), "packing file");

        let contents = source.read_bytes(&file_path)?;
        writer.add_file(file.name, &contents)?;
    }

    for folder in folders {
        writer.start_folder(folder.name.as_str())?;
        import_folder(source, writer, &path.join(&folder.name), depth + 1)?;
        writer.finish_folder()?;
    }

    Ok(())
}

/// Write the package's tree below `destination`.
///
/// `destination` is created first if it does not exist yet. The root folder becomes
/// `destination/<root name>`, or `destination` itself when the root is unnamed. Entry names
/// are checked before use, so a crafted archive cannot write outside of that directory.
#[instrument(skip_all, err, fields(destination = %destination.as_ref().display()))]
pub fn export<K: DirectorySink>(
    package: &Package<'_>,
    sink: &mut K,
    destination: impl AsRef<Path>,
) -> Result<()> {
    let destination = destination.as_ref();
    let root = package.root();
    sink.prepare_destination(destination)?;

    let target = if root.name.is_empty() {
        destination.to_path_buf()
    } else {
        check_component(&root.name)?;
        let target = destination.join(&*root.name);
        sink.create_directory(&target)?;
        target
    };

    export_folder(package, root, sink, &target)?;
    info!(files = root.total_files(), "extracted package");
    Ok(())
}

fn export_folder<K: DirectorySink>(
    package: &Package<'_>,
    folder: &Folder<'_>,
    sink: &mut K,
    path: &Path,
) -> Result<()> {
    for file in &folder.files {
        check_component(&file.name)?;
        let file_path = path.join(&*file.name);
        debug!(path = %file_path.display(), "writing file");
        sink.write_file(&file_path, package.file_data(file)?)?;
    }

    for sub in &folder.folders {
        check_component(&sub.name)?;
        let sub_path = path.join(&*sub.name);
        sink.create_directory(&sub_path)?;
        export_folder(package, sub, sink, &sub_path)?;
    }

    Ok(())
}

/// A name is usable as a single path component when it cannot climb out of its parent
fn check_component(name: &str) -> Result<()> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).has_root();

    if unsafe_name {
        return Err(Error::UnsafeName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::fs::{
        check_component, export, import_as, DirectorySink, DirectorySource, SourceEntry,
    };
    use crate::package::Package;
    use crate::types::{File, Folder, MAX_DEPTH};
    use crate::write::PackageWriterOptions;

    /// Directories in memory; a path maps to its listing or its contents
    #[derive(Default)]
    struct MemoryFs {
        listings: BTreeMap<PathBuf, Vec<SourceEntry>>,
        files: BTreeMap<PathBuf, Vec<u8>>,
        created: Vec<PathBuf>,
    }

    impl MemoryFs {
        fn dir(mut self, path: &str, entries: &[(&str, bool)]) -> Self {
            let entries = entries
                .iter()
                .map(|(name, is_directory)| SourceEntry {
                    name: name.to_string(),
                    is_directory: *is_directory,
                })
                .collect();
            self.listings.insert(PathBuf::from(path), entries);
            self
        }

        fn file(mut self, path: &str, contents: &[u8]) -> Self {
            self.files.insert(PathBuf::from(path), contents.to_vec());
            self
        }
    }

    impl DirectorySource for MemoryFs {
        fn enumerate(&self, path: &Path) -> Result<Vec<SourceEntry>> {
            Ok(self.listings.get(path).cloned().unwrap_or_default())
        }

        fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
            self.files.get(path).cloned().ok_or_else(|| Error::PathIOError {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            })
        }
    }

    impl DirectorySink for MemoryFs {
        fn prepare_destination(&mut self, path: &Path) -> Result<()> {
            self.create_directory(path)
        }

        fn create_directory(&mut self, path: &Path) -> Result<()> {
            self.created.push(path.to_path_buf());
            Ok(())
        }

        fn write_file(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
            self.files.insert(path.to_path_buf(), bytes.to_vec());
            Ok(())
        }
    }

    fn source() -> MemoryFs {
        // Listing order deliberately mixes directories and files
        MemoryFs::default()
            .dir("src", &[("sub", true), ("a.txt", false), ("b.bin", false)])
            .dir("src/sub", &[("c", false)])
            .file("src/a.txt", b"hi\n")
            .file("src/b.bin", b"\x00\x01")
            .file("src/sub/c", b"cc")
    }

    #[traced_test]
    #[test]
    fn import_packs_files_before_folders() -> Result<()> {
        let package = import_as(&source(), "src", "src", PackageWriterOptions::default())?;

        let expected = Folder::new("src")
            .with_file(File::new("a.txt", 3, 0))
            .with_file(File::new("b.bin", 2, 3))
            .with_folder(Folder::new("sub").with_file(File::new("c", 2, 5)));

        assert_eq!(package.root(), &expected);
        assert_eq!(package.data(), b"hi\n\x00\x01cc".as_slice());

        Ok(())
    }

    #[test]
    fn import_reports_failing_path() {
        let broken = MemoryFs::default().dir("src", &[("gone", false)]);

        assert!(matches!(
            import_as(&broken, "src", "src", PackageWriterOptions::default()),
            Err(Error::PathIOError { path, .. }) if path == Path::new("src/gone")
        ));
    }

    /// Every directory holds one more directory
    struct Bottomless;

    impl DirectorySource for Bottomless {
        fn enumerate(&self, _path: &Path) -> Result<Vec<SourceEntry>> {
            Ok(vec![SourceEntry {
                name: "d".to_string(),
                is_directory: true,
            }])
        }

        fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
            Err(Error::PathIOError {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            })
        }
    }

    #[test]
    fn import_stops_at_nesting_limit() {
        assert!(matches!(
            import_as(&Bottomless, "src", "src", PackageWriterOptions::default()),
            Err(Error::TooDeep { depth, .. }) if depth == MAX_DEPTH + 1
        ));
    }

    #[traced_test]
    #[test]
    fn export_mirrors_tree() -> Result<()> {
        let package = import_as(&source(), "src", "pkg", PackageWriterOptions::default())?;

        let mut sink = MemoryFs::default();
        export(&package, &mut sink, "out")?;

        assert_eq!(
            sink.created,
            vec![
                PathBuf::from("out"),
                PathBuf::from("out/pkg"),
                PathBuf::from("out/pkg/sub"),
            ]
        );
        assert_eq!(sink.files[Path::new("out/pkg/a.txt")], b"hi\n");
        assert_eq!(sink.files[Path::new("out/pkg/sub/c")], b"cc");

        Ok(())
    }

    #[test]
    fn export_rejects_escaping_names() -> Result<()> {
        for name in ["..", "../evil", "/etc", "a\\b", ""] {
            let root = Folder::new("root").with_file(File::new(name, 0, 0));
            let package = Package::new(*b"MPAK", root, Vec::new())?;

            let mut sink = MemoryFs::default();
            assert!(
                matches!(export(&package, &mut sink, "out"), Err(Error::UnsafeName { .. })),
                "{name:?}"
            );
            assert!(sink.files.is_empty());
        }

        Ok(())
    }

    #[test]
    fn component_check_allows_plain_names() {
        assert!(check_component("file.txt").is_ok());
        assert!(check_component("...").is_ok());
        assert!(check_component(".hidden").is_ok());
    }
}

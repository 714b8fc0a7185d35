//! Packages and the archives they are stored in
//!

use std::{
    borrow::Cow,
    fmt::{self, Debug},
    io::{Cursor, Write},
    path::Path,
};

use binrw::{BinRead, BinWrite};
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

use crate::{
    error::{Error, ResolveError, Result},
    read,
    resolve::{resolve, Entry},
    types::{File, Folder, PackageHeader, HEADER_SIZE},
    write,
};

/// A decoded MPAK package: a folder tree and the data pool its files point into
///
/// A package parsed with [`Package::parse`] borrows both its names and its data pool from the
/// archive buffer; [`Package::into_owned`] detaches it.
#[derive(Clone, PartialEq, Eq)]
pub struct Package<'a> {
    header: PackageHeader,
    root: Folder<'a>,
    data: Cow<'a, [u8]>,
}

impl Debug for Package<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Package")
            .field("header", &self.header)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl<'a> Package<'a> {
    /// Build a package from a tree and the data pool its files point into.
    ///
    /// The tree is validated as a whole, so every later encode of it succeeds.
    pub fn new(tag: [u8; 4], root: Folder<'a>, data: impl Into<Cow<'a, [u8]>>) -> Result<Self> {
        let data = data.into();
        let data_size = data.len() as u64;
        root.validate(data_size)?;

        Ok(Package {
            header: PackageHeader {
                tag,
                structure_size: HEADER_SIZE + root.encoded_len(),
                data_size,
            },
            root,
            data,
        })
    }

    /// Read a package out of `bytes` without copying names or file contents.
    #[instrument(skip(bytes), err, fields(len = bytes.len()))]
    pub fn parse(bytes: &'a [u8]) -> Result<Package<'a>> {
        let actual = bytes.len() as u64;
        if actual < HEADER_SIZE {
            return Err(Error::TruncatedArchive {
                expected: HEADER_SIZE,
                actual,
            });
        }

        let header = PackageHeader::read(&mut Cursor::new(bytes))?;
        if header.structure_size < HEADER_SIZE {
            return Err(Error::CorruptStructure {
                offset: 4,
                reason: "structure size smaller than header",
            });
        }

        let expected = header
            .structure_size
            .checked_add(header.data_size)
            .ok_or(Error::TruncatedArchive {
                expected: u64::MAX,
                actual,
            })?;
        if actual < expected {
            return Err(Error::TruncatedArchive { expected, actual });
        }
        if actual > expected {
            warn!(extra = actual - expected, "ignoring bytes after data pool");
        }

        // Both bounds are at most `bytes.len()` here
        let structure_end = header.structure_size as usize;
        let data_end = expected as usize;

        let root = read::decode(&bytes[HEADER_SIZE as usize..structure_end], header.data_size)?;
        debug!(
            tag = %String::from_utf8_lossy(&header.tag),
            structure_size = header.structure_size,
            data_size = header.data_size,
            "parsed package"
        );

        Ok(Package {
            header,
            root,
            data: Cow::Borrowed(&bytes[structure_end..data_end]),
        })
    }

    /// The opaque tag from the first four bytes
    pub fn tag(&self) -> [u8; 4] {
        self.header.tag
    }

    /// The tag as text, with trailing NUL padding removed
    pub fn tag_str(&self) -> Cow<'_, str> {
        let end = self
            .header
            .tag
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.header.tag[..end])
    }

    /// Header plus structure section size, also where the data pool starts
    pub fn structure_size(&self) -> u64 {
        self.header.structure_size
    }

    pub fn data_size(&self) -> u64 {
        self.header.data_size
    }

    pub fn header(&self) -> &PackageHeader {
        &self.header
    }

    pub fn root(&self) -> &Folder<'a> {
        &self.root
    }

    /// The whole data pool
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the contents of a file in this package
    pub fn file_data(&self, file: &File<'_>) -> Result<&[u8]> {
        file.check_range(self.data_size())?;
        // Checked against the pool length just above
        Ok(&self.data[file.offset as usize..(file.offset + file.size) as usize])
    }

    /// Look up a file or folder by a `/` separated path
    pub fn resolve(&self, path: &str) -> Result<Entry<'_, 'a>> {
        Ok(resolve(&self.root, path)?)
    }

    /// Get the contents of the file at `path`
    pub fn read(&self, path: &str) -> Result<&[u8]> {
        match self.resolve(path)? {
            Entry::File(file) => self.file_data(file),
            Entry::Folder(_) => Err(ResolveError::NotAFile {
                path: path.to_owned(),
            }
            .into()),
        }
    }

    /// Get the contents of the file at `path` as text
    pub fn read_to_str(&self, path: &str) -> Result<&str> {
        Ok(std::str::from_utf8(self.read(path)?)?)
    }

    /// Write the full archive: header, structure section and data pool.
    #[instrument(skip_all, err)]
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut header = Cursor::new(Vec::with_capacity(HEADER_SIZE as usize));
        self.header.write(&mut header)?;

        writer.write_all(header.get_ref())?;
        write::encode(&self.root, writer)?;
        writer.write_all(&self.data)?;

        Ok(())
    }

    /// Serialize into a single buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity((self.structure_size() + self.data_size()) as usize);
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    pub fn to_archive(&self) -> Result<Archive> {
        Ok(Archive::new(self.to_bytes()?))
    }

    /// Write the archive to `path` through a temporary file in the same directory, so a
    /// failure never leaves a partial archive behind.
    #[instrument(skip(self, path), err, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        save_atomic(path.as_ref(), overwrite, |out| self.write(out))
    }

    /// Detach the package from the buffer it was parsed from
    pub fn into_owned(self) -> Package<'static> {
        Package {
            header: self.header,
            root: self.root.into_owned(),
            data: Cow::Owned(self.data.into_owned()),
        }
    }
}

impl Package<'static> {
    /// Read a package out of `bytes`, copying every name and the data pool
    pub fn parse_owned(bytes: &[u8]) -> Result<Package<'static>> {
        Ok(Package::parse(bytes)?.into_owned())
    }
}

/// A complete MPAK archive held in memory
///
/// ```no_run
/// fn list_contents(path: &str) -> mpak_archive::error::Result<()> {
///     let archive = mpak_archive::Archive::load(path)?;
///     let package = archive.package()?;
///
///     print!("{}", package.root().tree());
///     Ok(())
/// }
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Archive {
    bytes: Vec<u8>,
}

impl Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Archive({} bytes)", self.bytes.len())
    }
}

impl Archive {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Read a whole archive file into memory
    #[instrument(skip(path), err, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::PathIOError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { bytes })
    }

    /// Write the archive to `path`, see [`Package::save`]
    #[instrument(skip(self, path), err, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        save_atomic(path.as_ref(), overwrite, |out| {
            out.write_all(&self.bytes)?;
            Ok(())
        })
    }

    /// Parse the package, borrowing from this archive
    pub fn package(&self) -> Result<Package<'_>> {
        Package::parse(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Unwrap and return the inner buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for Archive {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for Archive {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

fn save_atomic(
    path: &Path,
    overwrite: bool,
    write: impl FnOnce(&mut std::fs::File) -> Result<()>,
) -> Result<()> {
    let path_error = |source| Error::PathIOError {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(path_error)?;
    write(temp.as_file_mut())?;
    temp.as_file_mut().flush().map_err(path_error)?;

    if overwrite {
        temp.persist(path).map_err(|e| path_error(e.error))?;
    } else {
        temp.persist_noclobber(path).map_err(|e| path_error(e.error))?;
    }

    Ok(())
}

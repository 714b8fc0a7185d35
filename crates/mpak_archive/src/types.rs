//! Base types for the structure of an MPAK file.

use std::{borrow::Cow, fmt};

use binrw::{BinRead, BinWrite};

use crate::error::{Error, Result};

/// Size of the fixed header in bytes
pub const HEADER_SIZE: u64 = 20;

/// Longest name a single length byte can describe
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Deepest folder nesting accepted when encoding or decoding
pub const MAX_DEPTH: usize = 1024;

/// Tag written when none is requested
pub const DEFAULT_TAG: [u8; 4] = *b"MPAK";

/// Name length byte plus file and folder counts
pub(crate) const FOLDER_BASE_SIZE: u64 = 1 + 4 + 4;

/// Name length byte plus size and offset
pub(crate) const FILE_BASE_SIZE: u64 = 1 + 8 + 8;

/// MPAK file header
///
/// All data is stored in little endian format.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct PackageHeader {
    /// Opaque application defined tag
    pub tag: [u8; 4],

    /// Header size plus encoded structure section size, also the start of the data pool
    pub structure_size: u64,

    /// The number of bytes in the data pool
    pub data_size: u64,
}

impl Default for PackageHeader {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG,
            structure_size: HEADER_SIZE + FOLDER_BASE_SIZE,
            data_size: 0,
        }
    }
}

/// A file entry: a name plus a range of the owning package's data pool
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct File<'a> {
    /// Name of the file, without any folder components
    pub name: Cow<'a, str>,

    /// Length of the contents in bytes
    pub size: u64,

    /// Position of the contents within the data pool
    pub offset: u64,
}

impl<'a> File<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>, size: u64, offset: u64) -> Self {
        Self {
            name: name.into(),
            size,
            offset,
        }
    }

    /// Get the name of the file
    ///
    /// # Warnings
    ///
    /// Names are not sanitized when reading. Check them before joining them onto a real path,
    /// as [`crate::fs::export`] does.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// One past the last byte of the contents, or `None` if the range overflows
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }

    /// Detach the file from the buffer its name was read from
    pub fn into_owned(self) -> File<'static> {
        File {
            name: Cow::Owned(self.name.into_owned()),
            size: self.size,
            offset: self.offset,
        }
    }

    pub(crate) fn check_range(&self, data_size: u64) -> Result<()> {
        match self.end() {
            Some(end) if end <= data_size => Ok(()),
            _ => Err(Error::OffsetOutOfRange {
                name: self.name.to_string(),
                offset: self.offset,
                size: self.size,
                data_size,
            }),
        }
    }
}

/// A folder entry owning its files and subfolders
///
/// The order of `files` and `folders` is the order they are encoded in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Folder<'a> {
    /// Name of the folder
    pub name: Cow<'a, str>,

    /// Files directly inside this folder
    pub files: Vec<File<'a>>,

    /// Folders directly inside this folder
    pub folders: Vec<Folder<'a>>,
}

impl<'a> Folder<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            folders: Vec::new(),
        }
    }

    /// Append a file and return the folder
    pub fn with_file(mut self, file: File<'a>) -> Self {
        self.files.push(file);
        self
    }

    /// Append a subfolder and return the folder
    pub fn with_folder(mut self, folder: Folder<'a>) -> Self {
        self.folders.push(folder);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[File<'a>] {
        &self.files
    }

    pub fn folders(&self) -> &[Folder<'a>] {
        &self.folders
    }

    /// Find a file directly inside this folder
    pub fn file(&self, name: &str) -> Option<&File<'a>> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Find a folder directly inside this folder
    pub fn folder(&self, name: &str) -> Option<&Folder<'a>> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Whether the folder has neither files nor subfolders
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Number of files in this folder and every folder below it
    pub fn total_files(&self) -> usize {
        self.files.len() + self.folders.iter().map(Folder::total_files).sum::<usize>()
    }

    /// Exact size of this folder's encoding, subfolders included
    pub fn encoded_len(&self) -> u64 {
        let files: u64 = self
            .files
            .iter()
            .map(|f| FILE_BASE_SIZE + f.name.len() as u64)
            .sum();
        let folders: u64 = self.folders.iter().map(Folder::encoded_len).sum();
        FOLDER_BASE_SIZE + self.name.len() as u64 + files + folders
    }

    /// Detach the whole tree from the buffer its names were read from
    pub fn into_owned(self) -> Folder<'static> {
        Folder {
            name: Cow::Owned(self.name.into_owned()),
            files: self.files.into_iter().map(File::into_owned).collect(),
            folders: self.folders.into_iter().map(Folder::into_owned).collect(),
        }
    }

    /// A [`fmt::Display`] adapter listing the tree, four spaces per level
    pub fn tree(&self) -> TreeDisplay<'_, 'a> {
        TreeDisplay(self)
    }

    /// Check everything the encoder relies on: name lengths, child counts, nesting depth and
    /// that every file lies inside a data pool of `data_size` bytes.
    pub fn validate(&self, data_size: u64) -> Result<()> {
        self.validate_at(data_size, 0)
    }

    fn validate_at(&self, data_size: u64, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::TooDeep {
                folder: self.name.to_string(),
                depth,
            });
        }

        check_name(&self.name)?;
        check_count(&self.name, self.files.len())?;
        check_count(&self.name, self.folders.len())?;

        for file in &self.files {
            check_name(&file.name)?;
            file.check_range(data_size)?;
        }

        self.folders
            .iter()
            .try_for_each(|folder| folder.validate_at(data_size, depth + 1))
    }
}

pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(Error::NameTooLong {
            name: name.to_owned(),
            len: name.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_count(folder: &str, count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::TooManyEntries {
        folder: folder.to_owned(),
        count,
    })
}

/// Lists a folder tree: `name/`, then its files, then its subfolders, each level indented
/// by four more spaces.
pub struct TreeDisplay<'f, 'a>(&'f Folder<'a>);

impl TreeDisplay<'_, '_> {
    fn write_folder(f: &mut fmt::Formatter<'_>, folder: &Folder<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}/", "", folder.name, indent = depth * 4)?;
        for file in &folder.files {
            writeln!(f, "{:indent$}{}", "", file.name, indent = (depth + 1) * 4)?;
        }
        for sub in &folder.folders {
            Self::write_folder(f, sub, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeDisplay<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::write_folder(f, self.0, 0)
    }
}

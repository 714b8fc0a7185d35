//! Types for writing MPAK archives
//!

use bon::Builder;
use byteorder::{LittleEndian, WriteBytesExt};
use std::borrow::Cow;
use std::io::{self, Write};
use tracing::{instrument, Level};

use crate::error::{Error, Result};
use crate::package::Package;
use crate::types::{check_count, check_name, File, Folder, DEFAULT_TAG, MAX_DEPTH};

/// Encode `folder` and everything below it into `writer`.
///
/// Each folder is written as its name, its file count, its folder count, all of its file
/// records and then, one after another, the full encoding of each subfolder.
#[instrument(skip_all, err, fields(folder = %folder.name))]
pub fn encode<W: Write>(folder: &Folder<'_>, writer: &mut W) -> Result<()> {
    encode_folder(folder, writer, 0)
}

/// Encode `folder` into a freshly allocated buffer of exactly [`Folder::encoded_len`] bytes
pub fn encode_to_vec(folder: &Folder<'_>) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(folder.encoded_len() as usize);
    encode(folder, &mut buffer)?;
    Ok(buffer)
}

fn encode_folder<W: Write>(folder: &Folder<'_>, writer: &mut W, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::TooDeep {
            folder: folder.name.to_string(),
            depth,
        });
    }

    write_name(writer, &folder.name)?;
    writer.write_u32::<LittleEndian>(check_count(&folder.name, folder.files.len())?)?;
    writer.write_u32::<LittleEndian>(check_count(&folder.name, folder.folders.len())?)?;

    for file in &folder.files {
        write_name(writer, &file.name)?;
        writer.write_u64::<LittleEndian>(file.size)?;
        writer.write_u64::<LittleEndian>(file.offset)?;
    }

    for sub in &folder.folders {
        encode_folder(sub, writer, depth + 1)?;
    }

    Ok(())
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> Result<()> {
    check_name(name)?;
    writer.write_u8(name.len() as u8)?;
    writer.write_all(name.as_bytes())?;
    Ok(())
}

/// Options for how the package should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct PackageWriterOptions {
    /// The tag stored in the first four bytes of the archive
    #[builder(default = DEFAULT_TAG)]
    pub tag: [u8; 4],
}

impl Default for PackageWriterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Incremental package builder
///
/// Files receive consecutive data pool offsets in the order they are started, so the
/// caller's traversal order decides the layout of the pool.
///
/// ```
/// # fn doit() -> mpak_archive::error::Result<()>
/// # {
/// use std::io::Write;
/// use mpak_archive::{write::PackageWriterOptions, PackageWriter};
///
/// let mut writer = PackageWriter::new("root", PackageWriterOptions::default());
///
/// writer.start_file("a.txt")?;
/// writer.write_all(b"hi\n")?;
///
/// writer.start_folder("sub")?;
/// writer.start_file("b.bin")?;
/// writer.write_all(&[0xDE, 0xAD])?;
/// writer.finish_folder()?;
///
/// let package = writer.finish()?;
/// assert_eq!(package.data_size(), 5);
/// assert_eq!(package.read("sub/b.bin")?, &[0xDE, 0xAD]);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct PackageWriter {
    options: PackageWriterOptions,
    writing_to_file: bool,
    /// Open folders, the root first and the current folder last
    open: Vec<Folder<'static>>,
    data: Vec<u8>,
}

impl PackageWriter {
    /// Initializes the package with an empty root folder.
    ///
    /// Before writing to this object, the [`PackageWriter::start_file`] function should be
    /// called.
    pub fn new(root_name: impl Into<String>, options: PackageWriterOptions) -> PackageWriter {
        PackageWriter {
            options,
            writing_to_file: false,
            open: vec![Folder::new(root_name.into())],
            data: Vec::new(),
        }
    }

    /// Returns true if a file is currently open for writing.
    pub const fn is_writing_file(&self) -> bool {
        self.writing_to_file
    }

    /// Number of folders open below the root
    pub fn depth(&self) -> usize {
        self.open.len() - 1
    }

    /// Start a new file in the current folder at the end of the data pool.
    #[instrument(skip(self, name), err, fields(name = tracing::field::Empty))]
    pub fn start_file(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        tracing::Span::current().record("name", name.as_str());
        check_name(&name)?;

        self.finish_file();

        let file = File::new(Cow::Owned(name), 0, self.data.len() as u64);
        self.current().files.push(file);
        self.writing_to_file = true;

        Ok(())
    }

    /// Start a file and write all of `contents` into it
    pub fn add_file(&mut self, name: impl Into<String>, contents: &[u8]) -> Result<()> {
        self.start_file(name)?;
        self.write_all(contents)?;
        self.finish_file();
        Ok(())
    }

    /// Open a new folder inside the current folder; later files go into it.
    #[instrument(skip(self, name), err, fields(name = tracing::field::Empty))]
    pub fn start_folder(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        tracing::Span::current().record("name", name.as_str());
        check_name(&name)?;

        self.finish_file();
        self.open.push(Folder::new(name));

        Ok(())
    }

    /// Close the current folder and return to its parent.
    #[instrument(skip(self), err)]
    pub fn finish_folder(&mut self) -> Result<()> {
        if self.open.len() < 2 {
            return Err(Error::NoOpenFolder);
        }

        self.finish_file();
        if let Some(folder) = self.open.pop() {
            self.current().folders.push(folder);
        }

        Ok(())
    }

    fn finish_file(&mut self) {
        self.writing_to_file = false;
    }

    fn current(&mut self) -> &mut Folder<'static> {
        let last = self.open.len() - 1;
        &mut self.open[last]
    }

    /// Close every open folder and build the package
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<Package<'static>> {
        while self.open.len() > 1 {
            self.finish_folder()?;
        }
        self.finish_file();

        let root = self.open.pop().ok_or(Error::NoOpenFolder)?;
        Package::new(self.options.tag, root, self.data)
    }
}

impl Write for PackageWriter {
    #[instrument(skip_all, err, ret(level = Level::TRACE), fields(size = buf.len()))]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writing_to_file {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "No file has been started",
            ));
        }

        self.data.extend_from_slice(buf);
        if let Some(file) = self.current().files.last_mut() {
            file.size += buf.len() as u64;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

//! Types for reading MPAK structure sections
//!
//! Decoding borrows every name straight out of the input buffer. Call
//! [`Folder::into_owned`] on the result to detach it from the buffer.

use std::borrow::Cow;

use tracing::{debug, instrument};
use winnow::binary::{le_u32, le_u64, length_take, u8};
use winnow::error::ContextError;
use winnow::prelude::*;

use crate::error::{Error, Result};
use crate::types::{File, Folder, FILE_BASE_SIZE, FOLDER_BASE_SIZE, MAX_DEPTH};

type Stream<'i> = &'i [u8];

fn name<'s>(input: &mut Stream<'s>) -> PResult<&'s [u8]> {
    length_take(u8).parse_next(input)
}

fn counts(input: &mut Stream<'_>) -> PResult<(u32, u32)> {
    (le_u32, le_u32).parse_next(input)
}

fn extent(input: &mut Stream<'_>) -> PResult<(u64, u64)> {
    (le_u64, le_u64).parse_next(input)
}

/// Decode a complete structure section into its root folder.
///
/// Every file is checked against `data_size` while decoding, and the section must be consumed
/// exactly: bytes left over after the root folder are treated as corruption.
#[instrument(skip(structure), err, fields(len = structure.len()))]
pub fn decode(structure: &[u8], data_size: u64) -> Result<Folder<'_>> {
    let mut decoder = StructureDecoder::new(structure, data_size);
    let root = decoder.folder(0)?;

    if !decoder.remaining.is_empty() {
        return Err(Error::CorruptStructure {
            offset: decoder.offset(),
            reason: "trailing bytes after root folder",
        });
    }

    debug!(files = root.total_files(), "decoded structure");
    Ok(root)
}

/// Forward-only cursor over a structure section
pub(crate) struct StructureDecoder<'a> {
    input: &'a [u8],
    remaining: &'a [u8],
    data_size: u64,
}

impl<'a> StructureDecoder<'a> {
    pub(crate) fn new(input: &'a [u8], data_size: u64) -> Self {
        Self {
            input,
            remaining: input,
            data_size,
        }
    }

    /// Bytes consumed so far
    pub(crate) fn offset(&self) -> usize {
        self.input.len() - self.remaining.len()
    }

    fn parse<O>(
        &mut self,
        mut parser: impl Parser<Stream<'a>, O, ContextError>,
        reason: &'static str,
    ) -> Result<O> {
        let offset = self.offset();
        parser
            .parse_next(&mut self.remaining)
            .map_err(|_| Error::CorruptStructure { offset, reason })
    }

    fn name(&mut self) -> Result<Cow<'a, str>> {
        let offset = self.offset();
        let raw = self.parse(name, "name runs past end of structure")?;
        std::str::from_utf8(raw)
            .map(Cow::Borrowed)
            .map_err(|source| Error::InvalidName { offset, source })
    }

    /// Refuse counts whose smallest possible encoding is longer than what is left
    fn ensure_room(&self, files: u32, folders: u32) -> Result<()> {
        let needed = files as u64 * FILE_BASE_SIZE + folders as u64 * FOLDER_BASE_SIZE;
        if needed > self.remaining.len() as u64 {
            return Err(Error::CorruptStructure {
                offset: self.offset(),
                reason: "entry counts exceed remaining structure",
            });
        }
        Ok(())
    }

    fn file(&mut self) -> Result<File<'a>> {
        let name = self.name()?;
        let (size, offset) = self.parse(extent, "file record runs past end of structure")?;

        let file = File { name, size, offset };
        file.check_range(self.data_size)?;
        Ok(file)
    }

    pub(crate) fn folder(&mut self, depth: usize) -> Result<Folder<'a>> {
        if depth > MAX_DEPTH {
            return Err(Error::CorruptStructure {
                offset: self.offset(),
                reason: "folder nesting too deep",
            });
        }

        let name = self.name()?;
        let (file_count, folder_count) =
            self.parse(counts, "folder counts run past end of structure")?;
        self.ensure_room(file_count, folder_count)?;

        let mut files = Vec::with_capacity(file_count as usize);
        for _ in 0..file_count {
            files.push(self.file()?);
        }

        let mut folders = Vec::with_capacity(folder_count as usize);
        for _ in 0..folder_count {
            folders.push(self.folder(depth + 1)?);
        }

        Ok(Folder {
            name,
            files,
            folders,
        })
    }
}

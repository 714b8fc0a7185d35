//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// An I/O operation on a specific path failed
    #[error("i/o failure on {}", .path.display())]
    PathIOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`std::str::Utf8Error`]
    #[error(transparent)]
    Utf8Error(#[from] std::str::Utf8Error),

    /// the structure section does not describe a valid folder tree
    #[error("corrupt structure at offset {offset:#x}: {reason}")]
    #[diagnostic(help("the archive was truncated or not written by a compatible tool"))]
    CorruptStructure { offset: usize, reason: &'static str },

    /// a name inside the structure section is not valid UTF-8
    #[error("name at offset {offset:#x} is not valid UTF-8")]
    InvalidName {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    /// a file record points outside of the data pool
    #[error("file {name} ({size} bytes at {offset}) lies outside the {data_size} byte data pool")]
    OffsetOutOfRange {
        name: String,
        offset: u64,
        size: u64,
        data_size: u64,
    },

    /// the header claims more bytes than the buffer holds
    #[error("archive is truncated: expected at least {expected} bytes, found {actual}")]
    TruncatedArchive { expected: u64, actual: u64 },

    /// unable to resolve requested path
    #[error("unable to resolve requested path")]
    Resolve(#[from] ResolveError),

    /// a name does not fit in the single length byte
    #[error("name {name} is {len} bytes long, at most 255 are allowed")]
    NameTooLong { name: String, len: usize },

    /// a folder holds more children than a count field can describe
    #[error("folder {folder} holds {count} entries, more than a count field can store")]
    TooManyEntries { folder: String, count: usize },

    /// a name would escape the extraction directory
    #[error("refusing to write entry with unsafe name {name:?}")]
    UnsafeName { name: String },

    /// an in-memory tree nests deeper than any archive may
    #[error(
        "folder {folder} is nested {depth} levels deep, at most {} are allowed",
        crate::types::MAX_DEPTH
    )]
    TooDeep { folder: String, depth: usize },

    /// a filesystem entry name cannot be stored
    #[error("{} has a name that is not valid UTF-8", .path.display())]
    UnsupportedName { path: PathBuf },

    /// tried to close a folder while only the root is open
    #[error("no folder is open besides the root")]
    NoOpenFolder,
}

/// Error type to provide further information when a path cannot be resolved
#[derive(Error, Diagnostic, Debug)]
pub enum ResolveError {
    /// no entry matches
    #[error("no entry found at {path}")]
    NotFound { path: String },

    /// a file was found where a folder was needed
    #[error("path {path} passes through file {file}")]
    PathThroughFile { path: String, file: String },

    /// a folder was found where a file was needed
    #[error("path {path} names a folder, not a file")]
    NotAFile { path: String },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

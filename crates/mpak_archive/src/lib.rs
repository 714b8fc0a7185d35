//! This library handles packing directory trees into **MPAK** archives and reading them back.
//!
//! # MPAK Archive Format Documentation
//!
//! An MPAK archive stores a whole folder hierarchy and the contents of every file inside it
//! as one contiguous blob. The folder hierarchy is kept in a compact structure section while
//! the file contents are concatenated into a single data pool that file records address by
//! offset. MPAK files are typically identified with the `.mpak` extension.
//!
//! ## File Structure
//!
//! An MPAK file consists of a header, followed by the structure section and the data pool.
//!
//! | Offset (bytes)   | Field                  | Description                                           |
//! |------------------|------------------------|-------------------------------------------------------|
//! | 0x0000           | Tag                    | 4 bytes: Opaque application defined tag (`MPAK`)      |
//! | 0x0004           | Structure Size         | 8 bytes: Header size plus structure section size      |
//! | 0x000C           | Data Size              | 8 bytes: Number of bytes in the data pool             |
//! | 0x0014           | Structure Section      | Recursive folder records, starting with the root      |
//! | Structure Size   | Data Pool              | Data Size bytes of concatenated file contents         |
//!
//! ### Header
//!
//! - **Tag**: 4 opaque bytes, not null terminated. Tools default to `MPAK` but applications may
//!   store anything here. It is not validated when reading.
//! - **Structure Size**: An 8-byte unsigned integer equal to `20` plus the size of the encoded
//!   structure section. It doubles as the offset of the data pool.
//! - **Data Size**: An 8-byte unsigned integer holding the length of the data pool.
//!
//! ### Folder Record
//!
//! | Field        | Size            | Description                                      |
//! |--------------|-----------------|--------------------------------------------------|
//! | Name Length  | 1 byte          | Length of the UTF-8 name, at most 255            |
//! | Name         | Name Length     | Folder name, no terminator                       |
//! | File Count   | 4 bytes         | Number of file records that follow               |
//! | Folder Count | 4 bytes         | Number of folder records after the file records  |
//! | Files        | File Count      | File records                                     |
//! | Folders      | Folder Count    | Folder records, each fully nested (pre-order)    |
//!
//! ### File Record
//!
//! | Field        | Size            | Description                                      |
//! |--------------|-----------------|--------------------------------------------------|
//! | Name Length  | 1 byte          | Length of the UTF-8 name, at most 255            |
//! | Name         | Name Length     | File name, no terminator                         |
//! | Size         | 8 bytes         | Length of the contents in the data pool          |
//! | Offset       | 8 bytes         | Position of the contents within the data pool    |
//!
//! There are no end markers or subtree sizes: a reader rebuilds the tree purely from the
//! counts, so writer and reader must agree on visiting a folder's files before recursing
//! into its subfolders.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.mpak`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Compression**: None, file contents are stored as they are
//!
//! ## Reading without copying
//!
//! [`Package::parse`] borrows every name and the data pool straight out of the input buffer.
//! The borrow checker keeps the buffer alive for as long as any view into it exists:
//!
//! ```
//! # fn doit() -> mpak_archive::error::Result<()> {
//! use mpak_archive::{File, Folder, Package};
//!
//! let root = Folder::new("root").with_file(File::new("a.txt", 3, 0));
//! let archive = Package::new(*b"MPAK", root, b"hi\n".to_vec())?.to_archive()?;
//!
//! let package = archive.package()?;
//! assert_eq!(package.read("a.txt")?, b"hi\n");
//! # Ok(())
//! # }
//! # doit().unwrap();
//! ```

pub mod error;
pub mod fs;
pub mod package;
pub mod read;
pub mod resolve;
pub mod types;
pub mod write;

pub use package::{Archive, Package};
pub use resolve::Entry;
pub use types::{File, Folder};
pub use write::PackageWriter;

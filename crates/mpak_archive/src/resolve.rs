//! Path lookups inside a decoded tree

use crate::error::ResolveError;
use crate::types::{File, Folder};

/// A file or folder found by [`resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'p, 'a> {
    File(&'p File<'a>),
    Folder(&'p Folder<'a>),
}

impl<'p, 'a> Entry<'p, 'a> {
    pub fn name(&self) -> &'p str {
        match *self {
            Entry::File(file) => file.name(),
            Entry::Folder(folder) => folder.name(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File(_))
    }

    pub fn as_file(&self) -> Option<&'p File<'a>> {
        match *self {
            Entry::File(file) => Some(file),
            Entry::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&'p Folder<'a>> {
        match *self {
            Entry::File(_) => None,
            Entry::Folder(folder) => Some(folder),
        }
    }
}

/// Resolve a `/` separated path starting at `root`.
///
/// Empty components are skipped, so `"a//b/"` and `"a/b"` are the same path and `""` is the
/// root itself. Each component is matched exactly against the files of the current folder
/// and then its subfolders; the first match wins. Only the last component may name a file.
pub fn resolve<'p, 'a>(root: &'p Folder<'a>, path: &str) -> Result<Entry<'p, 'a>, ResolveError> {
    let mut current = root;
    let mut tokens = path.split('/').filter(|t| !t.is_empty()).peekable();

    while let Some(token) = tokens.next() {
        if let Some(file) = current.file(token) {
            if tokens.peek().is_some() {
                return Err(ResolveError::PathThroughFile {
                    path: path.to_owned(),
                    file: token.to_owned(),
                });
            }
            return Ok(Entry::File(file));
        }

        current = current
            .folder(token)
            .ok_or_else(|| ResolveError::NotFound {
                path: path.to_owned(),
            })?;
    }

    Ok(Entry::Folder(current))
}

use clap::Args;
use miette::{miette, Result};
use mpak_archive::{fs::Filesystem, types::DEFAULT_TAG};
use std::path::{Path, PathBuf};

use super::{
    dump::dump_file,
    extract::extract_file,
    pack::{default_output, pack_directory, truncate_tag},
};

/// What to do with the path given without a subcommand
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Pack { tag: [u8; 4], output: PathBuf },
    Dump,
    Extract,
}

/// `mpak PATH [TAG] [-d]`: pack a directory, or list and unpack an MPAK file
#[derive(Args)]
pub struct DetectArgs {
    /// A directory to pack into `<PATH>.mpak`, or an MPAK file to list and extract
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Tag stored in the header of a packed directory, cut to 4 bytes
    #[arg(value_name = "TAG")]
    pub tag: Option<String>,

    /// Only print the structure of an MPAK file instead of extracting it
    #[arg(short = 'd', long = "dump", default_value_t = false)]
    pub dump: bool,
}

impl DetectArgs {
    pub fn handle(&self) -> Result<()> {
        self.run(Path::new("."))
    }

    /// Act on the path, extracting archives below `extract_to`
    pub fn run(&self, extract_to: &Path) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| miette!("a directory or MPAK file is required"))?;

        match self.action(path)? {
            Action::Pack { tag, output } => {
                // Repacking replaces an older archive of the same directory
                pack_directory(&Filesystem::default(), path, tag, &output, true)
            }
            Action::Dump => dump_file(path),
            Action::Extract => extract_file(path, extract_to, true),
        }
    }

    fn action(&self, path: &Path) -> Result<Action> {
        if path.is_dir() {
            if self.dump {
                return Err(miette!("--dump only applies to MPAK files"));
            }

            let tag = self.tag.as_deref().map_or(DEFAULT_TAG, truncate_tag);
            let output = default_output(path)?;
            Ok(Action::Pack { tag, output })
        } else if path.is_file() {
            if let Some(option) = &self.tag {
                return Err(miette!("unknown option: {option}"));
            }

            Ok(if self.dump {
                Action::Dump
            } else {
                Action::Extract
            })
        } else {
            Err(miette!(
                "{} is not a valid folder or archive file",
                path.display()
            ))
        }
    }
}

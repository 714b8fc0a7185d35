use clap::Args;
use miette::{Context, Result};
use mpak_archive::{
    fs::{export, Filesystem},
    Archive,
};
use std::path::{Path, PathBuf};
use tracing::info;

use super::dump::print_listing;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input MPAK file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// A target directory, created if missing; the root folder is created inside it
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        extract_file(&self.file, &self.directory, self.overwrite)
    }
}

/// Print the listing of the archive file `file` and unpack it below `directory`
pub fn extract_file(file: &Path, directory: &Path, overwrite: bool) -> Result<()> {
    let archive = Archive::load(file)?;
    let package = archive
        .package()
        .context(format!("reading {}", file.display()))?;

    print_listing(&package);

    info!("extracting into {}", directory.display());
    let mut filesystem = Filesystem::builder().overwrite(overwrite).build();
    export(&package, &mut filesystem, directory)
        .context(format!("extracting {}", file.display()))?;

    info!("package unarchived in {}", directory.display());
    Ok(())
}

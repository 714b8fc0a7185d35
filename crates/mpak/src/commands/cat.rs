use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use mpak_archive::Archive;
use std::{io::Write, path::PathBuf};

#[derive(Args)]
pub struct CatArgs {
    /// An input MPAK file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Path of a file inside the archive, separated by `/`
    #[arg(value_name = "PATH")]
    path: String,
}

impl CatArgs {
    pub fn handle(&self) -> Result<()> {
        let archive = Archive::load(&self.file)?;
        let package = archive
            .package()
            .context(format!("reading {}", self.file.display()))?;

        let contents = package
            .read(&self.path)
            .context(format!("looking up {}", self.path))?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(contents).into_diagnostic()?;
        stdout.flush().into_diagnostic()
    }
}

use clap::Args;
use miette::{Context, Result};
use mpak_archive::{Archive, Package};
use owo_colors::{OwoColorize, Stream};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

#[derive(Args)]
pub struct DumpArgs {
    /// An input MPAK file
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

fn print_field(label: &str, value: impl Display) {
    println!(
        "{} {}",
        label.if_supports_color(Stream::Stdout, |t| t.bold()),
        value
    );
}

/// Print the header fields and the folder tree
pub fn print_summary(package: &Package<'_>) {
    print_field("tag:", package.tag_str());
    print_field("structure size:", package.structure_size());
    print_field("data size:", package.data_size());
    print_field("root:", package.root().name());
    print!("{}", package.root().tree());
}

/// Print the tag and the folder tree
pub fn print_listing(package: &Package<'_>) {
    print_field("tag:", package.tag_str());
    print!("{}", package.root().tree());
}

/// Load an archive file and print its summary
pub fn dump_file(file: &Path) -> Result<()> {
    let archive = Archive::load(file)?;
    let package = archive
        .package()
        .context(format!("reading {}", file.display()))?;

    print_summary(&package);
    Ok(())
}

impl DumpArgs {
    pub fn handle(&self) -> Result<()> {
        dump_file(&self.file)
    }
}

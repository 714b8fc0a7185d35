use clap::Args;
use miette::{miette, Context, Result};
use mpak_archive::{
    fs::{import, Filesystem},
    types::DEFAULT_TAG,
    write::PackageWriterOptions,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Parse a 1 to 4 byte tag, padding short ones with NUL bytes
fn parse_tag(s: &str) -> Result<[u8; 4], String> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 4 {
        return Err(format!("tag must be 1 to 4 bytes, got {}", bytes.len()));
    }

    let mut tag = [0; 4];
    tag[..bytes.len()].copy_from_slice(bytes);
    Ok(tag)
}

/// Copy at most the first 4 bytes of `s`, padding short tags with NUL bytes
pub fn truncate_tag(s: &str) -> [u8; 4] {
    let bytes = &s.as_bytes()[..s.len().min(4)];

    let mut tag = [0; 4];
    tag[..bytes.len()].copy_from_slice(bytes);
    tag
}

/// `<dir>.mpak` next to the packed directory
pub fn default_output(directory: &Path) -> Result<PathBuf> {
    // Normalizes away trailing separators and `.` components
    let directory = directory.components().as_path();
    let name = directory
        .file_name()
        .ok_or_else(|| miette!("unable to name an archive after {}", directory.display()))?;

    let mut file_name = name.to_os_string();
    file_name.push(".mpak");
    Ok(directory.with_file_name(file_name))
}

#[derive(Args)]
pub struct PackArgs {
    /// An input directory
    #[arg(value_name = "DIR")]
    directory: PathBuf,

    /// Tag stored in the archive header, 1 to 4 bytes
    #[arg(value_name = "TAG", value_parser = parse_tag)]
    tag: Option<[u8; 4]>,

    /// A target MPAK file [default: <DIR>.mpak]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Pack entries in the order the filesystem lists them instead of by name
    #[arg(long, default_value_t = false)]
    unsorted: bool,

    /// Follow symbolic links instead of skipping them
    #[arg(long, default_value_t = false)]
    follow_links: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        let output = match &self.output {
            Some(output) => output.clone(),
            None => default_output(&self.directory)?,
        };

        let filesystem = Filesystem::builder()
            .sorted(!self.unsorted)
            .follow_links(self.follow_links)
            .build();

        pack_directory(
            &filesystem,
            &self.directory,
            self.tag.unwrap_or(DEFAULT_TAG),
            &output,
            self.overwrite,
        )
    }
}

/// Pack `directory` into the archive file `output`
pub fn pack_directory(
    filesystem: &Filesystem,
    directory: &Path,
    tag: [u8; 4],
    output: &Path,
    overwrite: bool,
) -> Result<()> {
    let options = PackageWriterOptions::builder().tag(tag).build();
    let package = import(filesystem, directory, options)
        .context(format!("packing {}", directory.display()))?;

    info!("creating {}", output.display());
    package
        .save(output, overwrite)
        .context(format!("creating {}", output.display()))?;

    info!(
        files = package.root().total_files(),
        structure_size = package.structure_size(),
        data_size = package.data_size(),
        "package created: {}",
        output.display()
    );
    Ok(())
}

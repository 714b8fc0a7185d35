pub mod cat;
pub mod detect;
pub mod dump;
pub mod extract;
pub mod pack;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Pack a directory into an MPAK file
    Pack(pack::PackArgs),
    /// Print the header and folder tree of an MPAK file
    Dump(dump::DumpArgs),
    /// Extract an MPAK file into a directory
    Extract(extract::ExtractArgs),
    /// Write a single file from an MPAK file to stdout
    Cat(cat::CatArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Pack(pack) => pack.handle(),
            Commands::Dump(dump) => dump.handle(),
            Commands::Extract(extract) => extract.handle(),
            Commands::Cat(cat) => cat.handle(),
        }
    }
}

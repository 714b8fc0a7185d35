use std::io::IsTerminal;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

const AFTER_HELP: &str = "\
Without a subcommand, `mpak <PATH> [TAG]` packs a directory into `<PATH>.mpak` and
`mpak <PATH> [-d]` lists an MPAK file, then extracts it into the current directory.";

#[derive(Parser)]
#[command(version, about, long_about = None, after_help = AFTER_HELP)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<commands::Commands>,

    #[command(flatten)]
    detect: commands::detect::DetectArgs,
}

fn main() -> Result<()> {
    better_panic::install();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Usage errors exit with 1, help and version still print to stdout and exit with 0
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    // stdout carries `cat` output, logs stay on stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_file(true)
                .with_line_number(true)
                .with_target(false)
                .without_time()
                .compact(),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .into_diagnostic()?;

    match &cli.command {
        Some(command) => command.handle(),
        None => cli.detect.handle(),
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;
    use std::path::Path;

    use crate::commands::Commands;
    use crate::Cli;

    #[test]
    fn bare_path_selects_detection() {
        let cli = Cli::try_parse_from(["mpak", "tree"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.detect.path.as_deref(), Some(Path::new("tree")));
        assert_eq!(cli.detect.tag, None);

        let cli = Cli::try_parse_from(["mpak", "tree", "GAME"]).unwrap();
        assert_eq!(cli.detect.tag.as_deref(), Some("GAME"));
    }

    #[test]
    fn dump_flag_follows_archive() {
        let cli = Cli::try_parse_from(["mpak", "tree.mpak", "-d"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.detect.dump);
        assert_eq!(cli.detect.tag, None);
    }

    #[test]
    fn subcommands_still_parse() {
        let cli = Cli::try_parse_from(["mpak", "pack", "tree", "GAME"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Pack(_))));

        let cli = Cli::try_parse_from(["mpak", "extract", "tree.mpak", "-C", "out"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Extract(_))));

        assert!(Cli::try_parse_from(["mpak", "extract", "tree.mpak", "-d"]).is_err());
    }

    #[test]
    fn missing_arguments_are_usage_errors() {
        let error = Cli::try_parse_from(["mpak"]).err().unwrap();
        assert!(error.use_stderr());
    }
}

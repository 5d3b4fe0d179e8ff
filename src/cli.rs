//! Command-line front end shared by the `unglue` and `untnd` tools.

use anyhow::{Context, Result};
use clap::error::{ContextKind, ErrorKind};
use clap::{CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

use crate::archive::{self, ArchiveKind, ExtractionSummary};
use crate::error::ArchiveError;
use crate::io::{DirectorySink, LocalFileReader};

pub use crate::archive::Command;

const HELP_TEMPLATE: &str = "\
{about-with-newline}
{name} {version}
Copyright (c) 2014, Sven Hesse (DrMcCoy) <drmccoy@drmccoy.de>
https://github.com/DrMcCoy/darkseed2-tools/

{usage-heading} {usage}

{all-args}{after-help}";

#[derive(Parser, Debug)]
#[command(version)]
#[command(arg_required_else_help = true)]
#[command(after_help = "Examples:\n  \
  unglue l GLUE.GLU          list the files in GLUE.GLU\n  \
  unglue x GLUE.GLU -d out   extract GLUE.GLU into ./out\n  \
  untnd x TEXT.TND           extract TEXT.TND into the current directory")]
pub struct Cli {
    /// Command to run
    #[arg(value_enum, value_name = "COMMAND")]
    pub command: Command,

    /// Archive file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Extract files into DIR instead of the current directory
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<PathBuf>,

    /// Log progress details to stderr (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn sink(&self) -> DirectorySink {
        self.extract_dir
            .as_ref()
            .map(DirectorySink::new)
            .unwrap_or_else(DirectorySink::current_dir)
    }

    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Argument parser for the tool handling `kind`
pub fn command(kind: ArchiveKind) -> clap::Command {
    Cli::command()
        .name(kind.tool_name())
        .bin_name(kind.tool_name())
        .about(kind.description())
        .help_template(HELP_TEMPLATE)
}

pub fn try_parse_from<I, T>(kind: ArchiveKind, args: I) -> std::result::Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command(kind).try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}

/// Exit code for a command line that did not parse
pub fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

/// Error text for a command line that did not parse, always ending in the
/// usage line
pub fn usage_error_text(kind: ArchiveKind, err: &clap::Error) -> String {
    let mut text = err.render().to_string();
    if err.get(ContextKind::Usage).is_none() {
        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push('\n');
        text.push_str(&command(kind).render_usage().to_string());
        text.push('\n');
    }
    text
}

/// Exit code for a failed run
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ArchiveError>()
        .map_or(1, ArchiveError::exit_code)
}

/// Install the stderr log subscriber; later calls are no-ops
pub fn init_tracing(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Open the archive named on the command line and carry out the command
pub async fn execute(cli: &Cli, kind: ArchiveKind) -> Result<ExtractionSummary> {
    let reader = LocalFileReader::new(&cli.file)
        .map_err(ArchiveError::from)
        .with_context(|| format!("Error opening file \"{}\"", cli.file.display()))?;

    let sink = cli.sink();
    let mut stdout = std::io::stdout().lock();

    let summary = archive::run(Arc::new(reader), kind, cli.command, &sink, &mut stdout)
        .await
        .map_err(|err| describe_failure(err, kind, &cli.file))?;

    if cli.command == Command::Extract {
        info!(
            extracted = summary.extracted,
            failed = summary.failed,
            "extraction finished"
        );
    }

    Ok(summary)
}

/// Attach the archive path to a failed run; only format errors claim the
/// file is not a valid archive
fn describe_failure(err: ArchiveError, kind: ArchiveKind, file: &Path) -> anyhow::Error {
    let context = match err {
        ArchiveError::InvalidHeader(_) | ArchiveError::CorruptArchive(_) => {
            format!("Not a valid {kind} archive: \"{}\"", file.display())
        }
        _ => format!("Error reading file \"{}\"", file.display()),
    };
    anyhow::Error::from(err).context(context)
}

/// Entry point of both tools
pub async fn main(kind: ArchiveKind) -> ExitCode {
    let cli = match try_parse_from(kind, std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let code = usage_exit_code(&err);
            if err.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand {
                // Bare invocation: help goes to stdout
                print!("{}", command(kind).render_help());
            } else if code == 0 {
                let _ = err.print();
            } else {
                eprint!("{}", usage_error_text(kind, &err));
            }
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.log_level());

    match execute(&cli, kind).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

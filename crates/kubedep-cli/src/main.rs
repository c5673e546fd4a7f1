mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_CONFLICT, EXIT_FAILURE, EXIT_FETCH_ERROR};
use kubedep_core::ConflictPolicy;
use kubedep_schema::{PlatformVersion, VersionError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "kubedep",
    version,
    about = "Convert the Godeps snapshot of a Kubernetes release into a dep manifest"
)]
struct Cli {
    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert a release's Godeps.json into a Gopkg.toml on stdout.
    Convert {
        /// Kubernetes release version, e.g. 1.14.0 or v1.14.0.
        #[arg(value_parser = parse_version)]
        version: PlatformVersion,
        /// Conversion profile TOML (defaults to the built-in Kubernetes profile).
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Read Godeps.json from a local file instead of fetching it.
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Deduce project roots from known hosts only; no go-get lookups.
        #[arg(long, default_value_t = false)]
        offline: bool,
        /// What to do when two packages of one project pin different revisions.
        #[arg(long, value_enum, default_value_t = ConflictArg::Reject)]
        on_conflict: ConflictArg,
        /// Emit the manifest as JSON instead of TOML.
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Write the manifest to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the built-in conversion profile, or validate a profile file.
    Profile {
        /// Profile file to validate.
        #[arg(long)]
        check: Option<PathBuf>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConflictArg {
    /// Fail the conversion.
    Reject,
    /// Keep the first revision in snapshot order.
    First,
    /// Keep the last revision in snapshot order.
    Last,
    /// Keep the lexicographically greatest revision.
    Greatest,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Reject => Self::Reject,
            ConflictArg::First => Self::First,
            ConflictArg::Last => Self::Last,
            ConflictArg::Greatest => Self::Greatest,
        }
    }
}

fn parse_version(input: &str) -> Result<PlatformVersion, VersionError> {
    PlatformVersion::parse(input)
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    // stdout carries the manifest; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("KUBEDEP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::Convert {
            version,
            profile,
            snapshot,
            offline,
            on_conflict,
            json,
            output,
        } => commands::convert::run(&commands::convert::ConvertRequest {
            version: &version,
            profile: profile.as_deref(),
            snapshot: snapshot.as_deref(),
            offline,
            conflict_policy: on_conflict.into(),
            json,
            output: output.as_deref(),
        }),
        Commands::Profile { check } => commands::profile::run(check.as_deref()),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("profile error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("fetch error:") || msg.starts_with("snapshot error:") {
                EXIT_FETCH_ERROR
            } else if msg.starts_with("conflict:") {
                EXIT_CONFLICT
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

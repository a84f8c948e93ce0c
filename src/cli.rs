use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// procdesc - process descriptions from annotated scripts
#[derive(Parser)]
#[command(name = "procdesc")]
#[command(about = "Parse script annotations and create process descriptions")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Script file plus an optional identifier override
#[derive(clap::Args, Debug, Clone)]
pub struct ScriptArgs {
    /// Annotated script file
    pub script: PathBuf,

    /// Script identifier (defaults to the file stem)
    #[arg(long)]
    pub id: Option<String>,
}

impl ScriptArgs {
    /// Identifier of the script
    pub fn script_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| script_id_from_path(&self.script))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the parsed annotations of a script
    Parse(ScriptArgs),
    /// Report every annotation problem of a script
    Validate(ScriptArgs),
    /// Print the process description of a script
    Describe(ScriptArgs),
    /// Print the download links a script advertises
    Links(ScriptArgs),
    /// Describe a batch of scripts, listing the rejected ones
    Catalog {
        /// Annotated script files
        #[arg(required = true)]
        scripts: Vec<PathBuf>,
    },
    /// Check a configuration file
    CheckConfig {
        /// Path to configuration file to check
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

/// Script identifier derived from a file name
pub fn script_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

use synthflow::data::InputSource;

mod cmd;

/// Exit status for invalid command-line usage.
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "synthflow")]
#[command(version, about = "Turn spoken or written instructions into robot program code")]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(false)
        .args(["text", "file"])
))]
pub struct Cli {
    /// Instruction text to synthesize
    #[arg(short, long)]
    pub text: Option<String>,

    /// FLAC recording of the instruction
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Configuration file (defaults to .synthflow/synthflow.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Project directory used to locate .synthflow/
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// File the generated code is merged into
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Write the final pipeline data as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the run report as JSON instead of the generated code
    #[arg(long)]
    pub report_json: bool,

    /// Print the stage table for the selected input and exit
    #[arg(long)]
    pub plan: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long)]
    pub verbose: bool,

    /// Only log warnings and hide progress bars
    #[arg(short, long)]
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Usage errors abort before any pipeline state exists.
    let input = match InputSource::from_options(cli.text.clone(), cli.file.clone()) {
        Ok(input) => input,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    match cmd::run_pipeline(&cli, input) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

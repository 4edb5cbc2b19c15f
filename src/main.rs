//! jcc CLI: drives the library's pure in-memory pipeline against real files.

use clap::{Parser as ClapParser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use jcc::assembly::{assemble, UnitOutput};
use jcc::preprocess::{FileLoader, LoadError};
use jcc::{compile_unit, Job, ProjectConfig};

#[derive(ClapParser)]
#[command(name = "jcc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "J source-to-source compiler front end", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one or more .j source files into a single joined target source file.
    Build {
        /// Input .j source files, compiled as one job.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file path (defaults to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to a TOML project config.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

struct FsLoader;

impl FileLoader for FsLoader {
    fn load(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        fs::read(path).map_err(|_| LoadError)
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build { inputs, output, config } => run_build(&inputs, output.as_deref(), config.as_deref()),
    }
}

fn run_build(inputs: &[PathBuf], output: Option<&std::path::Path>, config_path: Option<&std::path::Path>) {
    let config = match config_path {
        Some(path) => match fs::read_to_string(path).map_err(|e| e.to_string()).and_then(|s| ProjectConfig::from_toml(&s)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error reading config: {e}");
                process::exit(2);
            }
        },
        None => ProjectConfig::new(),
    };

    let job = Job::new();
    let loader = FsLoader;
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0);

    let mut units = Vec::new();
    let mut had_failure = false;

    for input in inputs {
        let unit_name = input.to_string_lossy().to_string();
        let source = match fs::read_to_string(input) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {}: {e}", input.display());
                process::exit(2);
            }
        };

        let outcome = compile_unit(&unit_name, &source, &loader, &config, &job, timestamp);
        for diagnostic in outcome.diagnostics.iter() {
            eprintln!("{diagnostic}");
        }
        if outcome.diagnostics.has_fatal() {
            eprintln!("fatal error in {unit_name}, aborting job");
            process::exit(1);
        }
        match outcome.body {
            Some(body) => units.push(UnitOutput { unit_name, body }),
            None => had_failure = true,
        }
    }

    if had_failure {
        process::exit(1);
    }

    let date = format!("unix-timestamp {timestamp}");
    let joined = assemble(&units, &job, "jcc generated output", &date);

    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, joined) {
                eprintln!("Error writing {}: {e}", path.display());
                process::exit(1);
            }
        }
        None => print!("{joined}"),
    }
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use simpsave::codec::literal;
use simpsave::{Config, ConfigError, EngineRegistry, SimpSave, Value};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Store(#[from] simpsave::Error),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser)]
#[command(name = "simpsave")]
#[command(about = "Type-preserving key-value storage over file, database and remote engines")]
struct Cli {
    /// Storage location: a file path, `:ss:<name>`, or a redis:// connection string
    #[arg(short, long, global = true, env = "SIMPSAVE_FILE")]
    file: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true, env = "SIMPSAVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a value given in literal syntax, e.g. `[1, 2]` or `{'a': 1.5}`
    Write {
        key: String,

        /// The value literal
        value: String,

        /// Store the argument as plain text instead of parsing it
        #[arg(long)]
        text: bool,
    },

    /// Print the value stored under a key
    Read {
        key: String,
    },

    /// Print whether a key exists
    Has {
        key: String,
    },

    /// Remove a key
    Remove {
        key: String,
    },

    /// Print every entry whose key matches a regular expression at its start
    Match {
        #[arg(default_value = "")]
        pattern: String,
    },

    /// Delete the whole storage target
    Delete,

    /// List every engine and whether it is available in this build
    Engines,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SIMPSAVE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<(), AppError> {
    use std::io::Write;

    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };
    let registry = EngineRegistry::with_config(&config);
    let store = SimpSave::with_registry(&registry, config);
    let file = cli.file.as_deref();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Write { key, value, text } => {
            let value = if text {
                Value::Str(value)
            } else {
                literal::parse(&value)?
            };
            let written = store.write(&key, &value, file)?;
            writeln!(out, "{}", written)?;
        }
        Commands::Read { key } => {
            let value = store.read(&key, file)?;
            writeln!(out, "{}", value)?;
        }
        Commands::Has { key } => {
            writeln!(out, "{}", store.has(&key, file)?)?;
        }
        Commands::Remove { key } => {
            writeln!(out, "{}", store.remove(&key, file)?)?;
        }
        Commands::Match { pattern } => {
            for (key, value) in store.match_keys(&pattern, file)? {
                writeln!(out, "{} = {}", key, value)?;
            }
        }
        Commands::Delete => {
            writeln!(out, "{}", store.delete(file)?)?;
        }
        Commands::Engines => {
            for descriptor in registry.descriptors() {
                let status = if descriptor.is_available() {
                    "available".to_string()
                } else {
                    format!("unavailable (enable the `{}` feature)", descriptor.feature)
                };
                let suffix = if descriptor.default_suffix.is_empty() {
                    "-"
                } else {
                    descriptor.default_suffix
                };
                writeln!(out, "{:<8} {:<10} {}", descriptor.name, suffix, status)?;
            }
        }
    }

    Ok(())
}

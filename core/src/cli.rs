use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::executor::{Interpreter, Val};
use crate::lexer;
use crate::parser::{self, semantic_validator};

#[derive(Parser)]
#[command(name = "tempo")]
#[command(about = "Tempo - A small embeddable scripting language", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum nesting of function calls (overrides config file and env vars)
    #[arg(long, global = true)]
    pub max_call_depth: Option<usize>,

    /// Refuse to load HTTP and registry modules
    #[arg(long, global = true)]
    pub no_remote: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script file
    Run {
        /// Script to run
        file: PathBuf,
    },

    /// Evaluate source text and print its completion value
    Eval {
        /// Source code to evaluate
        code: String,
    },

    /// Print the tokens of a script
    Tokens {
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the syntax tree of a script as JSON
    Ast {
        file: PathBuf,

        /// Single-line output
        #[arg(long)]
        compact: bool,
    },

    /// Parse and validate a script without running it
    Check {
        file: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::builder()
        .config_path(cli.config.clone())
        .max_call_depth(cli.max_call_depth)
        .allow_remote(cli.no_remote.then_some(false))
        .build()
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Internal function that handles CLI commands
fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load configuration up front so config errors surface before any output
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run { file } => {
            let mut interp = Interpreter::new(config);
            interp.run_file(&file)?;
        }

        Commands::Eval { code } => {
            let mut interp = Interpreter::new(config);
            let value = interp.run_source(&code, None)?;
            if !matches!(value, Val::Nil) {
                println!("{}", value.repr());
            }
        }

        Commands::Tokens { file, json } => {
            let source = read_source(&file)?;
            let tokens = lexer::tokenize(&source)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                for token in tokens {
                    println!(
                        "{}:{}\t{:?}\t{}",
                        token.position.line, token.position.column, token.kind, token.lexeme
                    );
                }
            }
        }

        Commands::Ast { file, compact } => {
            let source = read_source(&file)?;
            let program = parser::parse_program(&source)?;
            let json = if compact {
                serde_json::to_string(&program)?
            } else {
                serde_json::to_string_pretty(&program)?
            };
            println!("{}", json);
        }

        Commands::Check { file } => {
            let source = read_source(&file)?;
            let program = parser::parse_program(&source)?;
            let diagnostics = semantic_validator::validate_program(&program, &source);

            for diagnostic in &diagnostics {
                println!("{}: {}", file.display(), diagnostic);
            }

            let errors = diagnostics.iter().filter(|d| d.is_error()).count();
            if errors > 0 {
                anyhow::bail!("{} error(s) found in {}", errors, file.display());
            }
            if diagnostics.is_empty() {
                println!("✓ {} looks good", file.display());
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::parse_from([
            "tempo",
            "run",
            "main.tempo",
            "--max-call-depth",
            "64",
            "--no-remote",
        ]);
        assert_eq!(cli.max_call_depth, Some(64));
        assert!(cli.no_remote);
        assert!(matches!(cli.command, Commands::Run { ref file } if file == Path::new("main.tempo")));

        let config = load_config(&cli).unwrap();
        assert_eq!(config.interpreter.max_call_depth, 64);
        assert!(!config.modules.allow_remote);
    }

    #[test]
    fn test_check_reports_errors() {
        let mut file = tempfile::Builder::new().suffix(".tempo").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"return 1;").unwrap();
        let path = file.path().display().to_string();

        let result = run_cli_from_args(vec!["tempo".into(), "check".into(), path]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_surfaces_script_errors() {
        let mut file = tempfile::Builder::new().suffix(".tempo").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"var x = 1;\nundefinedName;").unwrap();
        let path = file.path().display().to_string();

        let err = run_cli_from_args(vec!["tempo".into(), "run".into(), path]).unwrap_err();
        let script_err = err
            .downcast_ref::<crate::errors::ScriptError>()
            .expect("script error");
        assert_eq!(
            script_err.kind,
            crate::errors::ErrorKind::UnresolvedIdentifier
        );
    }
}

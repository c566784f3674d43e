use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use spl::config::Config;
use spl::diagnostics::{self, CompileError};

#[derive(Parser)]
#[command(name = "spl", version, about = "Front end for the simple programming language")]
struct Cli {
    /// Configuration file to use (defaults to ./spl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an SPL source file and report diagnostics
    Parse {
        /// Source file path
        file: PathBuf,
        /// Dump the parsed syntax tree as JSON
        #[arg(long)]
        dump_ast: bool,
        /// Run the semantic checks on the parsed program
        #[arg(long)]
        check: bool,
    },
    /// Start the interactive read-eval-print loop
    Repl,
    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, CompileError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(),
    };

    match cli.command {
        Commands::Parse { file, dump_ast, check } => {
            let source = std::fs::read_to_string(&file)?;
            let mut parser = spl::parser::Parser::with_filename(&source, file.display().to_string());
            let (program, errors) = parser.parse_program();

            let mut failed = false;
            if !errors.is_empty() {
                diagnostics::render(&source, &errors);
                failed = true;
            }
            if check {
                let check_errors = spl::types::check(&program);
                if !check_errors.is_empty() {
                    diagnostics::render(&source, &check_errors);
                    failed = true;
                }
            }
            if dump_ast {
                match serde_json::to_string_pretty(&program) {
                    Ok(dump) => println!("{dump}"),
                    Err(_) => println!("{program:#?}"),
                }
            }
            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Commands::Repl => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            spl::repl::start(stdin.lock(), stdout.lock(), &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            print!(
                "# SPL front end configuration.\n\n\
                 [format]\n\
                 # Indentation width used by tree dumps.\n\
                 indent = {}\n",
                config.format.indent
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::{Args, Subcommand};
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use confexpr::environment::Environment;
use confexpr::error::ExprError;
use confexpr::expr::Expression;
use confexpr::literal::{LiteralParser, Literals};
use confexpr::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Configuration expression compiler and evaluator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Args, Debug)]
struct Input {
    /// File holding the expression
    filename: Option<PathBuf>,

    /// Inline expression text, used instead of a file
    #[arg(long, value_name = "TEXT")]
    expr: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes the input, printing each token
    Tokenize {
        #[command(flatten)]
        input: Input,

        /// Print tokens as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Compiles the input and prints its postfix and infix forms
    Parse {
        #[command(flatten)]
        input: Input,
    },

    /// Compiles and evaluates the input, printing the final value
    Evaluate {
        #[command(flatten)]
        input: Input,

        /// Pre-bind a variable to a literal (repeatable)
        #[arg(long = "var", value_name = "NAME=LITERAL")]
        vars: Vec<String>,
    },
}

/// Maps a file into memory and copies it out as UTF-8 text.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let length = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length files cannot be mapped.
    if length == 0 {
        return Ok(String::new());
    }

    // SAFETY: the mapping is read-only and dropped before returning; the file
    // is not expected to change while the CLI runs.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", filename))?;

    let text = std::str::from_utf8(&map)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", text.len(), filename);

    Ok(text)
}

/// Inline text wins over a file.  `None` when neither was given.
fn load_source(input: &Input) -> Result<Option<String>> {
    match (&input.expr, &input.filename) {
        (Some(text), _) => Ok(Some(text.clone())),
        (None, Some(filename)) => read_file(filename).map(Some),
        (None, None) => Ok(None),
    }
}

fn no_input() -> ! {
    info!("No input provided");

    println!("No input was provided. Exiting...");

    std::process::exit(0);
}

/// Exit code by error class: 65 for compile errors, 70 for runtime errors.
fn exit_code(e: &ExprError) -> i32 {
    match e {
        ExprError::BadExpression(_) => 65,
        _ => 70,
    }
}

/// `NAME=LITERAL` → variable binding, using the default literal sub-parser.
fn bind(env: &mut Environment, binding: &str) -> Result<()> {
    let (name, literal) = binding
        .split_once('=')
        .with_context(|| format!("--var expects NAME=LITERAL, got '{}'", binding))?;

    let mut cursor = Scanner::tokenize(literal.as_bytes())
        .with_context(|| format!("Failed to scan literal for '{}'", name))?;

    let value = Literals
        .parse(&mut cursor)
        .with_context(|| format!("Failed to parse literal for '{}'", name))?;

    debug!("Binding {} = {}", name, value);

    env.set(name.trim(), value);

    Ok(())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'confexpr::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("confexpr::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { input, json } => {
            info!("Running Tokenize subcommand");

            let Some(source) = load_source(&input)? else {
                no_input();
            };

            let mut tokenized = true;

            for token in Scanner::new(source.as_bytes()) {
                match token {
                    Ok(token) if json => println!("{}", serde_json::to_string(&token)?),

                    Ok(token) => println!("{}", token),

                    Err(e) => {
                        tokenized = false;
                        debug!("Tokenization debug: {}", e);
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { input } => {
            info!("Running Parse subcommand");

            let Some(source) = load_source(&input)? else {
                no_input();
            };

            match Expression::parse(&source) {
                Ok(expr) => {
                    println!("{}", expr.postfix_str());
                    println!("{}", expr.infix_str());
                }

                Err(e) => {
                    debug!("Parse debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(exit_code(&e));
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { input, vars } => {
            info!("Running Evaluate subcommand");

            let Some(source) = load_source(&input)? else {
                no_input();
            };

            let mut env = Environment::new();
            for binding in &vars {
                bind(&mut env, binding)?;
            }

            let expr = match Expression::parse(&source) {
                Ok(expr) => expr,
                Err(e) => {
                    debug!("Parse debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(exit_code(&e));
                }
            };

            match expr.evaluate(&mut env) {
                Ok(Some(value)) => println!("{}", value),

                Ok(None) => println!("<unresolved>"),

                Err(e) => {
                    debug!("Evaluation debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(exit_code(&e));
                }
            }

            info!("Evaluate subcommand completed");
        }
    }

    Ok(())
}

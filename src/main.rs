use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use dragon::ast_printer::AstPrinter;
use dragon::interpreter::{Config, DEFAULT_MAX_CALL_DEPTH};
use dragon::parser::Parser;
use dragon::runner::{Runner, StderrReporter};
use dragon::scanner::{self, Scanner};
use dragon::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Dragon language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,

    /// Nested calls allowed before a stack overflow is reported
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_depth: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Runs input from a file as a Dragon program
    Run { filename: Option<PathBuf> },
}

/// Maps the file and copies it out as UTF‑8 text.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length mappings are rejected on some platforms.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is only read, and copied out before this function returns.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", filename))?;

    let text = std::str::from_utf8(&map)
        .with_context(|| format!("File {:?} is not valid UTF-8", filename))?
        .to_owned();

    info!("Read {} bytes from {:?}", text.len(), filename);

    Ok(text)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("dragon::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    let source = read_file(filename)?;
    let mut tokens: Vec<Token> = Vec::new();
    let mut tokenized = true;

    for item in Scanner::new(&source) {
        match item {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if json {
        let rendered = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", rendered);
    }

    Ok(if tokenized { 0 } else { 65 })
}

fn parse(filename: &Path) -> Result<i32> {
    let source = read_file(filename)?;
    let (tokens, lex_errors) = scanner::scan(&source);

    if !lex_errors.is_empty() {
        for e in &lex_errors {
            eprintln!("{}", e);
        }
        return Ok(65);
    }

    match Parser::new(tokens).parse_expression() {
        Ok(expr) => {
            let ast_str = AstPrinter::print(&expr);
            debug!("AST: {}", ast_str);
            println!("{}", ast_str);
            Ok(0)
        }

        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }
            Ok(65)
        }
    }
}

fn run(filename: &Path, max_depth: usize) -> Result<i32> {
    let source = read_file(filename)?;

    let config = Config {
        base_dir: filename
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        max_call_depth: max_depth,
        ..Config::default()
    };

    let mut runner = Runner::new(config, StderrReporter);
    let outcome = runner.run_source(&source);

    info!("Run finished: {:?}", outcome);

    Ok(outcome.exit_code())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let filename = match &args.commands {
        Commands::Tokenize { filename, .. }
        | Commands::Parse { filename }
        | Commands::Run { filename } => filename.clone(),
    };

    let Some(filename) = filename else {
        info!("No filepath provided");
        println!("No input filepath was provided. Exiting...");
        return Ok(());
    };

    let code = match args.commands {
        Commands::Tokenize { json, .. } => tokenize(&filename, json)?,
        Commands::Parse { .. } => parse(&filename)?,
        Commands::Run { .. } => run(&filename, args.max_depth)?,
    };

    if code != 0 {
        debug!("Exiting with code {}", code);
        std::process::exit(code);
    }

    Ok(())
}

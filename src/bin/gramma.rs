//! Command-line interface for gramma
//! Parses sample-language files with the engine and prints the results.
//!
//! Usage:
//!   gramma parse `<path>` [--format json|yaml] [--resilient] [--max-errors N] [--config FILE]
//!   gramma tokens `<path>`                                  - Print the token stream

use clap::{Arg, ArgAction, ArgMatches, Command};
use gramma::peg::config::{Loader, ParserConfig};
use gramma::peg::result::ParseResult;
use gramma::sample::{self, Node};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    init_logging();

    let matches = Command::new("gramma")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parse sample-language files with the gramma engine")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("parse")
                .about("Parse a file and print the result")
                .arg(
                    Arg::new("path")
                        .help("Path to the source file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["json", "yaml"])
                        .default_value("json"),
                )
                .arg(
                    Arg::new("resilient")
                        .long("resilient")
                        .help("Recover from errors and keep parsing")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("max-errors")
                        .long("max-errors")
                        .help("Maximum number of errors to record (0 is unlimited)")
                        .value_parser(clap::value_parser!(i64).range(0..)),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .help("TOML file layered over the built-in configuration"),
                ),
        )
        .subcommand(
            Command::new("tokens").about("Print the token stream").arg(
                Arg::new("path")
                    .help("Path to the source file")
                    .required(true)
                    .index(1),
            ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("parse", parse_matches)) => handle_parse_command(parse_matches),
        Some(("tokens", tokens_matches)) => {
            let path = tokens_matches.get_one::<String>("path").unwrap();
            handle_tokens_command(path);
        }
        _ => unreachable!(),
    }
}

/// `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &str) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file: {}", e);
        std::process::exit(1);
    })
}

fn load_config(matches: &ArgMatches) -> Result<ParserConfig, config::ConfigError> {
    let mut loader: Loader = sample::config_loader();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if matches.get_flag("resilient") {
        loader = loader.set_override("error_recovery.mode", "resilient")?;
    }
    if let Some(max_errors) = matches.get_one::<i64>("max-errors") {
        loader = loader.set_override("error_recovery.max_errors", *max_errors)?;
    }
    loader.build()
}

/// Handle the parse command
fn handle_parse_command(matches: &ArgMatches) {
    let path = matches.get_one::<String>("path").unwrap();
    let format = matches.get_one::<String>("format").unwrap();

    let config = load_config(matches).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });
    let source = read_source(path);
    let result = sample::parse_source(&source, config).unwrap_or_else(|e| {
        eprintln!("Grammar error: {}", e);
        std::process::exit(1);
    });

    let output = serialize(&result, format).unwrap_or_else(|e| {
        eprintln!("Serialization error: {}", e);
        std::process::exit(1);
    });
    print!("{}", output);

    for error in &result.errors {
        eprintln!("{}: {}", path, error);
    }
    if !result.is_ok() {
        std::process::exit(2);
    }
}

fn serialize(result: &ParseResult<Node>, format: &str) -> Result<String, String> {
    match format {
        "yaml" => serde_yaml::to_string(result).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(result)
            .map(|json| json + "\n")
            .map_err(|e| e.to_string()),
    }
}

/// Handle the tokens command
fn handle_tokens_command(path: &str) {
    let source = read_source(path);
    for token in sample::tokenize(&source) {
        println!("{:<10} {:<8} {:?}", token.kind, token.span.to_string(), token.text());
    }
}

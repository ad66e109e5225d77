// Command-line interface for mdattr
//
// Renders Markdown files to HTML, applying `{.class #id key=value}` attribute annotations.
// All the work is done by the mdattr library; this binary reads files, loads configuration,
// sets up logging and prints.
//
// Usage:
//  mdattr render <input> [-o <file>] [--standalone] [--title <title>]  - Render to HTML
//  mdattr parse <annotation>                                          - Show parsed attributes as JSON
//  mdattr inspect <input>                                             - Show per-block outcomes as JSON
//
// Global options:
//  --config <path>   Layer a mdattr.toml on top of the defaults (./mdattr.toml is always tried)
//  -v, --verbose     More logging on stderr (-vv for trace). RUST_LOG takes precedence.

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use mdattr::{grammar, parse_annotation, wrap_in_document, ComrakRenderer, Postprocessor, RenderOptions};
use mdattr_config::{Loader, MdattrConfig};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn build_cli() -> Command {
    Command::new("mdattr")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render Markdown with attribute annotations")
        .long_about(
            "mdattr renders Markdown to HTML and applies attribute annotations written next\n\
            to the content: {.class #id key=value}.\n\n\
            Examples:\n  \
            mdattr render notes.md                     # HTML fragment to stdout\n  \
            mdattr render notes.md --standalone -o out.html\n  \
            mdattr parse '{.note #intro data-x=1}'     # Parsed attributes as JSON\n  \
            mdattr inspect notes.md                    # What happened to each block",
        )
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a mdattr.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more on stderr (-vv for trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("render")
                .about("Render a Markdown file to HTML")
                .arg(
                    Arg::new("input")
                        .help("Input Markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("standalone")
                        .long("standalone")
                        .help("Wrap the output in a complete HTML document")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("title")
                        .long("title")
                        .help("Document title for --standalone (defaults to the file name)")
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse a single annotation and print its attributes as JSON")
                .arg(
                    Arg::new("annotation")
                        .help("Annotation text, braces included: '{.a #b c=1}'")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Render a Markdown file and print what happened to each block as JSON")
                .arg(
                    Arg::new("input")
                        .help("Input Markdown file")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                ),
        )
}

fn main() {
    let matches = build_cli().get_matches();

    init_logging(matches.get_count("verbose"));

    let config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));

    match matches.subcommand() {
        Some(("render", sub_matches)) => handle_render_command(sub_matches, &config),
        Some(("parse", sub_matches)) => {
            let text = sub_matches
                .get_one::<String>("annotation")
                .map(|s| s.as_str())
                .unwrap_or_default();
            handle_parse_command(text);
        }
        Some(("inspect", sub_matches)) => {
            let input = sub_matches
                .get_one::<String>("input")
                .map(|s| s.as_str())
                .unwrap_or_default();
            handle_inspect_command(input, &config);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_cli_config(explicit_path: Option<&str>) -> MdattrConfig {
    let loader = Loader::new().with_project_file();
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

fn postprocessor_from_config(config: &MdattrConfig) -> Postprocessor {
    let renderer = ComrakRenderer::new(RenderOptions::from(&config.render));
    Postprocessor::new(renderer, config.postprocess_options())
}

fn read_input(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    })
}

fn handle_render_command(matches: &ArgMatches, config: &MdattrConfig) {
    let Some(input) = matches.get_one::<String>("input") else {
        eprintln!("Error: an input file is required");
        std::process::exit(1);
    };
    let source = read_input(input);

    let rendered = postprocessor_from_config(config)
        .render(&source, input)
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });
    tracing::info!(
        input = %input,
        applied = rendered.report.applied(),
        "rendered"
    );

    let standalone = matches.get_flag("standalone") || config.output.standalone;
    let html = if standalone {
        let title = document_title(matches.get_one::<String>("title"), config, input);
        wrap_in_document(&rendered.html, &title)
    } else {
        rendered.html
    };

    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, html).unwrap_or_else(|e| {
            eprintln!("Error writing file '{path}': {e}");
            std::process::exit(1);
        }),
        None => print!("{html}"),
    }
}

/// `--title`, then the configured title, then the input's file stem.
fn document_title(flag: Option<&String>, config: &MdattrConfig, input: &str) -> String {
    if let Some(title) = flag {
        return title.clone();
    }
    if !config.output.title.is_empty() {
        return config.output.title.clone();
    }
    Path::new(input)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_string())
}

fn handle_parse_command(text: &str) {
    if !grammar::is_standalone(text) {
        eprintln!("Error: '{text}' is not an annotation (expected something like '{{.class #id}}')");
        std::process::exit(1);
    }
    print_json(&parse_annotation(text));
}

#[derive(Serialize)]
struct InspectOutput<'a> {
    path: &'a str,
    #[serde(flatten)]
    report: &'a mdattr::RenderReport,
}

fn handle_inspect_command(input: &str, config: &MdattrConfig) {
    let source = read_input(input);
    let rendered = postprocessor_from_config(config)
        .render(&source, input)
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });

    print_json(&InspectOutput {
        path: input,
        report: &rendered.report,
    });
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Serialization error: {e}");
            std::process::exit(1);
        }
    }
}

// Command-line interface for richdoc
//
// This binary converts between markdown (with the editor's variable, mention and
// checklist tokens), plain text and document JSON, and exposes the engine's
// other entry points for scripting and debugging.
//
// Usage:
//  richdoc <input> --to <format> [--from <format>] [--output <file>]  - Convert between formats (default)
//  richdoc convert <input> --to <format> [--from <format>] [-o <file>] - Same as above (explicit)
//  richdoc normalize <input> [--from <format>] [-o <file>]             - Normalize, write document JSON
//  richdoc checklists <input>                                          - List checklist items as JSON
//  richdoc paste <text-file> [--json <file>]                           - Run the clipboard paste path
//  richdoc inspect <input> [<transform>]                               - View the parsed document
//
// Global options:
//  --config <path>   layer a richdoc.toml over the built-in defaults
//  --plain           read and write with markdown syntax disabled
//
// Logging goes to stderr and is controlled by RICHDOC_LOG (e.g. RICHDOC_LOG=debug).

mod transforms;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use richdoc::clipboard::{from_clipboard, ClipboardPayload};
use richdoc::{extract_checklists, normalize, serialize_with, Document, FormatRegistry};
use richdoc_config::{Loader, RichdocConfig};
use std::fs;
use tracing_subscriber::EnvFilter;

const SUBCOMMANDS: &[&str] = &["convert", "normalize", "checklists", "paste", "inspect", "help"];

fn build_cli() -> Command {
    Command::new("richdoc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert rich-text documents between markdown, plain text and JSON")
        .long_about(
            "richdoc reads and writes the document model of a rich-text editor.\n\n\
            Markdown input may carry the editor's own tokens:\n  \
            {{apiName}}                  variable (resolved against configured variables)\n  \
            [name|userId]                mention\n  \
            [clist:list|item]..[/clist]  checklist item\n  \
            ![name](url)                 attachment\n\n\
            Examples:\n  \
            richdoc notes.md --to json               # Markdown to document JSON (stdout)\n  \
            richdoc doc.json --to markdown -o out.md # JSON back to markdown\n  \
            richdoc inspect notes.md blocks          # One line per parsed block",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a richdoc.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("plain")
                .long("plain")
                .help("Disable markdown syntax when reading and writing")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between document formats (default command)")
                .long_about(
                    "Convert documents between formats.\n\n\
                    Supported formats:\n  \
                    - markdown: Markdown with tokens (.md)\n  \
                    - plain:    Tokens only (.txt)\n  \
                    - json:     Document model (.json)\n\n\
                    The source format is auto-detected from the file extension.\n\
                    Output goes to stdout by default, or use -o to specify a file.",
                )
                .arg(input_arg())
                .arg(from_arg())
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("normalize")
                .about("Normalize a document and write it as JSON")
                .arg(input_arg())
                .arg(from_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("checklists")
                .about("List the checklist items of a markdown file as JSON")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("paste")
                .about("Convert clipboard content the way a paste would")
                .long_about(
                    "Runs the paste path on a plain-text file, optionally together with the\n\
                    document JSON a copy from the editor places on the clipboard.\n\n\
                    Prints the resulting document JSON, or nothing when the content holds\n\
                    no variable tokens and would be pasted as-is.",
                )
                .arg(input_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .value_name("PATH")
                        .help("Document JSON offered alongside the text")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Inspect the document a markdown file parses to")
                .arg(input_arg())
                .arg(
                    Arg::new("transform")
                        .help("View to render. Defaults to 'blocks'")
                        .required(false)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            transforms::AVAILABLE_TRANSFORMS,
                        ))
                        .index(2)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("normalize")
                        .long("normalize")
                        .help("Normalize the document before rendering")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input file path")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn from_arg() -> Arg {
    Arg::new("from")
        .long("from")
        .help("Source format (auto-detected from file extension if not specified)")
        .value_hint(ValueHint::Other)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .help("Output file path (defaults to stdout)")
        .value_hint(ValueHint::FilePath)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RICHDOC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&args) {
        Ok(m) => m,
        Err(e) => {
            // A bare file argument means the default convert command.
            if args.len() > 1 && !args[1].starts_with('-') && !SUBCOMMANDS.contains(&args[1].as_str())
            {
                let mut new_args = vec![args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&args[1..]);
                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    if let Err(err) = run(&matches) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_cli_config(
        matches.get_one::<String>("config").map(|s| s.as_str()),
        matches.get_flag("plain"),
    )?;

    match matches.subcommand() {
        Some(("convert", sub)) => {
            let input = required(sub, "input")?;
            let to = required(sub, "to")?;
            let from = resolve_from(sub, input)?;
            handle_convert_command(input, &from, to, output_path(sub), &config)
        }
        Some(("normalize", sub)) => {
            let input = required(sub, "input")?;
            let from = resolve_from(sub, input)?;
            handle_normalize_command(input, &from, output_path(sub), &config)
        }
        Some(("checklists", sub)) => handle_checklists_command(required(sub, "input")?),
        Some(("paste", sub)) => handle_paste_command(
            required(sub, "input")?,
            sub.get_one::<String>("json").map(|s| s.as_str()),
            &config,
        ),
        Some(("inspect", sub)) => {
            let transform = sub
                .get_one::<String>("transform")
                .map(|s| s.as_str())
                .unwrap_or("blocks");
            handle_inspect_command(
                required(sub, "input")?,
                transform,
                sub.get_flag("normalize"),
                &config,
            )
        }
        _ => bail!("Unknown subcommand. Use --help for usage information."),
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(|s| s.as_str())
        .with_context(|| format!("missing argument '{name}'"))
}

fn output_path(matches: &ArgMatches) -> Option<&str> {
    matches.get_one::<String>("output").map(|s| s.as_str())
}

/// Explicit `--from`, or the format the input's extension maps to.
fn resolve_from(matches: &ArgMatches, input: &str) -> Result<String> {
    if let Some(from) = matches.get_one::<String>("from") {
        return Ok(from.clone());
    }
    FormatRegistry::default()
        .detect_format_from_filename(input)
        .with_context(|| {
            format!("Could not detect format from filename '{input}'. Please specify --from explicitly")
        })
}

fn read_input(path: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Error reading file '{path}'"))
}

fn write_output(output: Option<&str>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text).with_context(|| format!("Error writing file '{path}'")),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn load_document(input: &str, from: &str, config: &RichdocConfig) -> Result<Document> {
    let registry = FormatRegistry::default();
    let source = read_input(input)?;
    registry
        .parse(&source, from, &config.parse_context())
        .with_context(|| format!("Parse error in '{input}'"))
}

/// Handle the convert command
fn handle_convert_command(
    input: &str,
    from: &str,
    to: &str,
    output: Option<&str>,
    config: &RichdocConfig,
) -> Result<()> {
    let registry = FormatRegistry::default();
    registry.get(from)?;
    registry.get(to)?;

    let doc = load_document(input, from, config)?;
    tracing::debug!(input, from, to, blocks = doc.blocks().len(), "converting");

    // Markdown output honors the configured serializer settings.
    let text = if to == "markdown" {
        serialize_with(&doc, &config.serialize_options())
    } else {
        registry.serialize(&doc, to).context("Serialization error")?
    };
    write_output(output, &text)
}

fn handle_normalize_command(
    input: &str,
    from: &str,
    output: Option<&str>,
    config: &RichdocConfig,
) -> Result<()> {
    let doc = normalize(load_document(input, from, config)?);
    let json = serde_json::to_string_pretty(&doc).context("JSON serialization failed")?;
    write_output(output, &json)
}

fn handle_checklists_command(input: &str) -> Result<()> {
    let source = read_input(input)?;
    let entries = extract_checklists(&source);
    let json = serde_json::to_string_pretty(&entries).context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

fn handle_paste_command(input: &str, json: Option<&str>, config: &RichdocConfig) -> Result<()> {
    let payload = ClipboardPayload {
        document_json: json.map(read_input).transpose()?,
        plain_text: read_input(input)?,
    };
    let context = config.parse_context();
    match from_clipboard(&payload, &context.variables, context.markdown_enabled) {
        Some(doc) => {
            let json = serde_json::to_string_pretty(&doc).context("JSON serialization failed")?;
            println!("{json}");
        }
        None => tracing::info!(input, "no variable tokens; content pastes as-is"),
    }
    Ok(())
}

/// Handle the inspect command
fn handle_inspect_command(
    input: &str,
    transform: &str,
    normalized: bool,
    config: &RichdocConfig,
) -> Result<()> {
    let source = read_input(input)?;
    let output =
        transforms::execute_transform(&source, transform, &config.parse_context(), normalized)
            .map_err(anyhow::Error::msg)
            .context("Execution error")?;
    print!("{output}");
    Ok(())
}

fn load_cli_config(explicit_path: Option<&str>, plain: bool) -> Result<RichdocConfig> {
    let loader = Loader::new().with_optional_file("richdoc.toml");
    let mut loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };
    if plain {
        loader = loader
            .set_override("parse.markdown_enabled", false)?
            .set_override("serialize.markdown_enabled", false)?;
    }
    loader.build().context("Failed to load configuration")
}

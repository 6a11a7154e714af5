use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the transforms from src/transforms.rs
// We need to duplicate this here since build scripts can't access src/ modules
const AVAILABLE_TRANSFORMS: &[&str] = &["blocks", "json", "plain-text", "entities", "roundtrip"];

fn input() -> Arg {
    Arg::new("input")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("richdoc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert rich-text documents between markdown, plain text and JSON")
        .arg(
            Arg::new("config")
                .long("config")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("plain")
                .long("plain")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .arg(input())
                .arg(Arg::new("from").long("from"))
                .arg(Arg::new("to").long("to").required(true))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("normalize")
                .arg(input())
                .arg(Arg::new("from").long("from"))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(Command::new("checklists").arg(input()))
        .subcommand(
            Command::new("paste").arg(input()).arg(
                Arg::new("json")
                    .long("json")
                    .value_hint(ValueHint::FilePath),
            ),
        )
        .subcommand(
            Command::new("inspect")
                .arg(input())
                .arg(
                    Arg::new("transform")
                        .index(2)
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            AVAILABLE_TRANSFORMS,
                        )),
                )
                .arg(
                    Arg::new("normalize")
                        .long("normalize")
                        .action(ArgAction::SetTrue),
                ),
        );

    generate_to(Bash, &mut cmd, "richdoc", &outdir)?;
    generate_to(Zsh, &mut cmd, "richdoc", &outdir)?;
    generate_to(Fish, &mut cmd, "richdoc", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}

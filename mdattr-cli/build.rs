use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of build_cli() in src/main.rs, help texts left out.
// Build scripts can't access src/ modules.
fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let input = || {
        Arg::new("input")
            .required(true)
            .index(1)
            .value_hint(ValueHint::FilePath)
    };

    let mut cmd = Command::new("mdattr")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render Markdown with attribute annotations")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("render")
                .about("Render a Markdown file to HTML")
                .arg(input())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("standalone")
                        .long("standalone")
                        .action(ArgAction::SetTrue),
                )
                .arg(Arg::new("title").long("title").value_hint(ValueHint::Other)),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse a single annotation and print its attributes as JSON")
                .arg(Arg::new("annotation").required(true).index(1)),
        )
        .subcommand(
            Command::new("inspect")
                .about("Render a Markdown file and print what happened to each block as JSON")
                .arg(input()),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "mdattr", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "mdattr", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "mdattr", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}

use crate::CLAP_STYLING;
use articulate_scanner_core::verify::MAX_WORKERS;
use clap::{arg, value_parser};

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("articulate-scanner")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("articulate-scanner")
        .about("Extract and verify external links in Articulate Rise courses")
        .styles(CLAP_STYLING)
        .arg(
            arg!(<URL>)
                .help("Root course URL, e.g. https://rise.articulate.com/share/<id>")
                .required(true),
        )
        .arg(
            arg!(--"max-depth" <DEPTH>)
                .required(false)
                .help("Maximum depth for following linked Rise courses")
                .value_parser(value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            arg!(--"no-verify")
                .required(false)
                .help("Skip URL verification")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"no-headless")
                .required(false)
                .help("Show the browser window while rendering")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"max-workers" <NUM_WORKERS>)
                .required(false)
                .help("Maximum concurrent verification requests (1-1024)")
                .value_parser(value_parser!(u64).range(1..=MAX_WORKERS as u64))
                .default_value("10"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Per-request verification timeout in seconds")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("10"),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Report format: text, json")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress output")
                .required(false)
                .action(clap::ArgAction::SetTrue),
        )
}

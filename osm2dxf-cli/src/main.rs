//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::error::Error as _;

use osm2dxf_cli::CliError;

fn main() {
    if let Err(err) = osm2dxf_cli::run() {
        if let CliError::ArgumentParsing(clap_err) = &err {
            // Help and version requests also arrive here.
            clap_err.exit();
        }
        eprintln!("osm2dxf: {err}");
        if let CliError::Convert(convert) = &err {
            let mut cause = convert.source();
            while let Some(inner) = cause {
                eprintln!("  caused by: {inner}");
                cause = inner.source();
            }
        }
        std::process::exit(1);
    }
}

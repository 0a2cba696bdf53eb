use std::process::ExitCode;

use clap::Parser;

use sliceview::cli::{self, CliArgs};
use sliceview::logger;

fn main() -> ExitCode {
    logger::init();
    let args = CliArgs::parse();
    cli::run(args)
}

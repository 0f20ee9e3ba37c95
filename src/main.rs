use std::process::ExitCode;

use clap::Parser;
use filtermix::cli::{self, CliArgs};
use filtermix::logger::{self, Level, LogConfig};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Session log (overwrites the previous run's log)
    logger::init(&LogConfig {
        path: args.log_file.clone(),
        min_level: if args.verbose { Level::Debug } else { Level::Info },
    });

    cli::run(args)
}

// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use paf_pose::cli::args::{Cli, Commands};
use paf_pose::cli::{logging, run};
use paf_pose::error;

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => {
            logging::init(args.verbose);
            run::run_batch(args)
        }
        Commands::Frame(args) => {
            logging::init(args.verbose);
            run::run_frame(args)
        }
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}

mod parser;

use parser::Args;

use clap::Parser;
use env_logger::Env;
use log::error;

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let result = args
        .run_parameters()
        .and_then(|params| heap_volume::make_report(&args.input_paths(), &args.output_paths(), &params));

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

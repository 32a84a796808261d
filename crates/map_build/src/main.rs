use std::env;
use std::process::ExitCode;

use map_build::{parse_args, run_build, usage_text, CliCommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    match parse_args(&args)? {
        CliCommand::Help => {
            println!("{}", usage_text());
            Ok(())
        }
        CliCommand::Build {
            input,
            output,
            options,
        } => {
            let summary = run_build(&input, &output, &options).inspect_err(|message| {
                error!(input_path = %input.display(), %message, "map_build_failed");
            })?;
            info!(
                source = %summary.source_name,
                width_areas = summary.compiled.dimensions.width_areas,
                height_areas = summary.compiled.dimensions.height_areas,
                output_path = %summary.output_path.display(),
                "map_build_finished"
            );
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

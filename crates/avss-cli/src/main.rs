use avss_cli::{
    actions::run,
    opts::{AvssOpts, Command},
};

use gumdrop::Options;
use std::process;
use threshold_primitives::curve::bls12377::G1Curve;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = AvssOpts::parse_args_default_or_exit();

    let command = opts.command.unwrap_or_else(|| {
        eprintln!("No command was provided.");
        eprintln!("{}", AvssOpts::usage());
        process::exit(2)
    });

    let result = match command {
        Command::Run(opts) => run::<G1Curve>(opts),
    };
    if let Err(err) = result {
        eprintln!("command failed: {:#}", err);
        process::exit(1);
    }
}

// CLI binary entry point for tagstream

mod cli;

use std::process;

use clap::Parser;

fn main() {
    let config = cli::Config::parse();
    cli::init_logging(&config);

    if let Err(e) = cli::run(config) {
        eprintln!("✗ {:#}", e);
        process::exit(1);
    }
}

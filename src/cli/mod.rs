// CLI module for tagstream
//
// Command-line front end over the library; only compiled into the binary.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config};
pub use output::OutputFormatter;

/// Initialise logging; `RUST_LOG` takes precedence over the flags.
pub fn init_logging(config: &Config) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level()))
        .format_timestamp(None)
        .init();
}

/// Run the selected subcommand.
pub fn run(config: Config) -> anyhow::Result<()> {
    let options = config.decode_options()?;
    let formatter = OutputFormatter::new(config.format, config.quiet);

    match &config.command {
        Commands::Read { files, fields, output } => {
            commands::command_read(files, fields.as_deref(), output.as_deref(), &options, &formatter)
        }
        Commands::Detect { files } => commands::command_detect(files, &options, &formatter),
        Commands::Info { files, detailed } => commands::command_info(files, *detailed, &options, &formatter),
        Commands::ExportCover { file, output, index } => {
            commands::command_export_cover(file, output, *index, &options, &formatter)
        }
        Commands::Batch { directory, pattern } => commands::command_batch(directory, pattern, &options, &formatter),
    }
}

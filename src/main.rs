use anyhow::Result;
use clap::Parser;
use clipstitch::app::{run_probe_command, run_process_command, run_record_command, Reporter};
use clipstitch::cli::{Cli, Commands};
use clipstitch::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    clipstitch::init_logging();

    let reporter = Reporter::new(cli.json);
    let config = Config::load_or_default(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Record { front } => run_record_command(config, front, reporter).await,
        Commands::Process { clips } => run_process_command(config, clips, reporter).await,
        Commands::Probe { file } => run_probe_command(config, &file).await,
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if cli.json => {
            reporter.error(e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

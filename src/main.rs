use anyhow::Result;
use clap::Parser;
use markmap_kit::cli::{self, Cli};
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli::load_config(&cli)?;

    // CLI --log-level flag takes highest precedence, then RUST_LOG, then config.
    markmap_kit::debug::init_log_bridge(
        cli.log_level.map(cli::LogLevelArg::to_level_filter),
        config.log_level.to_level_filter(),
    );

    log::info!("Starting markmap-kit {}", markmap_kit::VERSION);

    // Renderer processes and the bridge run on this runtime.
    let runtime = Runtime::new()?;

    let code = match cli::run(cli, config, &runtime) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("markmap-kit: error: {e:#}");
            1
        }
    };

    // Don't block on a renderer that ignored shutdown.
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

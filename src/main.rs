// Entrypoint: load configuration, build the uploader and hand it to the
// directory watcher. Runs until Ctrl-C; a second Ctrl-C exits at once.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;

use apivideo_drop::api::ApiClient;
use apivideo_drop::auth::Credentials;
use apivideo_drop::config::{Cli, Config};
use apivideo_drop::uploader::Uploader;
use apivideo_drop::watcher::DirectoryWatcher;

fn main() -> anyhow::Result<()> {
    // a missing .env is fine, the variables may come from the environment
    let _ = dotenvy::dotenv();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_cli(Cli::parse())?;

    let api = ApiClient::new(&config.base_url, &config.api_key, config.timeout)
        .context("Failed to build HTTP client")?;
    let mut uploader = Uploader::new(
        api,
        Credentials::new(config.token_policy),
        config.uploader.clone(),
    );

    let watcher = DirectoryWatcher::new(&config.root)
        .with_context(|| format!("Failed to watch {}", config.root.display()))?;

    let shutdown = watcher.shutdown_signal();
    ctrlc::set_handler(move || {
        if shutdown.trigger() {
            log::info!("Interrupt received, shutting down");
        } else {
            // the first one is stuck behind a running upload
            log::warn!("Second interrupt, exiting now");
            std::process::exit(130);
        }
    })
    .context("Failed to install Ctrl-C handler")?;

    // blocks until interrupted
    watcher.run(&mut uploader);
    Ok(())
}

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use feed_mosaic::app::App;
use feed_mosaic::config::Config;
use feed_mosaic::error::{AppError, Result};

const USAGE: &str =
    "usage: feed-mosaic [--config <path>] [--once | --import-opml <file> --account <id>]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    once: bool,
    import_opml: Option<PathBuf>,
    account: Option<i64>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(required(&mut args, &arg)?.into()),
            "--once" => parsed.once = true,
            "--import-opml" => parsed.import_opml = Some(required(&mut args, &arg)?.into()),
            "--account" => {
                let raw = required(&mut args, &arg)?;
                let id = raw
                    .parse()
                    .map_err(|_| AppError::Config(format!("invalid account id {raw:?}")))?;
                parsed.account = Some(id);
            }
            other => {
                return Err(AppError::Config(format!(
                    "unknown argument {other:?}\n{USAGE}"
                )))
            }
        }
    }

    Ok(parsed)
}

fn required(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| AppError::Config(format!("{flag} needs a value\n{USAGE}")))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env_overrides();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = App::new(&config).await?;

    if let Some(path) = args.import_opml {
        let account = args.account.ok_or_else(|| {
            AppError::Config(format!("--import-opml needs --account\n{USAGE}"))
        })?;
        let added = app.import_opml(&path, account).await?;
        println!("Imported {} channels from {:?}", added, path);
        return Ok(());
    }

    if args.once {
        app.refresh_once().await?;
        println!("Refreshed {} sources", app.enabled_kinds().len());
        return Ok(());
    }

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("Shutdown requested, waiting for running cycles");
        shutdown.cancel();
    });

    app.run(token).await;
    Ok(())
}

//! YouTranslate - asynchronous video subtitling service
//!
//! Entry point for the HTTP server and the one-shot command line workflow.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use youtranslate::cli::{Args, Commands};
use youtranslate::config::Config;
use youtranslate::jobs::ProcessRequest;
use youtranslate::server;
use youtranslate::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    match args.command {
        // needs no readable config
        Commands::InitConfig { path, force } => init_config(&path, force)?,
        Commands::Serve { host, port } => {
            let mut config = load_config(args.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let workflow = Arc::new(Workflow::new(config)?);
            server::serve(workflow).await?;
        }
        Commands::Process { url, language, target_language, output_dir } => {
            let workflow = Workflow::new(load_config(args.config.as_deref())?)?;
            workflow.layout().ensure_directories().await?;
            if !workflow.check_dependencies().await {
                anyhow::bail!("Media tools are not available; check the [media] section of the config");
            }

            let request = ProcessRequest {
                url,
                language,
                target_language,
            };
            let srt = workflow.process_url(request, &output_dir).await?;
            println!("{}", srt.display());
        }
        Commands::Validate { url } => {
            let workflow = Workflow::new(load_config(args.config.as_deref())?)?;
            let acquisition = workflow.pipeline().acquisition();
            if !acquisition.validate_url(&url) {
                anyhow::bail!("Not a supported video URL: {}", url);
            }

            let info = acquisition.fetch_metadata(&url).await?;
            let limit = workflow.config().pipeline.max_video_duration_secs;
            println!("{:<10} {}", "Id", info.id);
            println!("{:<10} {}", "Title", info.title);
            println!("{:<10} {}", "Author", info.author);
            println!("{:<10} {}", "Duration", format_duration(info.duration));
            if info.duration > limit {
                println!("Too long to process (limit {})", format_duration(limit));
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", path.display());
    }

    Config::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".youtranslate").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "youtranslate.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("youtranslate.log").display()
    );

    Ok(())
}

fn format_duration(seconds: u64) -> String {
    if seconds < 3600 {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    } else {
        format!("{}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
    }
}

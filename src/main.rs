//! Tachyon overlay CLI
//!
//! Runs single filesystem operations through the overlay.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tachyon_overlay::config::{self, CliArgs, Command};
use tachyon_overlay::overlay::OverlayFileStatus;
use tachyon_overlay::store::CreateOptions;
use tachyon_overlay::OverlayFileSystem;

fn print_status(status: &OverlayFileStatus) {
    let kind = if status.is_dir { 'd' } else { '-' };
    println!(
        "{}{:04o}\t{}\t{}:{}\t{}\t{}",
        kind,
        status.permission,
        status.replication,
        status.owner,
        status.group,
        status.length,
        status.path
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();
    let settings = config::load(&cli).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut fs = OverlayFileSystem::initialize(&settings.overlay.uri, &settings)
        .context("Failed to initialize overlay filesystem")?;
    if let Some(dir) = cli.working_dir.as_deref() {
        fs.set_working_directory(dir);
    }

    match cli.command {
        Command::Stat { path } => {
            let status = fs.get_file_status(&path).await?;
            print_status(&status);
        }
        Command::Ls { path } => {
            let listing = fs.list_status(&path).await?;
            for violation in &listing.violations {
                warn!(path = %violation.path, "{}", violation.reason);
            }
            for status in &listing.statuses {
                print_status(status);
            }
        }
        Command::Locate { path, start, len } => {
            let status = fs.get_file_status(&path).await?;
            let locations = fs.get_file_block_locations(&status, start, len).await?;
            for location in locations {
                println!(
                    "{}\t{}\t{}",
                    location.offset,
                    location.length,
                    location.hosts.join(",")
                );
            }
        }
        Command::Mkdir { path, permission } => {
            let created = fs.mkdirs(&path, permission).await?;
            println!("{}", created);
        }
        Command::Rm { path, recursive } => {
            let deleted = fs.delete(&path, recursive).await?;
            println!("{}", deleted);
        }
        Command::Mv { src, dst } => {
            let renamed = fs.rename(&src, &dst).await?;
            println!("{}", renamed);
        }
        Command::Cat { path, buffer_size } => {
            let stream = fs.open(&path, buffer_size).await?;
            let data = stream.read_all().await?;
            std::io::stdout()
                .write_all(&data)
                .context("Failed to write to stdout")?;
        }
        Command::Put {
            local,
            path,
            overwrite,
        } => {
            let data = std::fs::read(&local)
                .with_context(|| format!("Failed to read {}", local.display()))?;
            let mut out = fs
                .create(
                    &path,
                    CreateOptions {
                        overwrite,
                        ..Default::default()
                    },
                )
                .await?;
            out.write(&data);
            let size = out.len();
            out.close().await?;
            info!(local = %local.display(), path = %path, size = size, "Uploaded");
        }
    }

    Ok(())
}

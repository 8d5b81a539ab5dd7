//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the tachyon-overlay binary.
#[derive(Debug, Parser)]
#[command(
    name = "tachyon-overlay",
    version,
    about = "Cache-aware view over an HDFS backing store"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TACHYON_OVERLAY_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Working directory relative paths are resolved against.
    #[arg(long = "working-dir", value_name = "PATH")]
    pub working_dir: Option<String>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings that can be overridden on the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Filesystem URI, e.g. tachyon://master:19998/
    #[arg(long, value_name = "URI")]
    pub uri: Option<String>,

    /// WebHDFS base URL of the backing store.
    #[arg(long = "store-url", value_name = "URL")]
    pub store_url: Option<String>,

    /// User name sent to the backing store.
    #[arg(long = "store-user", value_name = "USER")]
    pub store_user: Option<String>,

    /// Raw path prefix for data in transit.
    #[arg(long = "staging-prefix", value_name = "PATH")]
    pub staging_prefix: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show the overlay status of a path.
    Stat { path: String },
    /// List a directory through the overlay.
    Ls { path: String },
    /// Show block locations for a file.
    Locate {
        path: String,
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long, default_value_t = 1)]
        len: u64,
    },
    /// Create a directory and its parents.
    Mkdir {
        path: String,
        /// Octal permission.
        #[arg(long, default_value = "755", value_parser = parse_octal)]
        permission: u16,
    },
    /// Delete a path.
    Rm {
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },
    /// Rename a path.
    Mv { src: String, dst: String },
    /// Print a file to stdout.
    Cat {
        path: String,
        #[arg(long = "buffer-size", default_value_t = 4096)]
        buffer_size: u32,
    },
    /// Upload a local file under the staging prefix.
    Put {
        local: PathBuf,
        path: String,
        #[arg(long)]
        overwrite: bool,
    },
}

fn parse_octal(value: &str) -> Result<u16, String> {
    u16::from_str_radix(value, 8).map_err(|e| format!("`{}` is not an octal mode: {}", value, e))
}

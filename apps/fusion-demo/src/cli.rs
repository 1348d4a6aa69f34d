use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fusion-demo", version, about = "Run Fusion tasks and upload files")]
pub struct Args {
    /// TOML config file (token, base_url, polling_interval, timeout).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a task and wait for its result.
    Run {
        service: String,
        /// Task inputs as a JSON object.
        inputs: String,
        /// Override the wait deadline, in seconds.
        #[arg(long)]
        timeout: Option<f64>,
    },
    /// Query a task once.
    Status { service: String, session_id: String },
    /// Upload a file and print its download URL.
    Upload {
        path: PathBuf,
        /// Name sent to storage; defaults to the file name of `path`.
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 3)]
        concurrency: usize,
    },
}

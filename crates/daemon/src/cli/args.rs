pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "veil")]
#[command(about = "Pseudonymous encrypted publishing over an untrusted host")]
#[command(version)]
pub struct Args {
    /// Host URL (defaults to localhost on the configured api_port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the veil config directory (defaults to ~/.veil)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}

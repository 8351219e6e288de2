// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op};
use cli::{Daemon, Health, IdentityCmd, Inbox, Init, Post, Profile, Subscription, Version};

command_enum! {
    (Daemon, Daemon),
    (Health, Health),
    (Identity, IdentityCmd),
    (Inbox, Inbox),
    (Init, Init),
    (Post, Post),
    (Profile, Profile),
    (Subscription, Subscription),
    (Version, Version),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Resolve remote URL: explicit flag > config api_port > hardcoded 5001
    let remote = cli::op::resolve_remote(args.remote, args.config_path.clone())?;
    let ctx = cli::op::OpContext::new(remote, args.config_path)?;

    let output = args.command.execute(&ctx).await?;
    println!("{}", output);
    Ok(())
}

use clap::{Args, Subcommand};

use common::crypto::PublicKey;

use crate::cli::op::{ClientError, Op, OpContext};

/// Sign and upload the local profile
#[derive(Args, Debug, Clone)]
pub struct Publish {
    /// Change the published name
    #[arg(long)]
    pub name: Option<String>,
}

#[async_trait::async_trait]
impl Op for Publish {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        if let Some(name) = &self.name {
            let mut state = ctx.state()?;
            state.config.display_name = Some(name.clone());
            state.save_config()?;
        }
        let (_, mut session) = ctx.session()?;
        let profile = session.publish_profile().await?;
        Ok(format!(
            "published profile for {} ({})",
            session.public(),
            profile.name.as_deref().unwrap_or("unnamed")
        ))
    }
}

/// Fetch and verify someone's profile
#[derive(Args, Debug, Clone)]
pub struct Show {
    /// Public key (hex) of the author
    pub author: PublicKey,
}

#[async_trait::async_trait]
impl Op for Show {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, session) = ctx.session()?;
        let profile = session.fetch_profile(&self.author).await?;
        Ok(format!(
            "name:          {}\nagreement key: {}\nupdated:       {}",
            profile.name.as_deref().unwrap_or("-"),
            profile.agreement_key.to_hex(),
            profile.updated_at
        ))
    }
}

crate::command_enum! {
    (Publish, Publish),
    (Show, Show),
}

pub type ProfileCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Profile {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[async_trait::async_trait]
impl Op for Profile {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

use clap::{Args, Subcommand};

use common::crypto::PublicKey;

use crate::cli::op::{ClientError, Op, OpContext};

/// Pay for and deliver a message
#[derive(Args, Debug, Clone)]
pub struct Deliver {
    pub target: PublicKey,
    pub text: String,
}

#[async_trait::async_trait]
impl Op for Deliver {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, session) = ctx.session()?;
        let id = session.send_message(&self.target, &self.text).await?;
        Ok(format!("delivered {}", id))
    }
}

/// Decrypt and verify waiting messages
#[derive(Args, Debug, Clone)]
pub struct Read;

#[async_trait::async_trait]
impl Op for Read {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, mut session) = ctx.session()?;
        let messages = session.read_inbox().await?;
        if messages.is_empty() {
            return Ok("inbox empty".to_string());
        }
        let lines = messages
            .iter()
            .map(|delivery| match &delivery.content {
                Ok(message) => format!(
                    "[{}] {}\n{}",
                    message.sent_at.to_rfc3339(),
                    message.from,
                    message.text
                ),
                Err(e) => format!("{}  rejected ({})", delivery.name, e),
            })
            .collect::<Vec<_>>();
        Ok(lines.join("\n\n"))
    }
}

crate::command_enum! {
    (Send, Deliver),
    (Read, Read),
}

pub type InboxCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Inbox {
    #[command(subcommand)]
    pub command: InboxCommand,
}

#[async_trait::async_trait]
impl Op for Inbox {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

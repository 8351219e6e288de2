use clap::{Args, Subcommand};

use common::crypto::PublicKey;

use crate::cli::op::{ClientError, Op, OpContext};

/// Ask an author to be let into their subscriber posts
#[derive(Args, Debug, Clone)]
pub struct Request {
    pub target: PublicKey,

    /// Note shown to the author alongside the request
    #[arg(long)]
    pub message: Option<String>,
}

#[async_trait::async_trait]
impl Op for Request {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, session) = ctx.session()?;
        let ephemeral = session
            .subscribe_to(&self.target, self.message.clone())
            .await?;
        Ok(format!("sent request {}", ephemeral.to_hex()))
    }
}

/// Decrypt requests waiting on the host
#[derive(Args, Debug, Clone)]
pub struct Pending;

#[async_trait::async_trait]
impl Op for Pending {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, mut session) = ctx.session()?;
        let pending = session.pending_requests().await?;
        if pending.is_empty() {
            return Ok("no pending requests".to_string());
        }
        let lines = pending
            .iter()
            .map(|delivery| match &delivery.content {
                Ok(request) => format!(
                    "{}  from {}{}",
                    delivery.name,
                    request.requester,
                    request
                        .message
                        .as_ref()
                        .map(|m| format!(": {}", m))
                        .unwrap_or_default()
                ),
                Err(e) => format!("{}  unreadable ({})", delivery.name, e),
            })
            .collect::<Vec<_>>();
        Ok(lines.join("\n"))
    }
}

/// Accept a pending request by name and remove it from the host
#[derive(Args, Debug, Clone)]
pub struct Accept {
    /// Request name as shown by `pending`
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AcceptError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("no readable request named {0}")]
    NoSuchRequest(String),
}

impl From<common::error::ProtocolError> for AcceptError {
    fn from(err: common::error::ProtocolError) -> Self {
        AcceptError::Client(err.into())
    }
}

impl From<veil_daemon::state::StateError> for AcceptError {
    fn from(err: veil_daemon::state::StateError) -> Self {
        AcceptError::Client(err.into())
    }
}

#[async_trait::async_trait]
impl Op for Accept {
    type Error = AcceptError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (state, mut session) = ctx.session()?;
        let requester = session
            .pending_requests()
            .await?
            .into_iter()
            .find(|delivery| delivery.name == self.name)
            .and_then(|delivery| delivery.content.ok())
            .map(|request| request.requester)
            .ok_or_else(|| AcceptError::NoSuchRequest(self.name.clone()))?;

        session.accept(requester);
        state.save_subscribers(session.subscribers())?;
        session.dismiss_request(&self.name).await?;
        Ok(format!("accepted {}", requester))
    }
}

/// Drop a pending request without accepting it
#[derive(Args, Debug, Clone)]
pub struct Dismiss {
    pub name: String,
}

#[async_trait::async_trait]
impl Op for Dismiss {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, mut session) = ctx.session()?;
        session.dismiss_request(&self.name).await?;
        Ok(format!("dismissed {}", self.name))
    }
}

/// Subscribers accepted so far
#[derive(Args, Debug, Clone)]
pub struct List;

#[async_trait::async_trait]
impl Op for List {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let subscribers = ctx.state()?.load_subscribers()?;
        if subscribers.is_empty() {
            return Ok("no subscribers".to_string());
        }
        Ok(subscribers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

crate::command_enum! {
    (Request, Request),
    (Pending, Pending),
    (Accept, Accept),
    (Dismiss, Dismiss),
    (List, List),
}

pub type SubscriptionCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Subscription {
    #[command(subcommand)]
    pub command: SubscriptionCommand,
}

#[async_trait::async_trait]
impl Op for Subscription {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

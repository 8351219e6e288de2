use clap::{Args, Subcommand};

use common::client::FeedItem;
use common::crypto::{ContentHash, PublicKey};
use common::post::{Post as Entry, PostContent, Visibility};

use crate::cli::op::{ClientError, Op, OpContext};

/// Encrypt and publish a post
#[derive(Args, Debug, Clone)]
#[command(group(clap::ArgGroup::new("kind").required(true).args(["text", "code", "link"])))]
pub struct Publish {
    /// Text body (default post type)
    #[arg(long)]
    pub text: Option<String>,

    /// Source code; pair with --language
    #[arg(long, requires = "language")]
    pub code: Option<String>,

    #[arg(long)]
    pub language: Option<String>,

    /// A link; pair with an optional --title
    #[arg(long)]
    pub link: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    /// world or subscribers
    #[arg(long, default_value = "world")]
    pub visibility: Visibility,
}

impl Publish {
    fn content(&self) -> PostContent {
        if let Some(source) = &self.code {
            PostContent::Code {
                language: self.language.clone().unwrap_or_default(),
                source: source.clone(),
            }
        } else if let Some(url) = &self.link {
            PostContent::Link {
                url: url.clone(),
                title: self.title.clone(),
            }
        } else {
            PostContent::Text {
                body: self.text.clone().unwrap_or_default(),
            }
        }
    }
}

#[async_trait::async_trait]
impl Op for Publish {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, mut session) = ctx.session()?;
        let id = session
            .publish(&Entry::new(self.content()), self.visibility)
            .await?;
        Ok(id.to_hex())
    }
}

/// Remove one of the local identity's posts
#[derive(Args, Debug, Clone)]
pub struct Delete {
    pub id: ContentHash,
}

#[async_trait::async_trait]
impl Op for Delete {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, mut session) = ctx.session()?;
        session.delete_post(&self.id).await?;
        Ok(format!("deleted {}", self.id))
    }
}

/// Read a single post
#[derive(Args, Debug, Clone)]
pub struct Read {
    pub author: PublicKey,
    pub id: ContentHash,
}

#[async_trait::async_trait]
impl Op for Read {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, session) = ctx.session()?;
        let post = session.read_post(&self.author, &self.id).await?;
        Ok(render(&FeedItem { id: self.id, post }))
    }
}

/// Every post of an author the local identity can read
#[derive(Args, Debug, Clone)]
pub struct Feed {
    /// Defaults to the local identity
    pub author: Option<PublicKey>,
}

#[async_trait::async_trait]
impl Op for Feed {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (_, session) = ctx.session()?;
        let author = self.author.unwrap_or_else(|| session.public());
        let items = session.feed(&author).await?;
        if items.is_empty() {
            return Ok("no readable posts".to_string());
        }
        Ok(items.iter().map(render).collect::<Vec<_>>().join("\n\n"))
    }
}

fn render(item: &FeedItem) -> String {
    let header = format!("[{}] {}", item.post.created_at.to_rfc3339(), item.id);
    let body = match &item.post.content {
        PostContent::Text { body } => body.clone(),
        PostContent::Code { language, source } => format!("```{}\n{}\n```", language, source),
        PostContent::Link { url, title } => match title {
            Some(title) => format!("{} <{}>", title, url),
            None => url.clone(),
        },
    };
    format!("{}\n{}", header, body)
}

crate::command_enum! {
    (Publish, Publish),
    (Delete, Delete),
    (Read, Read),
    (Feed, Feed),
}

pub type PostCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Post {
    #[command(subcommand)]
    pub command: PostCommand,
}

#[async_trait::async_trait]
impl Op for Post {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

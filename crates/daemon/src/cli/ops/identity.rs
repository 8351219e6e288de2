use clap::{Args, Subcommand};
use common::client::{Remote, Session};
use common::post::Profile;
use veil_daemon::state::AppState;

use crate::cli::op::{ClientError, Op, OpContext};

/// Show the local identity
#[derive(Args, Debug, Clone)]
pub struct Show;

#[async_trait::async_trait]
impl Op for Show {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let identity = state.load_identity()?;
        Ok(format!(
            "public key:    {}\nagreement key: {}\nname:          {}",
            identity.public(),
            identity.agreement_public().to_hex(),
            state.config.display_name.as_deref().unwrap_or("-")
        ))
    }
}

/// Replace the world key and republish the profile.
///
/// Posts wrapped under the old key stay readable only to those who kept it.
#[derive(Args, Debug, Clone)]
pub struct RotateWorldKey;

#[async_trait::async_trait]
impl Op for RotateWorldKey {
    type Error = ClientError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let (state, mut session) = ctx.session()?;
        rotate(&state, &mut session).await?;
        Ok(format!("rotated world key for {}", session.public()))
    }
}

/// The new key is on disk before any host hears of it
async fn rotate<R: Remote>(
    state: &AppState,
    session: &mut Session<R>,
) -> Result<Profile, ClientError> {
    let identity = session.replace_world_key();
    state.save_identity(identity)?;
    Ok(session.publish_profile().await?)
}

crate::command_enum! {
    (Show, Show),
    (RotateWorldKey, RotateWorldKey),
}

pub type IdentityCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct IdentityCmd {
    #[command(subcommand)]
    pub command: IdentityCommand,
}

#[async_trait::async_trait]
impl Op for IdentityCmd {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::auth::{Authority, Difficulties};
    use common::host::Host;
    use common::storage::{Layout, ObjectFileStore};

    use super::*;

    fn setup() -> (tempfile::TempDir, AppState, Session<Host>) {
        let temp = tempfile::tempdir().unwrap();
        let state = AppState::init(Some(temp.path().join("veil")), None).unwrap();
        let host = Host::new(
            Authority::generate(Difficulties {
                user: 4,
                message: 4,
            }),
            Arc::new(ObjectFileStore::memory()),
        );
        let session = Session::new(host, state.load_identity().unwrap());
        (temp, state, session)
    }

    #[tokio::test]
    async fn test_rotate_persists_published_key() {
        let (_temp, state, mut session) = setup();
        let profile = rotate(&state, &mut session).await.unwrap();
        assert_eq!(
            state.load_identity().unwrap().world_key(),
            &profile.world_key
        );
    }

    #[tokio::test]
    async fn test_rotate_publishes_nothing_when_save_fails() {
        let (temp, mut state, mut session) = setup();
        state.identity_path = temp.path().join("gone").join("identity.pem");

        assert!(matches!(
            rotate(&state, &mut session).await,
            Err(ClientError::State(_))
        ));
        let profile = Layout::new(&session.public()).profile();
        assert!(session.remote().get(&profile).await.unwrap_err().is_not_found());
    }
}

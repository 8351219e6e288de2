pub mod daemon;
pub mod health;
pub mod identity;
pub mod inbox;
pub mod init;
pub mod post;
pub mod profile;
pub mod subscription;
pub mod version;

pub use daemon::Daemon;
pub use health::Health;
pub use identity::IdentityCmd;
pub use inbox::Inbox;
pub use init::Init;
pub use post::Post;
pub use profile::Profile;
pub use subscription::Subscription;
pub use version::Version;

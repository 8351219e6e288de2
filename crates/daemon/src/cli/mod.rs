pub mod args;
pub mod op;
pub mod ops;

pub use ops::{
    Daemon, Health, IdentityCmd, Inbox, Init, Post, Profile, Subscription, Version,
};

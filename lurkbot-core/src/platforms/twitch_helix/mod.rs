// lurkbot-core/src/platforms/twitch_helix/mod.rs

pub mod auth;
pub mod client;

pub use auth::AppCredentialStore;
pub use client::{HelixClient, HelixStream, HelixUser};

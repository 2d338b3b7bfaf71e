// lurkbot-core/src/tasks/mod.rs

pub mod stream_watch;

pub use stream_watch::StreamWatcher;

pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod mirror;
pub mod reconcile;
pub mod render;
pub mod resolver;
pub mod scheduler;

pub use api::{ContentApi, Node, RedditClient};
pub use config::{load_config, Config};
pub use error::{ConfigError, MirrorError, Result};
pub use mirror::Mirrorer;
pub use reconcile::{EditReconciler, ReconcileAction};
pub use resolver::ContentResolver;
pub use scheduler::RecheckScheduler;

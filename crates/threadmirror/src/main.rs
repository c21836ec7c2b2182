use std::path::PathBuf;
use std::time::Instant;

use threadmirror::api::RedditClient;
use threadmirror::db::Database;
use threadmirror::{load_config, EditReconciler, MirrorError};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), MirrorError> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let config = load_config(&config_path)?;

    let db = Database::open(&config.database.resolved_path())?;
    let client = RedditClient::new(&config.platform, &config.auth)?;

    let reconciler = EditReconciler::with_pass_limit(
        &client,
        db,
        &config.mirror.error_msg,
        config.scheduler.pass_limit,
    );
    let now = chrono::Utc::now().timestamp();
    let start = Instant::now();
    let examined = reconciler.run_pass(now)?;
    log::debug!(
        "check_edits: {:.2}s ({} items)",
        start.elapsed().as_secs_f64(),
        examined
    );

    Ok(())
}

fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".threadmirror").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

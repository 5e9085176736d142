use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use wristnotes_core::bridge::OsascriptRunner;
use wristnotes_core::{SyncOutcome, SyncService};

use crate::commands::common::{load_settings, open_store};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path, config_path: &Path) -> Result<(), CliError> {
    let settings = load_settings(config_path)?;
    tracing::debug!(
        "Syncing into {} with settings from {}",
        db_path.display(),
        config_path.display()
    );
    let store = Arc::new(Mutex::new(open_store(db_path)?));
    let runner = OsascriptRunner::new(settings.osascript_path.clone());
    let service = SyncService::new(runner, store, settings);

    match service.sync().await? {
        SyncOutcome::Completed {
            synced,
            launch_error,
        } => {
            if let Some(error) = launch_error {
                eprintln!("Warning: {error}");
            }
            println!("Synced {synced} notes");
        }
        SyncOutcome::Skipped => println!("Sync already in progress"),
    }
    Ok(())
}

//! Sync pipeline from the Notes application into the local store.
//!
//! One sync runs the steps launch, access check, fetch, parse and reconcile.
//! Only one sync runs at a time per [`SyncService`]; a call made while
//! another is in flight returns [`SyncOutcome::Skipped`] straight away.
//!
//! Syncs cannot be cancelled once started. The fetch step has no timeout of
//! its own and blocks for as long as the scripting host does.

mod reconcile;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::time::sleep;

use crate::bridge::{BridgeError, ScriptRunner, FETCH_SCRIPT, PROBE_SCRIPT};
use crate::config::SyncSettings;
use crate::db::NoteStore;
use crate::protocol::{self, START_MARKER};
use crate::state::{SyncPhase, SyncState};

pub use reconcile::reconcile;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Non-fatal; returned in [`SyncOutcome::Completed`] when the access
    /// check still succeeds
    #[error("Could not launch Notes: {0}")]
    LaunchFailed(#[source] BridgeError),
    #[error("Could not access Notes after {attempts} attempts")]
    NoAccess { attempts: u32 },
    #[error("Failed to fetch notes from Notes: {0}")]
    FetchFailed(String),
    #[error("Failed to save notes: {0}")]
    SaveFailed(#[source] crate::Error),
}

/// Result of a successful [`SyncService::sync`] call
#[derive(Debug)]
pub enum SyncOutcome {
    /// The pipeline ran and stored `synced` notes.
    ///
    /// `launch_error` holds a [`SyncError::LaunchFailed`] when the launch
    /// request failed but Notes turned out to be reachable anyway.
    Completed {
        synced: usize,
        launch_error: Option<SyncError>,
    },
    /// Another sync was already running; nothing was done
    Skipped,
}

impl SyncOutcome {
    /// Number of stored notes, `None` when the sync was skipped
    pub const fn synced(&self) -> Option<usize> {
        match self {
            Self::Completed { synced, .. } => Some(*synced),
            Self::Skipped => None,
        }
    }

    pub const fn launch_error(&self) -> Option<&SyncError> {
        match self {
            Self::Completed {
                launch_error: Some(error),
                ..
            } => Some(error),
            _ => None,
        }
    }
}

/// Drives the Notes application and mirrors its notes into `S`.
pub struct SyncService<R, S> {
    runner: R,
    store: Arc<tokio::sync::Mutex<S>>,
    settings: SyncSettings,
    state: Arc<Mutex<SyncState>>,
}

impl<R, S> SyncService<R, S>
where
    R: ScriptRunner,
    S: NoteStore,
{
    pub fn new(runner: R, store: Arc<tokio::sync::Mutex<S>>, settings: SyncSettings) -> Self {
        Self {
            runner,
            store,
            settings,
            state: Arc::new(Mutex::new(SyncState::Idle)),
        }
    }

    /// Current pipeline state
    pub fn state(&self) -> SyncState {
        *lock_state(&self.state)
    }

    /// Shared handle to the store this service writes into
    pub fn store(&self) -> Arc<tokio::sync::Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Run one full sync unless one is already running.
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        let Some(run) = RunGuard::begin(&self.state) else {
            tracing::debug!("Sync already in progress, skipping");
            return Ok(SyncOutcome::Skipped);
        };

        tracing::info!("Starting notes sync");
        match self.run_pipeline(&run).await {
            Ok((synced, launch_error)) => Ok(SyncOutcome::Completed {
                synced,
                launch_error,
            }),
            Err(error) => {
                tracing::warn!("Notes sync failed: {}", error);
                Err(error)
            }
        }
    }

    async fn run_pipeline(
        &self,
        run: &RunGuard<'_>,
    ) -> Result<(usize, Option<SyncError>), SyncError> {
        run.enter(SyncPhase::Launching);
        let launch_error = self.launch().err();
        sleep(self.settings.settle_delay()).await;

        run.enter(SyncPhase::CheckingAccess);
        self.wait_for_access().await?;

        run.enter(SyncPhase::Fetching);
        let payload = self.fetch()?;
        let records = protocol::parse_notes(&payload);
        tracing::debug!("Parsed {} notes", records.len());

        run.enter(SyncPhase::Reconciling);
        let mut store = self.store.lock().await;
        let synced = reconcile(records, &mut *store)?;
        Ok((synced, launch_error))
    }

    fn launch(&self) -> Result<(), SyncError> {
        self.runner
            .launch(&self.settings.application_path)
            .map_err(|error| {
                let error = SyncError::LaunchFailed(error);
                tracing::warn!("{}; continuing with access check", error);
                error
            })
    }

    async fn wait_for_access(&self) -> Result<(), SyncError> {
        let attempts = self.settings.access_attempts.max(1);
        for attempt in 1..=attempts {
            if self.probe_access() {
                tracing::debug!("Notes access confirmed on attempt {}", attempt);
                return Ok(());
            }
            tracing::warn!(
                "Waiting for Notes access (attempt {}/{})",
                attempt,
                attempts
            );
            if attempt < attempts {
                sleep(self.settings.access_retry_interval()).await;
            }
        }
        Err(SyncError::NoAccess { attempts })
    }

    fn probe_access(&self) -> bool {
        if !self.runner.is_running(&self.settings.bundle_id) {
            tracing::debug!("{} is not running", self.settings.bundle_id);
            return false;
        }
        match self.runner.run_script(PROBE_SCRIPT) {
            Ok(answer) => answer.trim().eq_ignore_ascii_case("true"),
            Err(error) => {
                tracing::debug!("Notes access probe failed: {}", error);
                false
            }
        }
    }

    fn fetch(&self) -> Result<String, SyncError> {
        let payload = self
            .runner
            .run_script(FETCH_SCRIPT)
            .map_err(|error| SyncError::FetchFailed(error.to_string()))?;
        tracing::debug!("Fetched {} bytes from Notes", payload.len());

        if !payload.trim().is_empty() && !payload.contains(START_MARKER) {
            return Err(SyncError::FetchFailed(
                "output contained no note markers".to_string(),
            ));
        }
        Ok(payload)
    }
}

fn lock_state(state: &Mutex<SyncState>) -> MutexGuard<'_, SyncState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the service as running; resets it to idle when dropped.
struct RunGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl<'a> RunGuard<'a> {
    /// Check-and-set in one critical section
    fn begin(state: &'a Mutex<SyncState>) -> Option<Self> {
        let mut current = lock_state(state);
        if current.is_running() {
            return None;
        }
        *current = SyncState::Running(SyncPhase::Launching);
        Some(Self { state })
    }

    fn enter(&self, phase: SyncPhase) {
        *lock_state(self.state) = SyncState::Running(phase);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock_state(self.state) = SyncState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::OnceLock;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::SqliteNoteStore;
    use crate::models::NoteRecord;

    const GROCERIES: &str = "---START---\nID: 42\nName: Groceries\nBody: Milk\nEggs\nCreated: Tuesday 3 June 2025 at 09:00:00\nModified: Tuesday 3 June 2025 at 09:00:00\nContainer: Personal\nAccount: iCloud\nPassword Protected: false\nShared: false\nAttachments: 0\n---END---\n";

    /// Records the service state seen at each bridge and store call
    #[derive(Default)]
    struct PhaseLog {
        state: OnceLock<Arc<Mutex<SyncState>>>,
        seen: Mutex<Vec<(&'static str, SyncState)>>,
    }

    impl PhaseLog {
        fn attach<R, S>(&self, service: &SyncService<R, S>) {
            let _ = self.state.set(Arc::clone(&service.state));
        }

        fn record(&self, call: &'static str) {
            if let Some(state) = self.state.get() {
                let current = *state.lock().unwrap();
                self.seen.lock().unwrap().push((call, current));
            }
        }

        fn seen(&self) -> Vec<(&'static str, SyncState)> {
            self.seen.lock().unwrap().clone()
        }
    }

    /// Scripted stand-in for the Notes application
    #[derive(Default)]
    struct FakeRunner {
        phase_log: Option<Arc<PhaseLog>>,
        launch_fails: bool,
        not_running: bool,
        probe_answers: Mutex<VecDeque<&'static str>>,
        fetch_result: Mutex<Option<Result<String, BridgeError>>>,
        probes: Mutex<usize>,
        fetches: Mutex<usize>,
    }

    impl FakeRunner {
        fn answering(payload: &str) -> Self {
            Self {
                fetch_result: Mutex::new(Some(Ok(payload.to_string()))),
                ..Self::default()
            }
        }

        fn with_probe_answers(self, answers: &[&'static str]) -> Self {
            *self.probe_answers.lock().unwrap() = answers.iter().copied().collect();
            self
        }

        fn probes(&self) -> usize {
            *self.probes.lock().unwrap()
        }

        fn fetches(&self) -> usize {
            *self.fetches.lock().unwrap()
        }

        fn log(&self, call: &'static str) {
            if let Some(log) = &self.phase_log {
                log.record(call);
            }
        }
    }

    impl ScriptRunner for FakeRunner {
        fn launch(&self, _app_path: &Path) -> Result<(), BridgeError> {
            self.log("launch");
            if self.launch_fails {
                Err(BridgeError::Launch("LSOpenURLsWithRole() failed".to_string()))
            } else {
                Ok(())
            }
        }

        fn is_running(&self, bundle_id: &str) -> bool {
            assert_eq!(bundle_id, "com.apple.Notes");
            self.log("is_running");
            !self.not_running
        }

        fn run_script(&self, source: &str) -> Result<String, BridgeError> {
            if source == PROBE_SCRIPT {
                self.log("probe");
                *self.probes.lock().unwrap() += 1;
                let answer = self.probe_answers.lock().unwrap().pop_front().unwrap_or("true");
                return Ok(answer.to_string());
            }
            assert_eq!(source, FETCH_SCRIPT);
            self.log("fetch");
            *self.fetches.lock().unwrap() += 1;
            self.fetch_result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    /// Store whose commits always fail
    #[derive(Default)]
    struct FailingStore {
        committed: Vec<NoteRecord>,
        staged: usize,
    }

    impl NoteStore for FailingStore {
        fn fetch_all(&self) -> crate::Result<Vec<NoteRecord>> {
            Ok(self.committed.clone())
        }

        fn delete(&mut self, _record: &NoteRecord) {
            self.staged += 1;
        }

        fn insert(&mut self, _record: NoteRecord) {
            self.staged += 1;
        }

        fn save(&mut self) -> crate::Result<()> {
            Err(crate::Error::Database("database or disk is full".to_string()))
        }
    }

    /// In-memory store that logs when reconciliation reads it
    struct LoggingStore {
        inner: SqliteNoteStore,
        log: Arc<PhaseLog>,
    }

    impl NoteStore for LoggingStore {
        fn fetch_all(&self) -> crate::Result<Vec<NoteRecord>> {
            self.log.record("fetch_all");
            self.inner.fetch_all()
        }

        fn delete(&mut self, record: &NoteRecord) {
            self.inner.delete(record);
        }

        fn insert(&mut self, record: NoteRecord) {
            self.inner.insert(record);
        }

        fn save(&mut self) -> crate::Result<()> {
            self.log.record("save");
            self.inner.save()
        }
    }

    fn seeded_store() -> Arc<tokio::sync::Mutex<SqliteNoteStore>> {
        let mut store = SqliteNoteStore::open_in_memory().unwrap();
        store.insert(NoteRecord::new("old"));
        store.save().unwrap();
        Arc::new(tokio::sync::Mutex::new(store))
    }

    fn service(runner: FakeRunner) -> SyncService<FakeRunner, SqliteNoteStore> {
        SyncService::new(runner, seeded_store(), SyncSettings::default())
    }

    async fn stored_ids(service: &SyncService<FakeRunner, SqliteNoteStore>) -> Vec<String> {
        let store = service.store();
        let store = store.lock().await;
        store
            .fetch_all()
            .unwrap()
            .into_iter()
            .map(|note| note.id)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn full_sync_replaces_stored_notes() {
        let service = service(FakeRunner::answering(GROCERIES));

        let outcome = service.sync().await.unwrap();
        assert_eq!(outcome.synced(), Some(1));
        assert!(outcome.launch_error().is_none());
        assert_eq!(stored_ids(&service).await, vec!["42"]);
        assert_eq!(service.state(), SyncState::Idle);

        let store = service.store();
        let note = store.lock().await.get("42").unwrap().unwrap();
        assert_eq!(note.body.as_deref(), Some("Milk\nEggs"));
        assert_eq!(note.container.as_deref(), Some("Personal"));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_call_is_skipped() {
        let service = service(FakeRunner::answering(GROCERIES));

        let (first, second) = tokio::join!(service.sync(), service.sync());
        assert_eq!(first.unwrap().synced(), Some(1));
        assert!(matches!(second.unwrap(), SyncOutcome::Skipped));
        assert_eq!(service.runner.fetches(), 1);
        assert_eq!(service.state(), SyncState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_access_probe_leaves_store_untouched() {
        let runner = FakeRunner::answering(GROCERIES).with_probe_answers(&["false", "false", "false"]);
        let service = service(runner);

        let error = service.sync().await.unwrap_err();
        assert!(matches!(error, SyncError::NoAccess { attempts: 3 }));
        assert_eq!(service.runner.probes(), 3);
        assert_eq!(service.runner.fetches(), 0);
        assert_eq!(stored_ids(&service).await, vec!["old"]);
        assert_eq!(service.state(), SyncState::Idle);

        // The caller retries by calling sync again
        let outcome = service.sync().await.unwrap();
        assert_eq!(outcome.synced(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn app_not_running_counts_as_no_access() {
        let runner = FakeRunner {
            not_running: true,
            ..FakeRunner::answering(GROCERIES)
        };
        let service = service(runner);

        assert!(matches!(
            service.sync().await,
            Err(SyncError::NoAccess { attempts: 3 })
        ));
        assert_eq!(service.runner.probes(), 0);
        assert_eq!(service.runner.fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn access_granted_on_last_attempt_after_waits() {
        let runner = FakeRunner::answering(GROCERIES).with_probe_answers(&["false", "FALSE"]);
        let service = service(runner);

        let start = tokio::time::Instant::now();
        let outcome = service.sync().await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(outcome.synced(), Some(1));
        assert_eq!(service.runner.probes(), 3);
        // settle delay plus two retry intervals
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_is_not_fatal() {
        let runner = FakeRunner {
            launch_fails: true,
            ..FakeRunner::answering(GROCERIES)
        };
        let service = service(runner);

        let outcome = service.sync().await.unwrap();
        assert_eq!(outcome.synced(), Some(1));
        assert!(matches!(
            outcome.launch_error(),
            Some(SyncError::LaunchFailed(BridgeError::Launch(message))) if message.contains("LSOpenURLsWithRole")
        ));
        assert_eq!(stored_ids(&service).await, vec!["42"]);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_without_access_reports_no_access() {
        let runner = FakeRunner {
            launch_fails: true,
            not_running: true,
            ..FakeRunner::answering(GROCERIES)
        };
        let service = service(runner);

        assert!(matches!(
            service.sync().await,
            Err(SyncError::NoAccess { attempts: 3 })
        ));
        assert_eq!(stored_ids(&service).await, vec!["old"]);
    }

    #[tokio::test(start_paused = true)]
    async fn bridge_and_store_calls_run_in_their_phases() {
        let log = Arc::new(PhaseLog::default());
        let runner = FakeRunner {
            phase_log: Some(Arc::clone(&log)),
            ..FakeRunner::answering(GROCERIES).with_probe_answers(&["false", "true"])
        };
        let store = LoggingStore {
            inner: SqliteNoteStore::open_in_memory().unwrap(),
            log: Arc::clone(&log),
        };
        let service = SyncService::new(
            runner,
            Arc::new(tokio::sync::Mutex::new(store)),
            SyncSettings::default(),
        );
        log.attach(&service);

        service.sync().await.unwrap();

        let checking = SyncState::Running(SyncPhase::CheckingAccess);
        assert_eq!(
            log.seen(),
            vec![
                ("launch", SyncState::Running(SyncPhase::Launching)),
                ("is_running", checking),
                ("probe", checking),
                ("is_running", checking),
                ("probe", checking),
                ("fetch", SyncState::Running(SyncPhase::Fetching)),
                ("fetch_all", SyncState::Running(SyncPhase::Reconciling)),
                ("save", SyncState::Running(SyncPhase::Reconciling)),
            ]
        );
        assert_eq!(service.state(), SyncState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_fails_sync() {
        let runner = FakeRunner {
            fetch_result: Mutex::new(Some(Err(BridgeError::ScriptFailed {
                status: 1,
                stderr: "Notes got an error: AppleEvent timed out".to_string(),
            }))),
            ..FakeRunner::default()
        };
        let service = service(runner);

        let error = service.sync().await.unwrap_err();
        assert!(matches!(error, SyncError::FetchFailed(message) if message.contains("timed out")));
        assert_eq!(stored_ids(&service).await, vec!["old"]);
    }

    #[tokio::test(start_paused = true)]
    async fn output_without_markers_is_malformed() {
        let service = service(FakeRunner::answering("missing value\n"));

        assert!(matches!(
            service.sync().await,
            Err(SyncError::FetchFailed(_))
        ));
        assert_eq!(stored_ids(&service).await, vec!["old"]);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_output_means_no_notes() {
        let service = service(FakeRunner::answering("\n"));

        let outcome = service.sync().await.unwrap();
        assert_eq!(outcome.synced(), Some(0));
        assert!(stored_ids(&service).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn save_failure_is_reported() {
        let store = Arc::new(tokio::sync::Mutex::new(FailingStore {
            committed: vec![NoteRecord::new("old")],
            staged: 0,
        }));
        let service = SyncService::new(
            FakeRunner::answering(GROCERIES),
            Arc::clone(&store),
            SyncSettings::default(),
        );

        let error = service.sync().await.unwrap_err();
        assert!(matches!(error, SyncError::SaveFailed(_)));
        assert_eq!(service.state(), SyncState::Idle);

        let store = store.lock().await;
        assert_eq!(store.staged, 2);
        assert_eq!(store.committed, vec![NoteRecord::new("old")]);
    }
}

//! Batch processing engine.
//!
//! Drives the full run: restore the saved session, read pending rows, chunk
//! them into batches, and for each batch walk the compose-surface flow —
//! fill every address at once, let the page resolve them into recipient
//! tokens, then open each token's contact card and extract it. Results are
//! persisted record by record, so a crash or stop loses at most the record
//! in flight.

use crate::behavior::{
    DelayCategory, DelayManager, MouseEmulator, PathPoint, TypingSimulator,
};
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::extractor::ContactExtractionEngine;
use crate::core::models::{BatchResult, ContactInfo, EmailRecord, ProcessingStats, Status};
use crate::core::session::{SessionStore, StorageState};
use crate::driver::UiDriver;
use crate::events::{emit, EventSender, ProgressEvent};
use crate::store::SpreadsheetStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Preflight report produced by [`BatchOrchestrator::validate_setup`].
#[derive(Debug)]
pub struct SetupReport {
    pub session_ok: bool,
    pub session_detail: Option<String>,
    pub store_ok: bool,
    pub store_detail: Option<String>,
    pub pending_records: usize,
}

impl SetupReport {
    pub fn is_ready(&self) -> bool {
        self.session_ok && self.store_ok
    }
}

pub struct BatchOrchestrator<D: UiDriver> {
    config: Config,
    driver: D,
    delays: DelayManager,
    mouse: MouseEmulator,
    typing: TypingSimulator,
    extractor: ContactExtractionEngine,
    session: SessionStore,
    events: Option<EventSender>,
    stop: Arc<AtomicBool>,
    last_pointer: Mutex<PathPoint>,
}

impl<D: UiDriver> BatchOrchestrator<D> {
    pub fn new(config: Config, driver: D) -> Self {
        let delays = DelayManager::new(config.delays.clone());
        let mouse = MouseEmulator::new(config.mouse.clone());
        let typing = TypingSimulator::new(config.typing.clone());
        let extractor = ContactExtractionEngine::new(config.patterns.clone());
        let session = SessionStore::new(config.session_file.clone());
        Self {
            config,
            driver,
            delays,
            mouse,
            typing,
            extractor,
            session,
            events: None,
            stop: Arc::new(AtomicBool::new(false)),
            last_pointer: Mutex::new(PathPoint::new(0.0, 0.0)),
        }
    }

    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Releases the driver so the caller can close the session cleanly.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Shared flag a foreground thread can set to request a graceful stop.
    /// Checked between records and between batches; the action in flight is
    /// never preempted.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Checks every precondition a run needs without touching the page:
    /// session blob validity and store readability plus the pending count.
    pub fn validate_setup<S: SpreadsheetStore>(&self, store: &mut S) -> SetupReport {
        let session = self.session.load_validated(&self.config.page_url);
        let pending = store.read_pending();
        SetupReport {
            session_ok: session.is_ok(),
            session_detail: session.err().map(|e| e.to_string()),
            store_ok: pending.is_ok(),
            store_detail: pending.as_ref().err().map(|e| e.to_string()),
            pending_records: pending.map(|p| p.len()).unwrap_or(0),
        }
    }

    /// Processes every pending record and returns the aggregate counters.
    /// Only invalid preconditions abort the run; batch-level failures mark
    /// the affected records and processing moves on.
    pub async fn run<S: SpreadsheetStore>(&self, store: &mut S) -> Result<ProcessingStats> {
        let started = Instant::now();

        let session_state = match self.session.load_validated(&self.config.page_url) {
            Ok(state) => state,
            Err(e) => {
                emit(&self.events, ProgressEvent::RunFailed(e.to_string()));
                return Err(e);
            }
        };

        let pending = match store.read_pending() {
            Ok(pending) => pending,
            Err(e) => {
                emit(&self.events, ProgressEvent::RunFailed(e.to_string()));
                return Err(e);
            }
        };
        let mut stats = ProcessingStats::default();
        if pending.is_empty() {
            tracing::info!(target: "batch_task", "No pending records; nothing to do");
            emit(&self.events, ProgressEvent::RunCompleted(stats.clone()));
            return Ok(stats);
        }

        let batches: Vec<&[EmailRecord]> = pending.chunks(self.config.batch_size).collect();
        let total_batches = batches.len();
        tracing::info!(
            target: "batch_task",
            "Processing {} records in {} batches of up to {}",
            pending.len(),
            total_batches,
            self.config.batch_size
        );

        for (index, batch) in batches.iter().enumerate() {
            if self.stopped() {
                tracing::warn!(target: "batch_task", "Stop requested; leaving remaining batches pending");
                break;
            }

            let batch_number = index + 1;
            emit(
                &self.events,
                ProgressEvent::BatchStarted {
                    batch_number,
                    total_batches,
                    size: batch.len(),
                },
            );
            tracing::info!(
                target: "batch_task",
                "Batch {}/{}: {} records",
                batch_number,
                total_batches,
                batch.len()
            );

            let mut records: Vec<EmailRecord> = batch.to_vec();
            if let Err(e) = self
                .process_batch(&session_state, &mut records, store)
                .await
            {
                if matches!(e, AppError::SessionInvalid(_) | AppError::Config(_)) {
                    emit(&self.events, ProgressEvent::RunFailed(e.to_string()));
                    return Err(e);
                }
                tracing::error!(target: "batch_task", "Batch {} failed: {}", batch_number, e);
                emit(
                    &self.events,
                    ProgressEvent::Log(format!("Batch {} failed: {}", batch_number, e)),
                );
                self.capture_failure(batch_number).await;
                self.fail_remaining(&mut records, store);
            }

            stats.absorb(&tally(batch_number, &records));

            if batch_number < total_batches && !self.stopped() {
                self.delays.pause(DelayCategory::BetweenRecords).await;
            }
        }

        stats.duration_seconds = started.elapsed().as_secs_f64();
        tracing::info!(
            target: "batch_task",
            "Run finished: {} ok, {} not found, {} errors in {:.1}s",
            stats.successful,
            stats.not_found,
            stats.errors,
            stats.duration_seconds
        );
        emit(&self.events, ProgressEvent::RunCompleted(stats.clone()));
        Ok(stats)
    }

    async fn process_batch<S: SpreadsheetStore>(
        &self,
        session: &StorageState,
        records: &mut [EmailRecord],
        store: &mut S,
    ) -> Result<()> {
        self.ensure_page(session).await.map_err(surface)?;
        self.open_compose(records).await.map_err(surface)?;

        for record in records.iter_mut() {
            if self.stopped() {
                tracing::warn!(target: "batch_task", "Stop requested mid-batch");
                break;
            }

            match self.process_record(&record.email).await {
                Ok((status, data)) => {
                    record.status = status;
                    record.data = data;
                }
                Err(e) if e.is_record_scoped() => {
                    tracing::warn!(target: "batch_task", "'{}': {}", record.email, e);
                    record.status = Status::Error;
                    record.data = None;
                }
                Err(e) => return Err(e),
            }

            store.write_result(record)?;
            emit(
                &self.events,
                ProgressEvent::RecordProcessed {
                    email: record.email.clone(),
                    status: record.status,
                },
            );
            self.delays.pause(DelayCategory::BetweenActions).await;
        }

        self.discard_draft().await.map_err(surface)?;
        Ok(())
    }

    /// Navigates to the target page and replays session cookies when the
    /// session is not already there.
    async fn ensure_page(&self, session: &StorageState) -> Result<()> {
        let current = self.driver.current_url().await?;
        if same_host(&current, &self.config.page_url) {
            return Ok(());
        }

        tracing::debug!(target: "batch_task", "Navigating to {}", self.config.page_url);
        // Cookies can only be installed once the origin is loaded; navigate,
        // install, then reload so the page picks them up.
        self.driver.navigate(&self.config.page_url).await?;
        self.session.apply(&self.driver, session).await?;
        self.driver.navigate(&self.config.page_url).await?;
        self.delays.pause(DelayCategory::CardLoad).await;
        Ok(())
    }

    /// Opens the compose surface and fills the To field with every address
    /// of the batch in a single typing pass, then blurs so the page resolves
    /// them into tokens.
    async fn open_compose(&self, records: &[EmailRecord]) -> Result<()> {
        let selectors = &self.config.selectors;
        let waits = &self.config.wait_times;

        self.driver.click(&selectors.new_message_btn).await?;
        sleep_ms(waits.after_new_message).await;

        let joined = records
            .iter()
            .map(|r| r.email.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let script = self.typing.script(&joined);
        tracing::debug!(
            target: "batch_task",
            "Filling To field: {} addresses, {} keystrokes",
            records.len(),
            script.len()
        );
        self.driver.type_script(&selectors.to_field, &script).await?;
        self.delays.pause(DelayCategory::AfterTyping).await;
        sleep_ms(waits.after_fill_to).await;

        self.driver.blur().await?;
        sleep_ms(waits.after_blur).await;
        Ok(())
    }

    /// Resolves one address: click its recipient token, wait for the contact
    /// card, extract, classify, dismiss.
    async fn process_record(&self, email: &str) -> Result<(Status, Option<ContactInfo>)> {
        let selectors = &self.config.selectors;

        let target = self
            .driver
            .locate_token(email)
            .await?
            .ok_or_else(|| AppError::TokenNotFound(email.to_string()))?;

        let from = *self.last_pointer.lock();
        let plan = self.mouse.plan_move(from, target);
        self.driver.replay_pointer(&plan).await?;
        *self.last_pointer.lock() = plan.end;
        self.delays.pause(DelayCategory::AfterClick).await;

        let timeout = Duration::from_millis(self.config.wait_times.card_visible_timeout);
        self.driver
            .wait_visible(&selectors.card, timeout)
            .await
            .map_err(|_| AppError::CardTimeout(email.to_string()))?;
        self.delays.pause(DelayCategory::CardLoad).await;

        let info = self
            .extractor
            .extract(&self.driver, &selectors.card)
            .await?
            .ok_or_else(|| AppError::Extraction(format!("card text unreadable for '{}'", email)))?;
        let status = self.classify(&info);

        self.driver.press_escape().await?;
        self.delays.pause(DelayCategory::AfterCardClose).await;

        let data = if info.has_any_field() { Some(info) } else { None };
        Ok((status, data))
    }

    /// A card counts as a real directory hit when it carries at least one
    /// substantive field. A lone generic mailbox address is what the page
    /// shows for addresses it does not actually know.
    fn classify(&self, info: &ContactInfo) -> Status {
        let generic = &self.config.patterns.generic_email;
        let specific_email = info
            .personal_email
            .as_deref()
            .map(|e| !generic.is_match(e))
            .unwrap_or(false);

        let valid = info.sip.is_some()
            || specific_email
            || info.phone.is_some()
            || (info.name.is_some() && info.personal_email.is_some())
            || info.address.is_some()
            || info.department.is_some();

        if valid {
            Status::Success
        } else {
            Status::NotFound
        }
    }

    /// Discards the draft so the next batch starts from a clean surface. The
    /// interface sometimes asks for confirmation with an identical button;
    /// the second click is tolerated as a no-op.
    async fn discard_draft(&self) -> Result<()> {
        let selectors = &self.config.selectors;
        sleep_ms(self.config.wait_times.before_discard).await;

        self.driver.click(&selectors.discard_btn).await?;
        if let Err(e) = self.driver.click(&selectors.discard_btn).await {
            tracing::debug!(target: "batch_task", "No discard confirmation shown: {}", e);
        }
        self.delays.pause(DelayCategory::AfterCardClose).await;
        Ok(())
    }

    /// Marks every record of a failed batch that is still pending as ERROR,
    /// writing each one through.
    fn fail_remaining<S: SpreadsheetStore>(&self, records: &mut [EmailRecord], store: &mut S) {
        for record in records.iter_mut() {
            if record.status != Status::Pending {
                continue;
            }
            record.status = Status::Error;
            record.data = None;
            if let Err(e) = store.write_result(record) {
                tracing::error!(target: "batch_task", "Could not persist ERROR for '{}': {}", record.email, e);
            }
            emit(
                &self.events,
                ProgressEvent::RecordProcessed {
                    email: record.email.clone(),
                    status: Status::Error,
                },
            );
        }
    }

    /// Best-effort screenshot of a failed batch, when a screenshot directory
    /// is configured.
    async fn capture_failure(&self, batch_number: usize) {
        let Some(dir) = &self.config.screenshot_dir else {
            return;
        };
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!(target: "batch_task", "Cannot create screenshot dir: {}", e);
            return;
        }
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = dir.join(format!("batch-{:02}-{}.png", batch_number, epoch));
        match self.driver.screenshot(&path).await {
            Ok(()) => tracing::info!(target: "batch_task", "Failure screenshot: {}", path.display()),
            Err(e) => tracing::warn!(target: "batch_task", "Screenshot failed: {}", e),
        }
    }
}

fn tally(batch_number: usize, records: &[EmailRecord]) -> BatchResult {
    let mut result = BatchResult {
        batch_number,
        ..Default::default()
    };
    for record in records {
        match record.status {
            Status::Pending => continue,
            Status::Success => result.successful += 1,
            Status::NotFound => result.not_found += 1,
            Status::Error => result.errors += 1,
        }
        result.total += 1;
    }
    result
}

/// Wraps batch setup/teardown failures so the caller can tell them apart
/// from record-scoped ones. Already-typed surface errors pass through.
fn surface(e: AppError) -> AppError {
    match e {
        AppError::SurfaceSetup(_) | AppError::SessionInvalid(_) | AppError::Config(_) => e,
        other => AppError::SurfaceSetup(other.to_string()),
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn same_host(a: &str, b: &str) -> bool {
    fn host(url: &str) -> &str {
        let rest = url.split("://").nth(1).unwrap_or(url);
        rest.split(['/', '?', '#']).next().unwrap_or(rest)
    }
    !host(a).is_empty() && host(a).eq_ignore_ascii_case(host(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Keystroke, MovePlan};
    use crate::driver::SessionCookie;
    use crate::events;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::io::Write;
    use std::path::Path;

    /// Scripted page double: a map from address to contact card text, plus
    /// failure knobs.
    #[derive(Default)]
    struct MockDriver {
        cards: HashMap<String, String>,
        missing_tokens: HashSet<String>,
        card_timeouts: HashSet<String>,
        unreadable_cards: HashSet<String>,
        fail_compose: bool,
        current_url: Mutex<String>,
        open_card: Mutex<Option<String>>,
    }

    impl MockDriver {
        fn with_cards(cards: &[(&str, &str)]) -> Self {
            Self {
                cards: cards
                    .iter()
                    .map(|(email, text)| (email.to_lowercase(), text.to_string()))
                    .collect(),
                current_url: Mutex::new("about:blank".to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl UiDriver for MockDriver {
        async fn navigate(&self, url: &str) -> Result<()> {
            *self.current_url.lock() = url.to_string();
            Ok(())
        }

        async fn current_url(&self) -> Result<String> {
            Ok(self.current_url.lock().clone())
        }

        async fn add_cookie(&self, _cookie: &SessionCookie) -> Result<()> {
            Ok(())
        }

        async fn click(&self, _css: &str) -> Result<()> {
            if self.fail_compose {
                return Err(AppError::Initialization("compose button unavailable".into()));
            }
            Ok(())
        }

        async fn replay_pointer(&self, _plan: &MovePlan) -> Result<()> {
            Ok(())
        }

        async fn wait_visible(&self, _css: &str, _timeout: Duration) -> Result<()> {
            let open = self.open_card.lock().clone();
            match open {
                Some(email) if self.card_timeouts.contains(&email) => Err(AppError::Initialization(
                    "card never became visible".into(),
                )),
                _ => Ok(()),
            }
        }

        async fn inner_text(&self, _css: &str) -> Result<String> {
            let open = self.open_card.lock().clone();
            if let Some(email) = &open {
                if self.unreadable_cards.contains(email) {
                    return Err(AppError::Initialization("stale element reference".into()));
                }
            }
            Ok(open
                .and_then(|email| self.cards.get(&email).cloned())
                .unwrap_or_default())
        }

        async fn type_script(&self, _css: &str, _script: &[Keystroke]) -> Result<()> {
            Ok(())
        }

        async fn locate_token(&self, text: &str) -> Result<Option<PathPoint>> {
            let key = text.to_lowercase();
            if self.missing_tokens.contains(&key) {
                return Ok(None);
            }
            *self.open_card.lock() = Some(key);
            Ok(Some(PathPoint::new(300.0, 200.0)))
        }

        async fn press_escape(&self) -> Result<()> {
            *self.open_card.lock() = None;
            Ok(())
        }

        async fn blur(&self) -> Result<()> {
            Ok(())
        }

        async fn screenshot(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn session_blob() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"cookies": [{"name": "cadata", "value": "x", "domain": ".madrid.org"}], "origins": []}"#,
        )
        .unwrap();
        file
    }

    fn test_config(session_path: &Path) -> Config {
        Config {
            session_file: session_path.to_path_buf(),
            ..Default::default()
        }
    }

    const SIP_CARD: &str = "MI:\nsip:user@madrid.org";
    const GENERIC_CARD: &str = "ASP164@MADRID.ORG";

    #[tokio::test(start_paused = true)]
    async fn splits_records_into_batches_of_ten() {
        let blob = session_blob();
        let emails: Vec<String> = (0..23).map(|i| format!("user{}@madrid.org", i)).collect();
        let refs: Vec<&str> = emails.iter().map(|e| e.as_str()).collect();
        let mut store = MemoryStore::with_pending(&refs);

        let cards: Vec<(&str, &str)> = refs.iter().map(|e| (*e, SIP_CARD)).collect();
        let driver = MockDriver::with_cards(&cards);

        let (sender, mut receiver) = events::channel();
        let orchestrator =
            BatchOrchestrator::new(test_config(blob.path()), driver).with_events(sender);

        let stats = orchestrator.run(&mut store).await.unwrap();
        assert_eq!(stats.total_batches, 3);
        assert_eq!(stats.total_emails, 23);
        assert_eq!(stats.successful, 23);

        let mut sizes = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let ProgressEvent::BatchStarted { size, .. } = event {
                sizes.push(size);
            }
        }
        assert_eq!(sizes, vec![10, 10, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn already_processed_rows_are_not_touched() {
        let blob = session_blob();
        let mut store = MemoryStore::with_pending(&["done@madrid.org"]);
        store.records[0].status = Status::Success;

        let driver = MockDriver::with_cards(&[]);
        let orchestrator = BatchOrchestrator::new(test_config(blob.path()), driver);

        let stats = orchestrator.run(&mut store).await.unwrap();
        assert_eq!(stats.total_emails, 0);
        assert!(store.writes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn records_are_classified_independently() {
        let blob = session_blob();
        let mut store = MemoryStore::with_pending(&[
            "hit@madrid.org",
            "generic@madrid.org",
            "ghost@madrid.org",
        ]);

        let mut driver = MockDriver::with_cards(&[
            ("hit@madrid.org", SIP_CARD),
            ("generic@madrid.org", GENERIC_CARD),
        ]);
        driver.missing_tokens.insert("ghost@madrid.org".into());

        let orchestrator = BatchOrchestrator::new(test_config(blob.path()), driver);
        let stats = orchestrator.run(&mut store).await.unwrap();

        assert_eq!(stats.successful, 1);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.errors, 1);

        let status_of = |email: &str| {
            store
                .records
                .iter()
                .find(|r| r.email == email)
                .unwrap()
                .status
        };
        assert_eq!(status_of("hit@madrid.org"), Status::Success);
        assert_eq!(status_of("generic@madrid.org"), Status::NotFound);
        assert_eq!(status_of("ghost@madrid.org"), Status::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn card_timeout_only_fails_that_record() {
        let blob = session_blob();
        let mut store = MemoryStore::with_pending(&["slow@madrid.org", "fast@madrid.org"]);

        let mut driver = MockDriver::with_cards(&[
            ("slow@madrid.org", SIP_CARD),
            ("fast@madrid.org", SIP_CARD),
        ]);
        driver.card_timeouts.insert("slow@madrid.org".into());

        let orchestrator = BatchOrchestrator::new(test_config(blob.path()), driver);
        let stats = orchestrator.run(&mut store).await.unwrap();

        assert_eq!(stats.errors, 1);
        assert_eq!(stats.successful, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_card_only_fails_that_record() {
        let blob = session_blob();
        let mut store = MemoryStore::with_pending(&["stale@madrid.org", "fine@madrid.org"]);

        let mut driver = MockDriver::with_cards(&[
            ("stale@madrid.org", SIP_CARD),
            ("fine@madrid.org", SIP_CARD),
        ]);
        driver.unreadable_cards.insert("stale@madrid.org".into());

        let orchestrator = BatchOrchestrator::new(test_config(blob.path()), driver);
        let stats = orchestrator.run(&mut store).await.unwrap();

        assert_eq!(stats.errors, 1);
        assert_eq!(stats.successful, 1);

        let status_of = |email: &str| {
            store
                .records
                .iter()
                .find(|r| r.email == email)
                .unwrap()
                .status
        };
        assert_eq!(status_of("stale@madrid.org"), Status::Error);
        assert_eq!(status_of("fine@madrid.org"), Status::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_failure_marks_every_pending_record() {
        let blob = session_blob();
        let mut store = MemoryStore::with_pending(&["a@madrid.org", "b@madrid.org"]);

        let driver = MockDriver {
            fail_compose: true,
            current_url: Mutex::new("about:blank".to_string()),
            ..Default::default()
        };
        let orchestrator = BatchOrchestrator::new(test_config(blob.path()), driver);

        let stats = orchestrator.run(&mut store).await.unwrap();
        assert_eq!(stats.errors, 2);
        assert!(store
            .records
            .iter()
            .all(|r| r.status == Status::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_session_blob_aborts_the_run() {
        let mut store = MemoryStore::with_pending(&["a@madrid.org"]);
        let driver = MockDriver::with_cards(&[]);
        let config = test_config(Path::new("/nonexistent/state.json"));
        let orchestrator = BatchOrchestrator::new(config, driver);

        let result = orchestrator.run(&mut store).await;
        assert!(matches!(result, Err(AppError::SessionInvalid(_))));
        assert!(store.writes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_flag_leaves_remaining_records_pending() {
        let blob = session_blob();
        let emails: Vec<String> = (0..12).map(|i| format!("user{}@madrid.org", i)).collect();
        let refs: Vec<&str> = emails.iter().map(|e| e.as_str()).collect();
        let mut store = MemoryStore::with_pending(&refs);

        let cards: Vec<(&str, &str)> = refs.iter().map(|e| (*e, SIP_CARD)).collect();
        let driver = MockDriver::with_cards(&cards);
        let orchestrator = BatchOrchestrator::new(test_config(blob.path()), driver);

        // Stop before the run starts: the first batch check bails out
        // immediately and no record is written.
        orchestrator.stop_flag().store(true, Ordering::SeqCst);
        let stats = orchestrator.run(&mut store).await.unwrap();
        assert_eq!(stats.total_emails, 0);
        assert!(store.records.iter().all(|r| r.status == Status::Pending));
    }

    #[tokio::test(start_paused = true)]
    async fn validate_setup_reports_session_and_pending() {
        let blob = session_blob();
        let mut store = MemoryStore::with_pending(&["a@madrid.org", "b@madrid.org"]);
        let driver = MockDriver::with_cards(&[]);
        let orchestrator = BatchOrchestrator::new(test_config(blob.path()), driver);

        let report = orchestrator.validate_setup(&mut store);
        assert!(report.is_ready());
        assert_eq!(report.pending_records, 2);

        let bad = BatchOrchestrator::new(
            test_config(Path::new("/nonexistent/state.json")),
            MockDriver::with_cards(&[]),
        );
        let report = bad.validate_setup(&mut store);
        assert!(!report.is_ready());
        assert!(report.session_detail.is_some());
    }
}

//! Runs due schedules under a store-wide lock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::interval;
use tracing::{error, info, warn};

use promo_models::{ArtifactMeta, Product, Schedule, ScheduleStatus, VideoOptions};
use promo_store::CacheStore;

use crate::error::ApiResult;
use crate::metrics;
use crate::services::card::CardService;

/// Name of the lock key guarding scheduler runs.
pub const SCHEDULER_LOCK: &str = "scheduler";

/// Outcome of one scheduler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Another run held the lock
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub status: RunStatus,
    pub schedules_run: usize,
    pub products_processed: usize,
    pub artifacts: Vec<ArtifactMeta>,
    pub errors: Vec<String>,
}

impl RunSummary {
    fn skipped() -> Self {
        Self {
            status: RunStatus::Skipped,
            schedules_run: 0,
            products_processed: 0,
            artifacts: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Executes due schedules.
#[derive(Clone)]
pub struct SchedulerService {
    store: Arc<dyn CacheStore>,
    cards: CardService,
    lock_ttl: Duration,
}

impl SchedulerService {
    pub fn new(store: Arc<dyn CacheStore>, cards: CardService, lock_ttl: Duration) -> Self {
        Self {
            store,
            cards,
            lock_ttl,
        }
    }

    /// Run every pending schedule due at `now`.
    ///
    /// Returns a `skipped` summary without touching anything when another
    /// run holds the lock.
    pub async fn run_due(&self, now: DateTime<Utc>) -> ApiResult<RunSummary> {
        if !self.store.try_acquire_lock(SCHEDULER_LOCK, self.lock_ttl).await? {
            info!("Scheduler lock held elsewhere, skipping run");
            metrics::record_scheduler_run("skipped");
            return Ok(RunSummary::skipped());
        }

        let result = self.run_locked(now).await;

        if let Err(e) = self.store.release_lock(SCHEDULER_LOCK).await {
            warn!(error = %e, "Failed to release scheduler lock");
        }

        metrics::record_scheduler_run(if result.is_ok() { "completed" } else { "failed" });
        result
    }

    async fn run_locked(&self, now: DateTime<Utc>) -> ApiResult<RunSummary> {
        // A run older than the lock TTL has lost its lock; its schedules are orphaned
        let stall_timeout = chrono::Duration::from_std(self.lock_ttl).unwrap_or(chrono::Duration::hours(1));
        let due: Vec<Schedule> = self
            .store
            .list_schedules()
            .await?
            .into_iter()
            .filter(|s| s.is_due(now) || s.is_stalled(now, stall_timeout))
            .collect();

        let mut summary = RunSummary {
            status: RunStatus::Completed,
            schedules_run: 0,
            products_processed: 0,
            artifacts: Vec::new(),
            errors: Vec::new(),
        };

        if due.is_empty() {
            return Ok(summary);
        }
        info!(count = due.len(), "Running due schedules");

        for mut schedule in due {
            if schedule.status == ScheduleStatus::Running {
                warn!(schedule_id = %schedule.id, "Recovering stalled schedule");
            }
            schedule.status = ScheduleStatus::Running;
            schedule.last_run_at = Some(now);
            if let Err(e) = self.store.update_schedule(&schedule).await {
                error!(schedule_id = %schedule.id, error = %e, "Failed to mark schedule running");
                summary.errors.push(format!("{}: {}", schedule.id, e));
                continue;
            }

            let outcome = self.run_schedule(&schedule, &mut summary).await;

            match outcome {
                Ok(processed) => {
                    info!(schedule_id = %schedule.id, processed, "Schedule completed");
                    schedule.status = ScheduleStatus::Completed;
                    schedule.last_error = None;
                }
                Err(e) => {
                    error!(schedule_id = %schedule.id, error = %e, "Schedule failed");
                    summary.errors.push(format!("{}: {}", schedule.id, e.message()));
                    schedule.status = ScheduleStatus::Failed;
                    schedule.last_error = Some(e.message());
                }
            }

            if let Some(next) = schedule.next_occurrence(now) {
                schedule.rearm(next);
            }
            if let Err(e) = self.store.update_schedule(&schedule).await {
                error!(schedule_id = %schedule.id, error = %e, "Failed to save schedule outcome");
                summary.errors.push(format!("{}: {}", schedule.id, e));
            }
            summary.schedules_run += 1;
        }

        Ok(summary)
    }

    /// Generate artifacts for up to `product_limit` unprocessed products.
    async fn run_schedule(&self, schedule: &Schedule, summary: &mut RunSummary) -> ApiResult<usize> {
        let products = self.pick_products(schedule.options.product_limit).await?;
        if products.is_empty() {
            info!(schedule_id = %schedule.id, "No unprocessed products left");
            return Ok(0);
        }

        let mut processed = 0;
        let mut last_error = None;
        for product in &products {
            match self.process_product(schedule, product, summary).await {
                Ok(()) => processed += 1,
                Err(e) => {
                    warn!(schedule_id = %schedule.id, product_id = %product.item_id, error = %e, "Product failed");
                    summary
                        .errors
                        .push(format!("{}/{}: {}", schedule.id, product.item_id, e.message()));
                    last_error = Some(e);
                }
            }
        }
        summary.products_processed += processed;

        match last_error {
            Some(e) if processed == 0 => Err(e),
            _ => Ok(processed),
        }
    }

    async fn process_product(
        &self,
        schedule: &Schedule,
        product: &Product,
        summary: &mut RunSummary,
    ) -> ApiResult<()> {
        let card = self
            .cards
            .generate_card(product, &schedule.options.card, None)
            .await?;
        summary.artifacts.push(self.cards.persist(&card).await?);

        if schedule.options.generate_video {
            let options = VideoOptions {
                card: schedule.options.card.clone(),
                ..Default::default()
            };
            let video = self.cards.generate_video(product, &options).await?;
            summary.artifacts.push(self.cards.persist(&video).await?);
        }

        self.store.mark_processed(&product.item_id).await?;
        Ok(())
    }

    async fn pick_products(&self, limit: usize) -> ApiResult<Vec<Product>> {
        let processed: HashSet<String> = self.store.processed_ids().await?.into_iter().collect();
        let products = self.store.products_or_sample().await.products;
        Ok(products
            .into_iter()
            .filter(|p| !processed.contains(&p.item_id))
            .take(limit.max(1))
            .collect())
    }
}

/// Periodically calls [`SchedulerService::run_due`].
pub struct SchedulerLoop {
    service: SchedulerService,
    period: Duration,
}

impl SchedulerLoop {
    pub fn new(service: SchedulerService, period: Duration) -> Self {
        Self { service, period }
    }

    /// Run forever; spawn this as a background task.
    pub async fn run(self) {
        info!("Starting scheduler loop (interval: {:?})", self.period);
        let mut ticker = interval(self.period);

        loop {
            ticker.tick().await;

            match self.service.run_due(Utc::now()).await {
                Ok(summary) if summary.schedules_run > 0 => info!(
                    schedules = summary.schedules_run,
                    products = summary.products_processed,
                    "Scheduler tick finished"
                ),
                Ok(_) => {}
                Err(e) => error!("Scheduler tick failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use promo_media::{RenderConfig, Renderer};
    use promo_models::{ArtifactFormat, CardOptions, Description, Frequency, ScheduleOptions};
    use promo_store::{FileStore, StoreError, StoreResult};

    use crate::services::{DescriptionService, LocalOutput};

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<dyn CacheStore>,
        scheduler: SchedulerService,
    }

    /// File store whose `update_schedule` fails on one chosen call (1-based).
    struct FlakyStore {
        inner: FileStore,
        fail_update: usize,
        updates: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for FlakyStore {
        fn backend_name(&self) -> &'static str {
            "flaky"
        }
        async fn ping(&self) -> StoreResult<()> {
            self.inner.ping().await
        }
        async fn get_products(&self) -> StoreResult<Option<Vec<Product>>> {
            self.inner.get_products().await
        }
        async fn set_products(&self, products: &[Product]) -> StoreResult<()> {
            self.inner.set_products(products).await
        }
        async fn clear_products(&self) -> StoreResult<()> {
            self.inner.clear_products().await
        }
        async fn get_description(&self, product_id: &str) -> StoreResult<Option<Description>> {
            self.inner.get_description(product_id).await
        }
        async fn set_description(&self, description: &Description) -> StoreResult<()> {
            self.inner.set_description(description).await
        }
        async fn delete_description(&self, product_id: &str) -> StoreResult<bool> {
            self.inner.delete_description(product_id).await
        }
        async fn clear_descriptions(&self) -> StoreResult<u64> {
            self.inner.clear_descriptions().await
        }
        async fn mark_processed(&self, product_id: &str) -> StoreResult<bool> {
            self.inner.mark_processed(product_id).await
        }
        async fn is_processed(&self, product_id: &str) -> StoreResult<bool> {
            self.inner.is_processed(product_id).await
        }
        async fn processed_ids(&self) -> StoreResult<Vec<String>> {
            self.inner.processed_ids().await
        }
        async fn clear_processed(&self) -> StoreResult<()> {
            self.inner.clear_processed().await
        }
        async fn register_video(&self, meta: &ArtifactMeta) -> StoreResult<()> {
            self.inner.register_video(meta).await
        }
        async fn get_video(&self, video_id: &str) -> StoreResult<Option<ArtifactMeta>> {
            self.inner.get_video(video_id).await
        }
        async fn list_videos(&self) -> StoreResult<Vec<ArtifactMeta>> {
            self.inner.list_videos().await
        }
        async fn delete_video(&self, video_id: &str) -> StoreResult<bool> {
            self.inner.delete_video(video_id).await
        }
        async fn clear_videos(&self) -> StoreResult<u64> {
            self.inner.clear_videos().await
        }
        async fn list_schedules(&self) -> StoreResult<Vec<Schedule>> {
            self.inner.list_schedules().await
        }
        async fn add_schedule(&self, schedule: &Schedule) -> StoreResult<()> {
            self.inner.add_schedule(schedule).await
        }
        async fn update_schedule(&self, schedule: &Schedule) -> StoreResult<bool> {
            if self.updates.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_update {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.update_schedule(schedule).await
        }
        async fn try_acquire_lock(&self, name: &str, ttl: Duration) -> StoreResult<bool> {
            self.inner.try_acquire_lock(name, ttl).await
        }
        async fn release_lock(&self, name: &str) -> StoreResult<()> {
            self.inner.release_lock(name).await
        }
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::TempDir::new().unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(FileStore::open(dir.path().join("db")).await.unwrap());
        fixture_with(dir, store)
    }

    async fn flaky_fixture(fail_update: usize) -> Fixture {
        let dir = tempfile::TempDir::new().unwrap();
        let store: Arc<dyn CacheStore> = Arc::new(FlakyStore {
            inner: FileStore::open(dir.path().join("db")).await.unwrap(),
            fail_update,
            updates: AtomicUsize::new(0),
        });
        fixture_with(dir, store)
    }

    fn fixture_with(dir: tempfile::TempDir, store: Arc<dyn CacheStore>) -> Fixture {
        let renderer = Renderer::new(RenderConfig {
            chrome_path: Some(PathBuf::from("/nonexistent/chrome")),
            ffmpeg_path: Some(PathBuf::from("/nonexistent/ffmpeg")),
            work_dir: dir.path().join("work"),
            ..Default::default()
        })
        .unwrap();
        let cards = CardService::new(
            store.clone(),
            DescriptionService::new(store.clone(), None),
            Arc::new(renderer),
            None,
            None,
            LocalOutput::new(dir.path().join("out")),
        );
        Fixture {
            _dir: dir,
            scheduler: SchedulerService::new(store.clone(), cards, Duration::from_secs(60)),
            store,
        }
    }

    fn html_schedule(frequency: Frequency, limit: usize) -> Schedule {
        let options = ScheduleOptions {
            card: CardOptions {
                format: ArtifactFormat::Html,
                ..Default::default()
            },
            product_limit: limit,
            generate_video: false,
        };
        Schedule::new("2026-01-01", "08:00", frequency, options).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_once_schedule_processes_products() {
        let fx = fixture().await;
        let schedule = html_schedule(Frequency::Once, 2);
        fx.store.add_schedule(&schedule).await.unwrap();

        let summary = fx.scheduler.run_due(now()).await.unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.schedules_run, 1);
        assert_eq!(summary.products_processed, 2);
        assert_eq!(summary.artifacts.len(), 2);
        assert_eq!(fx.store.processed_ids().await.unwrap().len(), 2);

        let stored = fx.store.list_schedules().await.unwrap().remove(0);
        assert_eq!(stored.status, ScheduleStatus::Completed);
        assert_eq!(stored.last_run_at, Some(now()));

        // Nothing is due any more
        let again = fx.scheduler.run_due(now()).await.unwrap();
        assert_eq!(again.schedules_run, 0);
    }

    #[tokio::test]
    async fn test_daily_schedule_is_rearmed() {
        let fx = fixture().await;
        fx.store
            .add_schedule(&html_schedule(Frequency::Daily, 1))
            .await
            .unwrap();

        fx.scheduler.run_due(now()).await.unwrap();

        let stored = fx.store.list_schedules().await.unwrap().remove(0);
        assert_eq!(stored.status, ScheduleStatus::Pending);
        assert_eq!(stored.date, "2026-01-02");
        assert_eq!(stored.time, "08:00");
    }

    #[tokio::test]
    async fn test_future_schedule_is_left_alone() {
        let fx = fixture().await;
        let schedule = Schedule::new("2026-01-02", "08:00", Frequency::Once, ScheduleOptions::default()).unwrap();
        fx.store.add_schedule(&schedule).await.unwrap();

        let summary = fx.scheduler.run_due(now()).await.unwrap();
        assert_eq!(summary.schedules_run, 0);
        assert_eq!(fx.store.list_schedules().await.unwrap()[0].status, ScheduleStatus::Pending);
    }

    #[tokio::test]
    async fn test_render_failure_marks_schedule_failed() {
        let fx = fixture().await;
        // PNG needs a browser, which the fixture does not have
        let schedule = Schedule::new("2026-01-01", "08:00", Frequency::Once, ScheduleOptions::default()).unwrap();
        fx.store.add_schedule(&schedule).await.unwrap();

        let summary = fx.scheduler.run_due(now()).await.unwrap();
        assert_eq!(summary.schedules_run, 1);
        assert!(!summary.errors.is_empty());

        let stored = fx.store.list_schedules().await.unwrap().remove(0);
        assert_eq!(stored.status, ScheduleStatus::Failed);
        assert!(stored.last_error.is_some());
        assert!(fx.store.processed_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_held_lock_skips_run() {
        let fx = fixture().await;
        fx.store
            .add_schedule(&html_schedule(Frequency::Once, 1))
            .await
            .unwrap();
        assert!(fx
            .store
            .try_acquire_lock(SCHEDULER_LOCK, Duration::from_secs(60))
            .await
            .unwrap());

        let summary = fx.scheduler.run_due(now()).await.unwrap();
        assert_eq!(summary.status, RunStatus::Skipped);
        assert_eq!(fx.store.list_schedules().await.unwrap()[0].status, ScheduleStatus::Pending);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_strand_schedule() {
        // Second update is the first schedule's outcome write
        let fx = flaky_fixture(2).await;
        let first = html_schedule(Frequency::Once, 1);
        let second = html_schedule(Frequency::Once, 1);
        fx.store.add_schedule(&first).await.unwrap();
        fx.store.add_schedule(&second).await.unwrap();

        let summary = fx.scheduler.run_due(now()).await.unwrap();
        assert_eq!(summary.schedules_run, 2);
        assert_eq!(summary.artifacts.len(), 2);
        assert!(summary.errors.iter().any(|e| e.contains("disk full")));

        let status_of = |schedules: &[Schedule], id: &str| {
            schedules.iter().find(|s| s.id == id).unwrap().status
        };
        let stored = fx.store.list_schedules().await.unwrap();
        assert_eq!(status_of(&stored, &first.id), ScheduleStatus::Running);
        assert_eq!(status_of(&stored, &second.id), ScheduleStatus::Completed);

        // Still inside the lock TTL: left alone
        let early = fx.scheduler.run_due(now() + chrono::Duration::seconds(30)).await.unwrap();
        assert_eq!(early.schedules_run, 0);

        // Past the TTL: picked up again and finished
        let later = fx.scheduler.run_due(now() + chrono::Duration::minutes(2)).await.unwrap();
        assert_eq!(later.schedules_run, 1);
        let stored = fx.store.list_schedules().await.unwrap();
        assert_eq!(status_of(&stored, &first.id), ScheduleStatus::Completed);
    }
}

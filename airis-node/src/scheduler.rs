//! Sampling Scheduler
//!
//! Drives one acquisition-and-delivery cycle at a time, forever:
//!
//! ```text
//! loop
//!   due? ── no ──────────────────────────────┐
//!    │ yes                                   │
//!    ▼                                       ▼
//!   acquire ──► deliver ──► update anchor   sleep(tick) | shutdown ──► release
//! ```
//!
//! A cycle is due when nothing has been delivered yet or a full interval has
//! passed since the start of the last delivered cycle. Failed cycles leave
//! the anchor where it is, so the node retries on the next tick instead of
//! waiting another interval.
//!
//! Sensor access (warm-up, acquisition, release) sleeps the calling thread,
//! so it runs on Tokio's blocking pool and the executor stays free for
//! timers and the shutdown signal.

use std::fmt::Write as _;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use airis_connectors::{DeliveryOutcome, TelemetrySink, TransmissionPipeline};
use airis_core::{
    constants::SCHEDULER_TICK_MS, errors::CycleFailure, time::TimeSource, traits::SensorBus,
    Aggregator, CompositeRecord, DeviceId,
};
use tokio::time::Instant;

/// Wake-up granularity of the idle loop
pub const DEFAULT_TICK: Duration = Duration::from_millis(SCHEDULER_TICK_MS);

/// Result of one scheduler cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Required sensors failed; nothing was sent
    ReadFailed(CycleFailure),
    /// A record was assembled and handed to the pipeline
    Transmitted(DeliveryOutcome),
    /// The sensor task panicked or was cancelled; nothing was sent
    Interrupted,
}

/// Cycle counters for the shutdown summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cycles started
    pub cycles: u64,
    /// Records accepted by the sink
    pub delivered: u64,
    /// Records discarded after a failed delivery
    pub dropped: u64,
    /// Records written to the spill directory
    pub spilled: u64,
    /// Records lost because the spill write failed too
    pub lost: u64,
    /// Cycles without a record (required sensor failed or sensor task aborted)
    pub read_failures: u64,
}

/// Periodic driver of aggregator and pipeline
pub struct Scheduler<B, T, S> {
    aggregator: Arc<Mutex<Aggregator<B, T>>>,
    pipeline: TransmissionPipeline<S>,
    device_id: DeviceId,
    interval: Duration,
    tick: Duration,
    last_success: Option<Instant>,
    stats: SchedulerStats,
}

impl<B, T, S> Scheduler<B, T, S>
where
    B: SensorBus + Send + 'static,
    T: TimeSource + Send + 'static,
    S: TelemetrySink,
{
    /// Scheduler with the default idle tick; nothing runs until [`run`](Self::run)
    pub fn new(
        aggregator: Aggregator<B, T>,
        pipeline: TransmissionPipeline<S>,
        device_id: DeviceId,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator: Arc::new(Mutex::new(aggregator)),
            pipeline,
            device_id,
            interval,
            tick: DEFAULT_TICK,
            last_success: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Override the idle tick
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Whether a cycle should start at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_success {
            None => true,
            Some(anchor) => now.saturating_duration_since(anchor) >= self.interval,
        }
    }

    /// Acquire one record and deliver it
    ///
    /// Only a delivered record moves the anchor, and it moves to the instant
    /// this cycle started.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let started = Instant::now();
        self.stats.cycles += 1;

        let device_id = self.device_id.clone();
        let acquired = self
            .on_sensors(move |aggregator| aggregator.acquire_cycle(&device_id))
            .await;

        let record = match acquired {
            Some(Ok(record)) => record,
            None => {
                self.stats.read_failures += 1;
                return CycleOutcome::Interrupted;
            }
            Some(Err(failure)) => {
                self.stats.read_failures += 1;
                for f in &failure.failures {
                    log::error!(
                        "Cycle {}: {} on channel {} failed: {}",
                        self.stats.cycles,
                        f.kind,
                        f.channel,
                        f.error
                    );
                }
                log::error!("Cycle {}: no record, {}", self.stats.cycles, failure);
                return CycleOutcome::ReadFailed(failure);
            }
        };

        log::info!("Cycle {}: {}", self.stats.cycles, summary(&record));

        let outcome = self.pipeline.deliver(record).await;
        match &outcome {
            DeliveryOutcome::Delivered => {
                self.stats.delivered += 1;
                self.last_success = Some(started);
            }
            DeliveryOutcome::Dropped { .. } => self.stats.dropped += 1,
            DeliveryOutcome::Spilled { .. } => self.stats.spilled += 1,
            DeliveryOutcome::Lost(_) => self.stats.lost += 1,
        }
        log::info!("Cycle {}: {}", self.stats.cycles, outcome);

        CycleOutcome::Transmitted(outcome)
    }

    /// Run cycles until `shutdown` resolves
    ///
    /// A cycle already in progress finishes before the loop exits; the
    /// sensors are released afterwards.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        log::info!(
            "Scheduler started for {} (interval {}s)",
            self.device_id,
            self.interval.as_secs()
        );
        self.on_sensors(|aggregator| aggregator.start()).await;

        tokio::pin!(shutdown);
        loop {
            if self.is_due(Instant::now()) {
                self.run_cycle().await;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.tick) => {}
            }
        }

        self.on_sensors(|aggregator| aggregator.release()).await;
        let s = self.stats;
        log::info!(
            "Scheduler stopped after {} cycles: {} delivered, {} dropped, {} spilled, {} lost, {} read failures",
            s.cycles,
            s.delivered,
            s.dropped,
            s.spilled,
            s.lost,
            s.read_failures
        );
    }

    /// Counters so far
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Start instant of the last delivered cycle
    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }

    /// Lock the aggregator
    ///
    /// Blocks while a cycle is reading the sensors.
    pub fn aggregator(&self) -> MutexGuard<'_, Aggregator<B, T>> {
        lock(&self.aggregator)
    }

    /// Borrow the transmission pipeline
    pub fn pipeline(&self) -> &TransmissionPipeline<S> {
        &self.pipeline
    }

    /// Run `f` against the aggregator on the blocking pool
    ///
    /// `None` if the task panicked or was cancelled.
    async fn on_sensors<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Aggregator<B, T>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let aggregator = Arc::clone(&self.aggregator);
        match tokio::task::spawn_blocking(move || f(&mut *lock(&aggregator))).await {
            Ok(result) => Some(result),
            Err(err) => {
                log::error!("Sensor task failed: {}", err);
                None
            }
        }
    }
}

fn lock<A>(aggregator: &Arc<Mutex<A>>) -> MutexGuard<'_, A> {
    // A panicked sensor task leaves the aggregator usable
    aggregator.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `co2=812.34ppm pm25=0.05mg/m³ ... [warning]`
fn summary(record: &CompositeRecord) -> String {
    let mut line = String::new();
    for reading in record.readings() {
        let _ = write!(
            line,
            "{}={:.2}{} ",
            reading.sensor_type,
            reading.value,
            reading.unit.symbol()
        );
    }
    let _ = write!(line, "[{}]", record.worst_alert());
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimulatedBus;
    use airis_connectors::{MemorySink, SpillStore, TransportError};
    use airis_core::{
        record::device_id, time::FixedTime, SensorConfig, SensorKind, ThresholdTable,
    };

    fn sensors() -> Vec<SensorConfig> {
        vec![
            SensorConfig::new(SensorKind::Mq7, 32),
            SensorConfig::new(SensorKind::Mq135, 35),
            SensorConfig::new(SensorKind::Gp2y1014, 34).with_led_pin(4),
            SensorConfig::new(SensorKind::Dht22, 27),
        ]
    }

    fn scheduler(
        bus: SimulatedBus,
        sink: MemorySink,
        spill: &std::path::Path,
        interval_s: u64,
    ) -> Scheduler<SimulatedBus, FixedTime, MemorySink> {
        let aggregator = Aggregator::new(
            bus,
            FixedTime::new(1_700_000_000_000),
            ThresholdTable::new(),
            &sensors(),
        )
        .unwrap();
        let pipeline = TransmissionPipeline::new(sink, SpillStore::new(spill));
        Scheduler::new(
            aggregator,
            pipeline,
            device_id("AIRIS_TEST").unwrap(),
            Duration::from_secs(interval_s),
        )
    }

    fn refused() -> TransportError {
        TransportError::Request("connection refused".into())
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_is_due_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = scheduler(SimulatedBus::seeded(1), MemorySink::new(), dir.path(), 30);

        assert!(s.is_due(Instant::now()));
        let outcome = s.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::Transmitted(DeliveryOutcome::Delivered)));

        let anchor = s.last_success().unwrap();
        assert!(!s.is_due(anchor + Duration::from_secs(29)));
        assert!(s.is_due(anchor + Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_interval() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        let mut s = scheduler(SimulatedBus::seeded(2), sink.clone(), dir.path(), 30)
            .with_tick(Duration::from_millis(250));

        s.run(tokio::time::sleep(Duration::from_secs(65))).await;

        // t = 0, 30, 60
        assert_eq!(s.stats().cycles, 3);
        assert_eq!(s.stats().delivered, 3);
        assert_eq!(sink.accepted().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delivery_retries_next_tick() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        for _ in 0..3 {
            sink.push_failure(refused());
        }
        let mut s = scheduler(SimulatedBus::seeded(3), sink.clone(), dir.path(), 30);

        s.run(tokio::time::sleep(Duration::from_millis(10_500))).await;

        // t = 0, 1, 2 fail (third spills), t = 3 delivers, next due at 33
        let stats = s.stats();
        assert_eq!(stats.cycles, 4);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.spilled, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(s.pipeline().state().consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_keeps_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let mut bus = SimulatedBus::seeded(4);
        bus.break_channel(34);
        let sink = MemorySink::new();
        let mut s = scheduler(bus, sink.clone(), dir.path(), 30);

        match s.run_cycle().await {
            CycleOutcome::ReadFailed(failure) => {
                assert!(failure.involves(SensorKind::Gp2y1014));
                assert_eq!(failure.failures.len(), 1);
            }
            other => panic!("expected read failure, got {:?}", other),
        }
        assert!(s.last_success().is_none());
        assert!(s.is_due(Instant::now()));
        assert_eq!(sink.attempts(), 0);
    }

    #[tokio::test]
    async fn sensor_delays_leave_the_executor_free() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let mut s = scheduler(SimulatedBus::new(), MemorySink::new(), dir.path(), 30);

        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);
        let ticker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        // Real-time bus: the climate read alone settles for 200 ms
        let outcome = s.run_cycle().await;
        ticker.abort();

        assert!(!matches!(outcome, CycleOutcome::Interrupted));
        assert!(ticks.load(Ordering::Relaxed) > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_sensors() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = scheduler(SimulatedBus::seeded(5), MemorySink::new(), dir.path(), 30);

        s.run(std::future::ready(())).await;

        // The loop always checks for a due cycle before listening for shutdown
        assert_eq!(s.stats().cycles, 1);
        assert_eq!(
            s.aggregator().bus().level(4),
            Some(airis_core::traits::Level::High)
        );
    }
}

//! Concurrent fan-out of all metric sources with a per-tick join barrier

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::config::SamplingConfig;
use crate::metrics::{MetricResult, MetricSource};

/// A registered source and whether a job for it is still on the pool
struct Slot {
    source: Arc<dyn MetricSource>,
    busy: Arc<AtomicBool>,
}

/// Marks a source busy; cleared when dropped, including on panic unwind.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn claim(busy: &Arc<AtomicBool>) -> Option<Self> {
        if busy.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(Arc::clone(busy)))
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs every registered source once per call, in parallel, on a bounded pool.
///
/// The pool is the tokio blocking pool gated by a semaphore that lives as long
/// as the sampler, so worker capacity is shared by every tick. A source is
/// never started twice: while an earlier job outlives its timeout, later
/// ticks report it as still running without taking a worker.
pub struct Sampler {
    slots: Vec<Slot>,
    workers: Arc<Semaphore>,
    timeout: Duration,
    pace: Duration,
}

impl Sampler {
    pub fn new(sources: Vec<Arc<dyn MetricSource>>, config: &SamplingConfig) -> Self {
        Self::with_limits(
            sources,
            config.workers,
            config.source_timeout(),
            config.interval(),
        )
    }

    /// `pace` is the minimum wall-clock length of one `sample_all` call.
    /// `timeout` bounds a source's run time, not its wait for a worker.
    pub fn with_limits(
        sources: Vec<Arc<dyn MetricSource>>,
        workers: usize,
        timeout: Duration,
        pace: Duration,
    ) -> Self {
        Self {
            slots: sources
                .into_iter()
                .map(|source| Slot {
                    source,
                    busy: Arc::new(AtomicBool::new(false)),
                })
                .collect(),
            workers: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
            pace,
        }
    }

    pub fn source_count(&self) -> usize {
        self.slots.len()
    }

    /// One result per source, in registration order, after every source has
    /// finished or been marked failed.
    pub async fn sample_all(&self) -> Vec<MetricResult> {
        let started = Instant::now();
        let jobs = self.slots.iter().map(|slot| self.sample_one(slot));

        let (results, ()) = tokio::join!(
            futures::future::join_all(jobs),
            tokio::time::sleep(self.pace)
        );

        let failed: Vec<&str> = results
            .iter()
            .filter(|r| r.is_failure())
            .map(|r| r.title())
            .collect();
        tracing::debug!(
            sources = results.len(),
            ?failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sampled all sources"
        );
        results
    }

    async fn sample_one(&self, slot: &Slot) -> MetricResult {
        let title = slot.source.title().to_string();

        let Some(in_flight) = InFlight::claim(&slot.busy) else {
            tracing::debug!(source = %title, "previous sample still running");
            return MetricResult::failed(title, "still running");
        };

        let permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!(source = %title, error = %e, "worker pool closed");
                return MetricResult::failed(title, "worker pool closed");
            }
        };

        // Permit and busy flag move into the blocking job, so a source that
        // outlives its timeout keeps its worker and stays busy until it returns.
        let source = Arc::clone(&slot.source);
        let job = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _in_flight = in_flight;
            source.sample()
        });

        match tokio::time::timeout(self.timeout, job).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(source = %title, error = %e, "metric source aborted");
                let reason = if e.is_panic() { "panicked" } else { "was cancelled" };
                MetricResult::failed(title, format!("source {}", reason))
            }
            Err(_) => {
                tracing::warn!(source = %title, timeout = ?self.timeout, "metric source timed out");
                MetricResult::failed(
                    title,
                    format!("timed out after {:.1}s", self.timeout.as_secs_f64()),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Reading, SourceError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Rows,
        Fail,
        Panic,
    }

    struct FakeSource {
        title: String,
        delay: Duration,
        behaviour: Behaviour,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn new(title: &str, delay_ms: u64, behaviour: Behaviour) -> Self {
            Self {
                title: title.to_string(),
                delay: Duration::from_millis(delay_ms),
                behaviour,
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn tracked(mut self, in_flight: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> Self {
            self.in_flight = Arc::clone(in_flight);
            self.peak = Arc::clone(peak);
            self
        }
    }

    impl MetricSource for FakeSource {
        fn title(&self) -> &str {
            &self.title
        }

        fn collect(&self) -> Result<Reading, SourceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.behaviour {
                Behaviour::Rows => Ok(Reading::Rows(vec![vec![self.title.clone()]])),
                Behaviour::Fail => Err(SourceError::parse("fake", "bad input")),
                Behaviour::Panic => panic!("source blew up"),
            }
        }
    }

    fn titles(results: &[MetricResult]) -> Vec<&str> {
        results.iter().map(|r| r.title()).collect()
    }

    fn sampler(sources: Vec<FakeSource>, workers: usize, timeout_ms: u64) -> Sampler {
        let sources = sources
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn MetricSource>)
            .collect();
        Sampler::with_limits(
            sources,
            workers,
            Duration::from_millis(timeout_ms),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn keeps_registration_order_when_finishing_out_of_order() {
        let sampler = sampler(
            vec![
                FakeSource::new("slow", 150, Behaviour::Rows),
                FakeSource::new("medium", 60, Behaviour::Rows),
                FakeSource::new("fast", 0, Behaviour::Rows),
            ],
            4,
            5_000,
        );

        let results = sampler.sample_all().await;
        assert_eq!(titles(&results), vec!["slow", "medium", "fast"]);
        assert!(results.iter().all(|r| matches!(r, MetricResult::Section { .. })));
    }

    #[tokio::test]
    async fn failures_stay_in_their_slot() {
        let sampler = sampler(
            vec![
                FakeSource::new("ok-1", 20, Behaviour::Rows),
                FakeSource::new("broken", 0, Behaviour::Fail),
                FakeSource::new("panics", 0, Behaviour::Panic),
                FakeSource::new("ok-2", 50, Behaviour::Rows),
            ],
            4,
            5_000,
        );

        let results = sampler.sample_all().await;
        assert_eq!(results.len(), 4);
        assert_eq!(titles(&results), vec!["ok-1", "broken", "panics", "ok-2"]);
        assert!(!results[0].is_failure());
        assert!(results[1].is_failure());
        assert_eq!(
            results[2],
            MetricResult::failed("panics", "source panicked")
        );
        assert!(!results[3].is_failure());
    }

    #[tokio::test]
    async fn runs_sources_concurrently() {
        let sampler = sampler(
            (0..4)
                .map(|i| FakeSource::new(&format!("s{}", i), 200, Behaviour::Rows))
                .collect(),
            4,
            5_000,
        );

        let started = Instant::now();
        let results = sampler.sample_all().await;
        assert_eq!(results.len(), 4);
        // Sequential execution would take 800ms
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn never_exceeds_worker_ceiling() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let sampler = sampler(
            (0..6)
                .map(|i| {
                    FakeSource::new(&format!("s{}", i), 40, Behaviour::Rows).tracked(&in_flight, &peak)
                })
                .collect(),
            2,
            5_000,
        );

        let results = sampler.sample_all().await;
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| !r.is_failure()));
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn stalled_source_times_out_without_blocking_others() {
        let sampler = sampler(
            vec![
                FakeSource::new("stalled", 1_000, Behaviour::Rows),
                FakeSource::new("fine", 10, Behaviour::Rows),
            ],
            4,
            200,
        );

        let started = Instant::now();
        let results = sampler.sample_all().await;
        assert!(started.elapsed() < Duration::from_millis(900));
        assert_eq!(
            results[0],
            MetricResult::failed("stalled", "timed out after 0.2s")
        );
        assert!(!results[1].is_failure());
    }

    #[tokio::test]
    async fn stalled_source_does_not_starve_later_ticks() {
        let sampler = sampler(
            vec![
                FakeSource::new("stalled", 800, Behaviour::Rows),
                FakeSource::new("healthy", 0, Behaviour::Rows),
            ],
            2,
            200,
        );

        let first = sampler.sample_all().await;
        assert_eq!(
            first[0],
            MetricResult::failed("stalled", "timed out after 0.2s")
        );
        assert!(matches!(first[1], MetricResult::Section { .. }));

        for tick in 1..4 {
            let results = sampler.sample_all().await;
            assert_eq!(
                results[0],
                MetricResult::failed("stalled", "still running"),
                "tick {}",
                tick
            );
            assert!(
                matches!(results[1], MetricResult::Section { .. }),
                "tick {}: {:?}",
                tick,
                results[1]
            );
        }
        // only the stalled job holds a worker
        assert_eq!(sampler.workers.available_permits(), 1);

        // once the stalled job returns, the source is sampled again
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(sampler.workers.available_permits(), 2);
        let results = sampler.sample_all().await;
        assert_eq!(
            results[0],
            MetricResult::failed("stalled", "timed out after 0.2s")
        );
        assert!(matches!(results[1], MetricResult::Section { .. }));
    }

    #[tokio::test]
    async fn waiting_for_a_worker_does_not_count_toward_timeout() {
        // Each source runs well within the timeout, but the last one queues
        // behind the other two for longer than the timeout.
        let sampler = sampler(
            vec![
                FakeSource::new("first", 150, Behaviour::Rows),
                FakeSource::new("second", 150, Behaviour::Rows),
                FakeSource::new("third", 0, Behaviour::Rows),
            ],
            1,
            200,
        );

        let results = sampler.sample_all().await;
        assert_eq!(titles(&results), vec!["first", "second", "third"]);
        for result in &results {
            assert!(
                matches!(result, MetricResult::Section { .. }),
                "{:?}",
                result
            );
        }
    }

    #[tokio::test]
    async fn panicking_source_can_be_sampled_again() {
        let sampler = sampler(vec![FakeSource::new("panics", 0, Behaviour::Panic)], 1, 5_000);
        for _ in 0..2 {
            let results = sampler.sample_all().await;
            assert_eq!(
                results[0],
                MetricResult::failed("panics", "source panicked")
            );
        }
        assert_eq!(sampler.workers.available_permits(), 1);
    }

    #[tokio::test]
    async fn pace_sets_minimum_tick_length() {
        let sources: Vec<Arc<dyn MetricSource>> =
            vec![Arc::new(FakeSource::new("instant", 0, Behaviour::Fail))];
        let sampler = Sampler::with_limits(
            sources,
            4,
            Duration::from_secs(1),
            Duration::from_millis(120),
        );

        let started = Instant::now();
        let results = sampler.sample_all().await;
        assert_eq!(results.len(), 1);
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn pool_is_reused_across_ticks() {
        let sampler = sampler(vec![FakeSource::new("a", 5, Behaviour::Rows)], 1, 5_000);
        for _ in 0..3 {
            let results = sampler.sample_all().await;
            assert_eq!(results.len(), 1);
            assert!(!results[0].is_failure());
        }
        assert_eq!(sampler.workers.available_permits(), 1);
    }
}

use std::time::Duration;

use crate::{config::ProducerConfig, error::ProducerError};



const NANOS_PER_SEC: f64 = 1e9;



/// Interval between two polls of a single worker, so that `workers`
/// workers together emit about `message_rate` messages per second.
///
/// Intervals that round below one nanosecond are clamped to 1ns,
/// a zero period is not a valid ticker.
pub fn compute_tick_interval(message_rate: u64, workers: usize) -> Result<Duration, ProducerError> {

    if message_rate == 0 {
        return Err(ProducerError::config("message_rate must be greater than zero"))
    }

    if workers == 0 {
        return Err(ProducerError::config("workers must be at least 1"))
    }

    let per_worker_rate = message_rate as f64 / workers as f64;
    let nanos = (NANOS_PER_SEC / per_worker_rate) as u64;

    Ok(Duration::from_nanos(nanos.max(1)))
}


/// `ceil(workers / workers_per_connection)`, never less than one
pub fn compute_connection_count(workers: usize, workers_per_connection: usize) -> Result<usize, ProducerError> {

    if workers == 0 {
        return Err(ProducerError::config("workers must be at least 1"))
    }

    if workers_per_connection == 0 {
        return Err(ProducerError::config("workers_per_connection must be at least 1"))
    }

    let count = (workers - 1) / workers_per_connection + 1;

    Ok(count.max(1))
}



/// Pacing derived once at startup, never mutated afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPlan {
    pub tick_interval: Duration,
    pub connection_count: usize,
    pub workers_per_connection: usize,
}

impl PacingPlan {

    pub fn derive(config: &ProducerConfig) -> Result<Self, ProducerError> {
        config.validate()?;

        Ok(PacingPlan {
            tick_interval: compute_tick_interval(config.message_rate, config.workers)?,
            connection_count: compute_connection_count(config.workers, config.workers_per_connection)?,
            workers_per_connection: config.workers_per_connection
        })
    }

    /// connection index serving `worker`, contiguous blocks of workers share one
    #[inline]
    pub fn connection_for(&self, worker: usize) -> usize {
        worker / self.workers_per_connection
    }
}



#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workers_collectively_hit_target_rate() {
        let pairs = [(1, 1), (1000, 1), (1000, 4), (7, 3), (250_000, 16), (3, 10)];

        for (rate, workers) in pairs {
            let tick = compute_tick_interval(rate, workers).unwrap();
            let achieved = workers as f64 / tick.as_secs_f64();
            let tolerance = rate as f64 * 1e-6;
            assert!(
                (achieved - rate as f64).abs() <= tolerance.max(1e-3),
                "rate={} workers={} tick={:?} achieved={}", rate, workers, tick, achieved
            );
        }
    }

    #[test]
    fn tick_interval_examples() {
        assert_eq!(compute_tick_interval(1000, 1).unwrap(), Duration::from_millis(1));
        assert_eq!(compute_tick_interval(1000, 10).unwrap(), Duration::from_millis(10));
        assert_eq!(compute_tick_interval(2, 1).unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn tick_interval_never_zero() {
        let tick = compute_tick_interval(u64::MAX, 1).unwrap();
        assert_eq!(tick, Duration::from_nanos(1));
    }

    #[test]
    fn tick_interval_rejects_zero_inputs() {
        assert!(matches!(compute_tick_interval(0, 4), Err(ProducerError::Configuration(_))));
        assert!(matches!(compute_tick_interval(100, 0), Err(ProducerError::Configuration(_))));
    }

    #[test]
    fn connection_count_is_ceiling() {
        assert_eq!(compute_connection_count(12, 5).unwrap(), 3);
        assert_eq!(compute_connection_count(5, 5).unwrap(), 1);
        assert_eq!(compute_connection_count(1, 5).unwrap(), 1);
        assert_eq!(compute_connection_count(10, 5).unwrap(), 2);
        assert_eq!(compute_connection_count(11, 1).unwrap(), 11);
        assert_eq!(compute_connection_count(usize::MAX, 2).unwrap(), usize::MAX / 2 + 1);
        assert_eq!(compute_connection_count(usize::MAX, 1).unwrap(), usize::MAX);

        for workers in 1..50 {
            for ratio in 1..12 {
                let count = compute_connection_count(workers, ratio).unwrap();
                assert!(count >= 1);
                assert!(count * ratio >= workers);
                assert!((count - 1) * ratio < workers);
            }
        }
    }

    #[test]
    fn plan_accepts_huge_worker_count() {
        let cfg = ProducerConfig::new("t")
            .with_workers(usize::MAX)
            .with_workers_per_connection(2);

        assert!(cfg.validate().is_ok());

        let plan = PacingPlan::derive(&cfg).unwrap();
        assert_eq!(plan.connection_count, usize::MAX / 2 + 1);
    }

    #[test]
    fn connection_count_rejects_zero_ratio() {
        assert!(compute_connection_count(3, 0).is_err());
        assert!(compute_connection_count(0, 3).is_err());
    }

    #[test]
    fn plan_maps_workers_in_contiguous_blocks() {
        let cfg = ProducerConfig::new("t")
            .with_workers(12)
            .with_workers_per_connection(5)
            .with_message_rate(1200);

        let plan = PacingPlan::derive(&cfg).unwrap();

        assert_eq!(plan.connection_count, 3);
        assert_eq!(plan.tick_interval, Duration::from_millis(10));

        let mapped: Vec<usize> = (0..12).map(|w| plan.connection_for(w)).collect();
        assert_eq!(mapped, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 2, 2]);
    }
}

//! Job queue and client registry.
//!
//! [`BookState`] is owned by a single mutex in the HTTP layer, so every method
//! runs to completion without interleaving with other requests. Methods take
//! the current time as an argument to keep pruning and rescans testable.

use std::collections::{HashMap, HashSet, VecDeque};

use book_core::api::{ClientStats, Job, StatsResponse};
use book_core::evaluation::Evaluation;
use book_core::level::{MAX_SAVABLE_DISCS, MIN_DISCS, learn_level};
use book_core::position::Position;
use book_core::symmetry::canonical;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::store::{EvaluationStore, SaveOutcome};

/// Timing of the periodic sweeps.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Clients silent for longer than this are removed.
    pub inactivity_timeout: TimeDelta,
    /// Minimum time between two pruning sweeps.
    pub prune_interval: TimeDelta,
    /// Minimum time between two scans for work behind the cursor.
    pub rescan_interval: TimeDelta,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            inactivity_timeout: TimeDelta::minutes(5),
            prune_interval: TimeDelta::seconds(30),
            rescan_interval: TimeDelta::seconds(60),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Client {
    pub id: Uuid,
    pub hostname: String,
    pub build_id: String,
    pub last_heartbeat: DateTime<Utc>,
    pub job: Option<Job>,
    pub positions_computed: u64,
}

#[derive(Debug)]
pub struct BookState {
    config: SchedulerConfig,
    clients: HashMap<Uuid, Client>,
    queue: VecDeque<Job>,
    /// Disc count the queue was loaded from; `None` before the first load.
    disc_count: Option<u32>,
    last_prune: Option<DateTime<Utc>>,
    last_rescan: Option<DateTime<Utc>>,
}

impl BookState {
    pub fn new(config: SchedulerConfig) -> Self {
        BookState {
            config,
            clients: HashMap::new(),
            queue: VecDeque::new(),
            disc_count: None,
            last_prune: None,
            last_rescan: None,
        }
    }

    pub fn register(&mut self, hostname: String, build_id: String, now: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        info!(client = %id, %hostname, %build_id, "client registered");
        self.clients.insert(
            id,
            Client {
                id,
                hostname,
                build_id,
                last_heartbeat: now,
                job: None,
                positions_computed: 0,
            },
        );
        id
    }

    pub fn heartbeat(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.client_mut(id)?.last_heartbeat = now;
        Ok(())
    }

    /// Hands out the next job, or `None` once every disc count up to the
    /// savable limit is exhausted.
    pub async fn next_job(
        &mut self,
        id: Uuid,
        store: &EvaluationStore,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>> {
        self.client_mut(id)?.last_heartbeat = now;
        self.prune_if_due(now);
        self.rescan_if_due(store, now).await?;

        let job = loop {
            if let Some(job) = self.queue.pop_front() {
                break Some(job);
            }
            if !self.refill(store).await? {
                break None;
            }
        };

        let client = self.client_mut(id)?;
        let previous = std::mem::replace(&mut client.job, job);
        if let Some(previous) = previous.filter(|previous| Some(*previous) != job) {
            debug!(client = %id, position = %previous.position, "unfinished job returned to queue");
            self.requeue(previous);
        }
        if let Some(job) = job {
            debug!(client = %id, position = %job.position, level = job.level, "job assigned");
        }
        Ok(job)
    }

    /// Records a finished job and persists its evaluation.
    pub async fn submit_result(
        &mut self,
        id: Uuid,
        evaluation: &Evaluation,
        computation_time_seconds: f64,
        store: &EvaluationStore,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome> {
        let client = self.client_mut(id)?;
        client.last_heartbeat = now;
        client.positions_computed += 1;
        let key = canonical(evaluation.position());
        if client.job.is_some_and(|job| job.position == key) {
            client.job = None;
        }

        let outcome = store.save(evaluation).await?;
        info!(
            client = %id,
            position = %evaluation.position(),
            level = evaluation.level(),
            depth = evaluation.depth(),
            seconds = computation_time_seconds,
            ?outcome,
            "result received"
        );
        Ok(outcome)
    }

    /// Removes silent clients when the sweep is due, returning their jobs to
    /// the front of the queue.
    ///
    /// # Returns
    ///
    /// The identities of removed clients.
    pub fn prune_if_due(&mut self, now: DateTime<Utc>) -> Vec<Uuid> {
        if self
            .last_prune
            .is_some_and(|last| now - last < self.config.prune_interval)
        {
            return Vec::new();
        }
        self.last_prune = Some(now);

        let timeout = self.config.inactivity_timeout;
        let expired: Vec<Uuid> = self
            .clients
            .values()
            .filter(|client| now - client.last_heartbeat > timeout)
            .map(|client| client.id)
            .collect();

        for id in &expired {
            let Some(client) = self.clients.remove(id) else {
                continue;
            };
            if let Some(job) = client.job {
                self.requeue(job);
                warn!(client = %id, position = %job.position, "pruned client, job returned to queue");
            } else {
                warn!(client = %id, "pruned client");
            }
        }
        expired
    }

    /// Advances the cursor until a disc count with work is found.
    ///
    /// # Returns
    ///
    /// `false` once the cursor is past the savable limit.
    async fn refill(&mut self, store: &EvaluationStore) -> Result<bool> {
        loop {
            let disc_count = self.disc_count.map_or(MIN_DISCS, |dc| (dc + 1).max(MIN_DISCS));
            if disc_count > MAX_SAVABLE_DISCS {
                self.disc_count = Some(MAX_SAVABLE_DISCS + 1);
                return Ok(false);
            }
            self.disc_count = Some(disc_count);

            let jobs = self.load_jobs(store, disc_count).await?;
            if !jobs.is_empty() {
                info!(disc_count, jobs = jobs.len(), "job queue refilled");
                self.queue = jobs;
                return Ok(true);
            }
        }
    }

    /// Moves the cursor back when work has appeared at a lower disc count.
    async fn rescan_if_due(&mut self, store: &EvaluationStore, now: DateTime<Utc>) -> Result<()> {
        if self
            .last_rescan
            .is_some_and(|last| now - last < self.config.rescan_interval)
        {
            return Ok(());
        }
        self.last_rescan = Some(now);

        let Some(cursor) = self.disc_count else {
            return Ok(());
        };

        for disc_count in MIN_DISCS..cursor.min(MAX_SAVABLE_DISCS + 1) {
            let jobs = self.load_jobs(store, disc_count).await?;
            if !jobs.is_empty() {
                info!(
                    from = cursor,
                    to = disc_count,
                    jobs = jobs.len(),
                    "new work behind the cursor, rewinding"
                );
                self.disc_count = Some(disc_count);
                self.queue = jobs;
                break;
            }
        }
        Ok(())
    }

    /// Under-leveled positions at `disc_count` not currently assigned to a client.
    async fn load_jobs(&self, store: &EvaluationStore, disc_count: u32) -> Result<VecDeque<Job>> {
        let level = learn_level(disc_count);
        let taken: HashSet<Position> = self
            .clients
            .values()
            .filter_map(|client| client.job.map(|job| job.position))
            .collect();

        Ok(store
            .positions_below_level(disc_count, level)
            .await?
            .into_iter()
            .filter(|position| !taken.contains(position))
            .map(|position| Job { position, level })
            .collect())
    }

    /// Puts an abandoned job at the front of the queue unless it is already queued.
    fn requeue(&mut self, job: Job) {
        if !self.queue.contains(&job) {
            self.queue.push_front(job);
        }
    }

    fn client_mut(&mut self, id: Uuid) -> Result<&mut Client> {
        self.clients
            .get_mut(&id)
            .ok_or_else(|| ApiError::UnknownClient(id.to_string()))
    }

    pub fn client(&self, id: Uuid) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn queue(&self) -> &VecDeque<Job> {
        &self.queue
    }

    pub fn disc_count(&self) -> Option<u32> {
        self.disc_count
    }

    pub fn stats(&self) -> StatsResponse {
        let mut client_stats: Vec<ClientStats> = self
            .clients
            .values()
            .map(|client| ClientStats {
                id: client.id.to_string(),
                hostname: client.hostname.clone(),
                build_id: client.build_id.clone(),
                positions_computed: client.positions_computed,
                last_active: client.last_heartbeat,
                job: client.job,
            })
            .collect();
        client_stats.sort_by(|a, b| {
            b.positions_computed
                .cmp(&a.positions_computed)
                .then_with(|| a.id.cmp(&b.id))
        });

        StatsResponse {
            active_clients: self.clients.len(),
            disc_count: self.disc_count,
            queue_length: self.queue.len(),
            client_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    fn state() -> BookState {
        BookState::new(SchedulerConfig {
            inactivity_timeout: TimeDelta::seconds(300),
            prune_interval: TimeDelta::seconds(30),
            rescan_interval: TimeDelta::seconds(60),
        })
    }

    #[test]
    fn test_register_and_heartbeat() {
        let mut state = state();
        let id = state.register("host".into(), "abc123".into(), t(0));
        assert!(state.heartbeat(id, t(10)).is_ok());
        assert_eq!(state.client(id).unwrap().last_heartbeat, t(10));
        assert!(matches!(
            state.heartbeat(Uuid::new_v4(), t(10)),
            Err(ApiError::UnknownClient(_))
        ));
    }

    #[test]
    fn test_prune_returns_job_once() {
        let mut state = state();
        let silent = state.register("a".into(), "x".into(), t(0));
        let job = Job {
            position: Position::start(),
            level: 36,
        };
        state.clients.get_mut(&silent).unwrap().job = Some(job);

        assert!(state.prune_if_due(t(100)).is_empty());
        assert_eq!(state.prune_if_due(t(1000)), vec![silent]);
        assert!(state.client(silent).is_none());
        assert_eq!(state.queue().iter().filter(|j| **j == job).count(), 1);
    }

    #[test]
    fn test_prune_is_time_gated() {
        let mut state = state();
        let id = state.register("a".into(), "x".into(), t(0));
        assert!(state.prune_if_due(t(10)).is_empty());
        // The previous sweep ran 10 seconds ago.
        assert!(state.prune_if_due(t(20)).is_empty());
        assert!(state.client(id).is_some());
        assert_eq!(state.prune_if_due(t(400)), vec![id]);
    }

    #[test]
    fn test_stats() {
        let mut state = state();
        let a = state.register("alpha".into(), "1".into(), t(0));
        state.register("beta".into(), "2".into(), t(0));
        state.clients.get_mut(&a).unwrap().positions_computed = 5;
        let stats = state.stats();
        assert_eq!(stats.active_clients, 2);
        assert_eq!(stats.client_stats[0].hostname, "alpha");
        assert_eq!(stats.client_stats[0].positions_computed, 5);
        assert_eq!(stats.queue_length, 0);
        assert_eq!(stats.disc_count, None);
    }
}

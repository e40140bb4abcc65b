//! Worker loop: fetch a job, search it, report the result.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use book_core::api::{Job, JobResult, RegisterRequest};
use crossbeam_channel::{Sender, bounded};
use parking_lot::Mutex;
use rand::Rng;
use tracing::{error, info, warn};

use crate::api_client::BookApi;
use crate::engine::Engine;
use crate::error::{ClientError, Result};

/// Timing of the worker loop.
#[derive(Clone, Debug)]
pub struct LearnConfig {
    pub hostname: String,
    pub build_id: String,
    pub heartbeat_interval: Duration,
    /// Sleep when the server has no job.
    pub idle: Duration,
    /// Bounds of the randomized sleep after a failure.
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl LearnConfig {
    pub fn new(hostname: String, build_id: String) -> Self {
        LearnConfig {
            hostname,
            build_id,
            heartbeat_interval: Duration::from_secs(60),
            idle: Duration::from_secs(10),
            min_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// Outcome of one iteration of the worker loop.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// The server had no job.
    Idle,
    Computed { job: Job, seconds: f64 },
}

/// Identity shared between the job loop and the heartbeat thread.
pub type Identity = Arc<Mutex<Option<String>>>;

pub struct LearnClient<A: BookApi + 'static, E: Engine> {
    api: Arc<A>,
    engine: E,
    config: LearnConfig,
    identity: Identity,
    jobs_done: u64,
    total_seconds: f64,
}

impl<A: BookApi + 'static, E: Engine> LearnClient<A, E> {
    pub fn new(api: Arc<A>, engine: E, config: LearnConfig) -> Self {
        LearnClient {
            api,
            engine,
            config,
            identity: Arc::new(Mutex::new(None)),
            jobs_done: 0,
            total_seconds: 0.0,
        }
    }

    /// Current identity, if registered.
    pub fn client_id(&self) -> Option<String> {
        self.identity.lock().clone()
    }

    fn ensure_registered(&self) -> Result<String> {
        if let Some(id) = self.client_id() {
            return Ok(id);
        }
        let request = RegisterRequest {
            hostname: self.config.hostname.clone(),
            build_id: self.config.build_id.clone(),
        };
        let id = self.api.register(&request)?;
        info!(client_id = %id, "registered");
        *self.identity.lock() = Some(id.clone());
        Ok(id)
    }

    /// Fetches and completes at most one job.
    pub fn run_once(&mut self) -> Result<Step> {
        let client_id = self.ensure_registered()?;
        let Some(job) = self.api.get_job(&client_id)? else {
            return Ok(Step::Idle);
        };

        info!(
            position = %job.position,
            discs = job.position.count_discs(),
            level = job.level,
            "job received"
        );
        info!("\n{}", job.position.to_board_string());

        let started = Instant::now();
        let evaluation = self.engine.evaluate(&job.position, job.level)?;
        let seconds = started.elapsed().as_secs_f64();

        self.api.submit_result(
            &client_id,
            &JobResult {
                evaluation,
                computation_time_seconds: seconds,
            },
        )?;

        self.jobs_done += 1;
        self.total_seconds += seconds;
        info!(
            seconds,
            jobs = self.jobs_done,
            average = self.total_seconds / self.jobs_done as f64,
            "job finished"
        );
        Ok(Step::Computed { job, seconds })
    }

    /// Reacts to a failed iteration.
    ///
    /// # Returns
    ///
    /// How long to sleep before the next iteration.
    pub fn recover(&self, err: &ClientError) -> Duration {
        match err {
            ClientError::Unauthorized => {
                warn!("server forgot this client, registering again");
                *self.identity.lock() = None;
                Duration::ZERO
            }
            other => {
                let backoff = rand::rng().random_range(self.config.min_backoff..=self.config.max_backoff);
                error!(error = %other, ?backoff, "iteration failed, backing off");
                backoff
            }
        }
    }

    /// Runs until the process is killed.
    pub fn run(&mut self) {
        let _heartbeat = Heartbeat::start(
            Arc::clone(&self.api),
            Arc::clone(&self.identity),
            self.config.heartbeat_interval,
        );
        loop {
            match self.run_once() {
                Ok(Step::Computed { .. }) => {}
                Ok(Step::Idle) => {
                    info!(idle = ?self.config.idle, "no job available");
                    thread::sleep(self.config.idle);
                }
                Err(err) => thread::sleep(self.recover(&err)),
            }
        }
    }
}

/// Sends heartbeats on a fixed interval until dropped.
///
/// Failures are logged and otherwise ignored; re-registration is left to the
/// job loop.
pub struct Heartbeat {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn start<A: BookApi + 'static>(api: Arc<A>, identity: Identity, interval: Duration) -> Self {
        let (stop, stopped) = bounded::<()>(1);
        let handle = thread::spawn(move || {
            // Any message or a dropped sender ends the loop.
            while stopped.recv_timeout(interval).is_err_and(|err| err.is_timeout()) {
                beat(api.as_ref(), &identity);
            }
        });
        Heartbeat {
            stop: Some(stop),
            handle: Some(handle),
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn beat<A: BookApi + ?Sized>(api: &A, identity: &Identity) {
    let Some(client_id) = identity.lock().clone() else {
        return;
    };
    if let Err(err) = api.heartbeat(&client_id) {
        warn!(error = %err, "heartbeat failed");
    }
}

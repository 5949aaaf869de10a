//! Orchestration layer
//!
//! Turns the configured keywords into jobs and runs them on a fixed-size
//! worker pool:
//! 1. Every main keyword is paired with every supplemented keyword
//! 2. Jobs are queued on a channel shared by `worker_count` workers
//! 3. Each job runs in its own task, so an error or panic only fails that job
//! 4. `run` returns once every job has produced an outcome

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::google::KeywordPair;
use crate::pipeline::{DownloadReport, KeywordJobRunner};

/// Lifecycle of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running,
    Done,
}

/// A queued unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub pair: KeywordPair,
}

#[derive(Debug, Clone)]
pub enum JobStatus {
    Completed(DownloadReport),
    Failed(String),
}

/// Result record produced for every dispatched job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: Uuid,
    pub pair: KeywordPair,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, JobStatus::Completed(_))
    }

    pub fn report(&self) -> Option<&DownloadReport> {
        match &self.status {
            JobStatus::Completed(report) => Some(report),
            JobStatus::Failed(_) => None,
        }
    }
}

/// All outcomes of one dispatcher run.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<JobOutcome>,
}

impl DispatchReport {
    pub fn completed_jobs(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    pub fn failed_jobs(&self) -> usize {
        self.outcomes.len() - self.completed_jobs()
    }

    pub fn images_downloaded(&self) -> usize {
        self.outcomes.iter().filter_map(|o| o.report()).map(|r| r.succeeded).sum()
    }

    pub fn image_errors(&self) -> usize {
        self.outcomes.iter().filter_map(|o| o.report()).map(|r| r.failed).sum()
    }
}

/// Runs keyword jobs on a bounded pool of workers.
pub struct Dispatcher {
    runner: Arc<KeywordJobRunner>,
    worker_count: usize,
    state: DispatcherState,
}

impl Dispatcher {
    pub fn new(runner: Arc<KeywordJobRunner>, worker_count: usize) -> Self {
        Self {
            runner,
            worker_count: worker_count.max(1),
            state: DispatcherState::Idle,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Builds the jobs for the keyword cross product and runs them to completion.
    pub async fn run_keywords(&mut self, main: &[String], supplemented: &[String]) -> DispatchReport {
        self.run(KeywordPair::cross(main, supplemented)).await
    }

    /// Runs one job per pair and waits until every job has an outcome.
    pub async fn run(&mut self, pairs: Vec<KeywordPair>) -> DispatchReport {
        self.state = DispatcherState::Running;

        let job_count = pairs.len();
        let (job_tx, job_rx) = flume::unbounded::<Job>();
        for pair in pairs {
            // The receiver is alive, so this cannot fail.
            let _ = job_tx.send(Job {
                id: Uuid::new_v4(),
                pair,
            });
        }
        drop(job_tx);

        let workers = self.worker_count.min(job_count).max(1);
        info!("Dispatching {} job(s) to {} worker(s)", job_count, workers);

        let mut join_set = JoinSet::new();
        for worker_id in 0..workers {
            let job_rx = job_rx.clone();
            let runner = self.runner.clone();
            join_set.spawn(async move {
                let mut outcomes = Vec::new();
                while let Ok(job) = job_rx.recv_async().await {
                    outcomes.push(Self::run_job(runner.clone(), job).await);
                }
                outcomes
            }
            .instrument(tracing::debug_span!("worker", worker_id)));
        }
        drop(job_rx);

        let mut report = DispatchReport::default();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(outcomes) => report.outcomes.extend(outcomes),
                Err(e) => error!("Worker join error: {}", e),
            }
        }

        if report.outcomes.len() != job_count {
            warn!(
                "{} job(s) dispatched but {} outcome(s) collected",
                job_count,
                report.outcomes.len()
            );
        }

        self.state = DispatcherState::Done;
        info!(
            "All finished: {} job(s) completed, {} failed",
            report.completed_jobs(),
            report.failed_jobs()
        );
        report
    }

    /// Runs a job in its own task so a panic stays inside that job.
    async fn run_job(runner: Arc<KeywordJobRunner>, job: Job) -> JobOutcome {
        let started_at = Utc::now();
        let span = tracing::info_span!(
            "job",
            job_id = %job.id,
            main = %job.pair.main,
            supplemented = %job.pair.supplemented,
        );

        let pair = job.pair.clone();
        let handle = tokio::spawn(async move { runner.run(&pair).await }.instrument(span));

        let status = match handle.await {
            Ok(Ok(report)) => JobStatus::Completed(report),
            Ok(Err(e)) => {
                error!(job_id = %job.id, "Job {} failed: {}", job.pair, e);
                JobStatus::Failed(e.to_string())
            }
            Err(e) => {
                error!(job_id = %job.id, "Job {} aborted: {}", job.pair, e);
                JobStatus::Failed(format!("job task aborted: {}", e))
            }
        };

        JobOutcome {
            job_id: job.id,
            pair: job.pair,
            status,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

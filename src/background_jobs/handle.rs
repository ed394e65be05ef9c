use super::job::JobError;
use tokio::sync::{mpsc, oneshot};

/// Requests sent from a [`SchedulerHandle`] to the scheduler loop.
#[derive(Debug)]
pub enum SchedulerCommand {
    TriggerJob {
        job_id: String,
        reply: oneshot::Sender<Result<(), JobError>>,
    },
    IsRunning {
        job_id: String,
        reply: oneshot::Sender<Result<bool, JobError>>,
    },
}

/// Cloneable handle used by the HTTP layer to talk to the scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    command_sender: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub fn new(command_sender: mpsc::Sender<SchedulerCommand>) -> Self {
        Self { command_sender }
    }

    /// Starts `job_id` now, unless it is already running.
    pub async fn trigger(&self, job_id: &str) -> Result<(), JobError> {
        let (reply, response) = oneshot::channel();
        self.command_sender
            .send(SchedulerCommand::TriggerJob {
                job_id: job_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| JobError::SchedulerUnavailable)?;
        response
            .await
            .map_err(|_| JobError::SchedulerUnavailable)?
    }

    pub async fn is_running(&self, job_id: &str) -> Result<bool, JobError> {
        let (reply, response) = oneshot::channel();
        self.command_sender
            .send(SchedulerCommand::IsRunning {
                job_id: job_id.to_string(),
                reply,
            })
            .await
            .map_err(|_| JobError::SchedulerUnavailable)?;
        response
            .await
            .map_err(|_| JobError::SchedulerUnavailable)?
    }
}

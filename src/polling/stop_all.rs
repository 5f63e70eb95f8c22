//! Stop-All Waiter
//!
//! After a fleet-wide stop command, polls the operator's character list
//! until no worker reports a running state or the deadline passes. A
//! timeout is reported the same way as any other failure.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::time::{sleep, timeout};
use tracing::info;

use crate::types::OperatorApi;

/// Deadline for the whole fleet to stop.
pub const STOP_ALL_TIMEOUT: Duration = Duration::from_secs(60);
/// Delay between character-list polls.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Issue the fleet-wide stop and wait for every worker to stop.
pub async fn stop_all_and_wait(operator: &Arc<dyn OperatorApi>, slot: u32) -> Result<()> {
    operator.stop_all(slot).await?;
    wait_for_all_stopped(operator, slot, STOP_ALL_TIMEOUT).await
}

/// Poll until the operator reports zero running characters, or fail
/// after `deadline`.
pub async fn wait_for_all_stopped(
    operator: &Arc<dyn OperatorApi>,
    slot: u32,
    deadline: Duration,
) -> Result<()> {
    let wait = async {
        loop {
            let characters = operator.list_characters(slot).await?;
            let running = characters.iter().filter(|c| c.state.is_running()).count();
            if running == 0 {
                info!(slot, "all characters stopped");
                return Ok(());
            }
            sleep(POLL_INTERVAL).await;
        }
    };

    timeout(deadline, wait)
        .await
        .map_err(|_| anyhow!("Timed out waiting for all characters on slot {} to stop", slot))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::types::{
        ActivationStatus, OtpSubmission, ProfileWorkerView, Scenario, ScenarioResult, WorkerState,
    };

    /// Operator stub whose characters stop after a fixed number of
    /// list polls. `stop_after = u32::MAX` never stops.
    struct CountdownOperator {
        polls: AtomicU32,
        stop_after: u32,
    }

    impl CountdownOperator {
        fn new(stop_after: u32) -> Arc<dyn OperatorApi> {
            Arc::new(Self {
                polls: AtomicU32::new(0),
                stop_after,
            })
        }
    }

    fn worker(state: WorkerState) -> ProfileWorkerView {
        ProfileWorkerView {
            id: "w".to_string(),
            state,
            current_scenario: None,
            current_scenario_result: None,
            pending_actions: 0,
            browser_port: None,
        }
    }

    #[async_trait]
    impl OperatorApi for CountdownOperator {
        async fn list_characters(&self, _slot: u32) -> Result<Vec<ProfileWorkerView>> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n >= self.stop_after {
                Ok(vec![worker(WorkerState::Stopped)])
            } else {
                Ok(vec![worker(WorkerState::Working), worker(WorkerState::Stopped)])
            }
        }
        async fn start_character(&self, _slot: u32, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn stop_character(&self, _slot: u32, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn start_all(&self, _slot: u32) -> Result<()> {
            Ok(())
        }
        async fn stop_all(&self, _slot: u32) -> Result<()> {
            Ok(())
        }
        async fn get_scenarios(&self, _slot: u32) -> Result<Vec<ScenarioResult>> {
            Ok(Vec::new())
        }
        async fn get_scenario(&self, _slot: u32, _id: &str) -> Result<ScenarioResult> {
            anyhow::bail!("not used")
        }
        async fn submit_scenario(&self, _slot: u32, _scenario: &Scenario) -> Result<String> {
            anyhow::bail!("not used")
        }
        async fn stop_scenario(&self, _slot: u32, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn activate_profile(&self, _slot: u32, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn activation_status(&self, _slot: u32, _id: &str) -> Result<ActivationStatus> {
            Ok(ActivationStatus::Idle)
        }
        async fn submit_otp(&self, _slot: u32, _id: &str, _otp: &OtpSubmission) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_everything_stopped() {
        let operator = CountdownOperator::new(3);
        stop_all_and_wait(&operator, 0).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_instead_of_hanging() {
        let operator = CountdownOperator::new(u32::MAX);
        let err = wait_for_all_stopped(&operator, 1, STOP_ALL_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }
}

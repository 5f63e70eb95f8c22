//! Activation Session
//!
//! Drives one avatar profile's login activation on the operator
//! service: start, poll status on a fixed cadence, pause for OTP
//! collection, resume after submission, stop on a terminal status.
//! One linear state machine per avatar, no cross-avatar coordination.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::types::{ActivationStatus, OperatorApi, OtpSubmission};

use super::{Poller, Tick};

/// Delay before the first status poll after starting activation.
const INITIAL_DELAY: Duration = Duration::from_secs(1);
/// Delay between status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Delay before polling resumes after an OTP submission.
const RESUME_DELAY: Duration = Duration::from_secs(1);

/// Callback invoked once when activation reaches `SUCCESS`.
pub type RefreshFn = Arc<dyn Fn() + Send + Sync>;

/// Observable snapshot of a session, as returned to clients.
#[derive(Clone, Debug, Serialize)]
pub struct ActivationView {
    pub status: ActivationStatus,
    pub is_waiting_for_otp: bool,
    pub has_submitted_otp: bool,
    pub polling: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct SessionState {
    status: ActivationStatus,
    is_waiting_for_otp: bool,
    has_submitted_otp: bool,
    error: Option<String>,
}

struct Inner {
    operator: Arc<dyn OperatorApi>,
    slot: u32,
    profile_id: String,
    state: Mutex<SessionState>,
    poller: Poller,
    refresh: Option<RefreshFn>,
}

/// One avatar's activation flow against an operator slot. Cheap to
/// clone; clones share the same session.
#[derive(Clone)]
pub struct ActivationSession {
    inner: Arc<Inner>,
}

impl ActivationSession {
    pub fn new(
        operator: Arc<dyn OperatorApi>,
        slot: u32,
        profile_id: String,
        refresh: Option<RefreshFn>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                operator,
                slot,
                profile_id,
                state: Mutex::new(SessionState {
                    status: ActivationStatus::Idle,
                    is_waiting_for_otp: false,
                    has_submitted_otp: false,
                    error: None,
                }),
                poller: Poller::new(),
                refresh,
            }),
        }
    }

    /// Issue the activation command and begin polling.
    pub async fn start(&self) -> Result<()> {
        self.inner
            .operator
            .activate_profile(self.inner.slot, &self.inner.profile_id)
            .await?;

        {
            let mut state = self.inner.state.lock().unwrap();
            state.status = ActivationStatus::Started;
            state.error = None;
        }
        self.spawn_polling(INITIAL_DELAY);
        Ok(())
    }

    fn spawn_polling(&self, initial_delay: Duration) {
        let inner = Arc::clone(&self.inner);
        self.inner
            .poller
            .start(initial_delay, POLL_INTERVAL, move || {
                let inner = Arc::clone(&inner);
                async move { inner.poll_once().await }
            });
    }

    /// Forward the operator-supplied OTP/password and resume polling.
    /// After submission a repeated `WAITING_FOR_OTP` read no longer
    /// pauses the session.
    pub async fn submit_otp(&self, otp: &OtpSubmission) -> Result<()> {
        self.inner
            .operator
            .submit_otp(self.inner.slot, &self.inner.profile_id, otp)
            .await?;

        {
            let mut state = self.inner.state.lock().unwrap();
            state.has_submitted_otp = true;
            state.is_waiting_for_otp = false;
        }
        self.spawn_polling(RESUME_DELAY);
        Ok(())
    }

    /// Stop polling without waiting for a terminal status.
    pub fn cancel(&self) {
        self.inner.poller.cancel();
    }

    pub fn view(&self) -> ActivationView {
        let state = self.inner.state.lock().unwrap();
        ActivationView {
            status: state.status,
            is_waiting_for_otp: state.is_waiting_for_otp,
            has_submitted_otp: state.has_submitted_otp,
            polling: self.inner.poller.is_running(),
            error: state.error.clone(),
        }
    }
}

impl Inner {
    /// One status read. Decides whether polling continues, pauses for
    /// OTP, or stops on a terminal status or error.
    async fn poll_once(&self) -> Tick {
        let status = match self
            .operator
            .activation_status(self.slot, &self.profile_id)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                // Any poll failure halts polling; no automatic retry.
                let mut state = self.state.lock().unwrap();
                state.error = Some(format!("{:#}", e));
                return Tick::Stop;
            }
        };

        debug!(profile = %self.profile_id, ?status, "activation poll");

        let mut state = self.state.lock().unwrap();
        state.status = status;

        if status.is_terminal() {
            drop(state);
            if status == ActivationStatus::Success {
                if let Some(refresh) = &self.refresh {
                    refresh();
                }
            }
            return Tick::Stop;
        }

        if status == ActivationStatus::WaitingForOtp && !state.has_submitted_otp {
            state.is_waiting_for_otp = true;
            return Tick::Stop;
        }

        Tick::Continue
    }
}

//! HTTP Surface
//!
//! The service's own REST API: thin handlers that parse the request,
//! call `ApiService`, and return JSON. Route layout mirrors the three
//! upstream areas plus local settings.

pub mod avatars;
pub mod error;
pub mod operator;
pub mod orchestrator;
pub mod settings;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::api::ApiService;
use crate::polling::ActivationSession;
use crate::settings::ServerSettings;

/// Live activation sessions, keyed by `slot/profile_id`. A session
/// stays registered after it finishes so its terminal state remains
/// readable; starting again replaces it.
#[derive(Default)]
pub struct ActivationRegistry {
    sessions: Mutex<HashMap<String, ActivationSession>>,
}

impl ActivationRegistry {
    fn key(slot: u32, profile_id: &str) -> String {
        format!("{}/{}", slot, profile_id)
    }

    pub fn get(&self, slot: u32, profile_id: &str) -> Option<ActivationSession> {
        self.sessions
            .lock()
            .unwrap()
            .get(&Self::key(slot, profile_id))
            .cloned()
    }

    /// Register a new session, cancelling any previous one for the
    /// same profile.
    pub fn replace(&self, slot: u32, profile_id: &str, session: ActivationSession) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(old) = sessions.insert(Self::key(slot, profile_id), session) {
            old.cancel();
        }
    }

    pub fn remove(&self, slot: u32, profile_id: &str) -> Option<ActivationSession> {
        self.sessions
            .lock()
            .unwrap()
            .remove(&Self::key(slot, profile_id))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ApiService>,
    pub settings: Arc<ServerSettings>,
    pub activations: Arc<ActivationRegistry>,
    pub allowed_countries: Arc<Vec<String>>,
    pub web1_path: Option<Arc<PathBuf>>,
}

impl AppState {
    pub fn new(
        api: ApiService,
        settings: ServerSettings,
        allowed_countries: Vec<String>,
        web1_path: Option<PathBuf>,
    ) -> Self {
        Self {
            api: Arc::new(api),
            settings: Arc::new(settings),
            activations: Arc::new(ActivationRegistry::default()),
            allowed_countries: Arc::new(allowed_countries),
            web1_path: web1_path.map(Arc::new),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Avatars
        .route("/api/avatars/avatars", get(avatars::list_combined))
        .route("/api/avatars/avatars/:id", patch(avatars::patch_avatar))
        .route(
            "/api/avatars/avatars/:id/proxy",
            post(avatars::assign_proxy).delete(avatars::unassign_proxy),
        )
        .route("/api/avatars/proxies", get(avatars::list_proxies))
        .route("/api/avatars/web1/assign", get(avatars::assign_web1))
        // Operator
        .route(
            "/api/operator/:slot/characters",
            get(operator::characters).post(operator::character_command),
        )
        .route(
            "/api/operator/:slot/characters/:id/activation",
            get(operator::activation_view)
                .post(operator::start_activation)
                .delete(operator::cancel_activation),
        )
        .route(
            "/api/operator/:slot/characters/:id/activation/otp",
            post(operator::submit_activation_otp),
        )
        .route(
            "/api/operator/:slot/scenario",
            get(operator::scenarios).post(operator::submit_scenario),
        )
        .route(
            "/api/operator/:slot/scenario/:id",
            get(operator::scenario).delete(operator::stop_scenario),
        )
        .route("/api/operator/start", post(operator::start_all))
        .route("/api/operator/stop", post(operator::stop_all))
        // Orchestrator
        .route(
            "/api/orchestrator/characters",
            get(orchestrator::characters)
                .post(orchestrator::add_characters)
                .delete(orchestrator::delete_character),
        )
        .route("/api/orchestrator/chats/:id", get(orchestrator::chat))
        .route(
            "/api/orchestrator/chats/:id/characters",
            get(orchestrator::chat_characters),
        )
        .route(
            "/api/orchestrator/chats-with-categories",
            get(orchestrator::chats_with_categories),
        )
        .route("/api/orchestrator/categories", get(orchestrator::categories))
        .route(
            "/api/orchestrator/mission",
            get(orchestrator::mission).delete(orchestrator::delete_mission),
        )
        .route(
            "/api/orchestrator/mission/description",
            post(orchestrator::set_mission_description),
        )
        .route(
            "/api/orchestrator/missions",
            get(orchestrator::missions).post(orchestrator::create_mission),
        )
        .route("/api/orchestrator/missions/plan", post(orchestrator::plan_mission))
        .route("/api/orchestrator/missions/run", post(orchestrator::run_mission))
        .route(
            "/api/orchestrator/missions/resolve_phone_results",
            post(orchestrator::upload_resolve_phone_results),
        )
        .route(
            "/api/orchestrator/missions/statistics",
            get(orchestrator::mission_statistics),
        )
        .route(
            "/api/orchestrator/missions/missions-with-statistics",
            get(orchestrator::missions_with_statistics),
        )
        .route(
            "/api/orchestrator/missions/missions-with-exposure-and-stats",
            get(orchestrator::missions_with_exposure_and_stats),
        )
        // Settings
        .route(
            "/api/settings/slot",
            get(settings::get_slot).put(settings::set_slot),
        )
        .with_state(state)
}

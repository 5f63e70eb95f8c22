//! ApiService Facade
//!
//! Single facade translating this service's domain calls into calls
//! against the three upstream clients. Construction is fail-fast: the
//! config must already be resolved, so no method here can discover a
//! missing endpoint at call time. No method retries; every failure is
//! one error to the caller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::task::JoinSet;

use crate::aggregate;
use crate::clients::{AvatarsHttpClient, OperatorHttpClient, OrchestratorHttpClient};
use crate::config::ServiceConfig;
use crate::types::{
    ActivationStatus, Avatar, AvatarsApi, Category, CategoryWithCount, Chat, ChatsWithCategories,
    CombinedAvatar, Mission, NewMission, OperatorApi, OrchestratorApi, OrchestratorCharacter,
    OtpSubmission, PatchAvatar, ProfileWorkerView, Proxy, ResolvePhoneUpload, Scenario,
    ScenarioResult,
};

pub struct ApiService {
    avatars: Arc<dyn AvatarsApi>,
    operator: Arc<dyn OperatorApi>,
    orchestrator: Arc<dyn OrchestratorApi>,
}

impl ApiService {
    /// Build the facade from a resolved config.
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            avatars: Arc::new(AvatarsHttpClient::new(
                config.avatars_endpoint.clone(),
                config.avatars_api_key.clone(),
            )),
            operator: Arc::new(OperatorHttpClient::new(config.operator_endpoint.clone())),
            orchestrator: Arc::new(OrchestratorHttpClient::new(
                config.orchestrator_endpoint.clone(),
                config.orchestrator_api_key.clone(),
            )),
        }
    }

    /// Build the facade from pre-constructed clients. Used by tests.
    pub fn with_clients(
        avatars: Arc<dyn AvatarsApi>,
        operator: Arc<dyn OperatorApi>,
        orchestrator: Arc<dyn OrchestratorApi>,
    ) -> Self {
        Self {
            avatars,
            operator,
            orchestrator,
        }
    }

    pub fn operator_client(&self) -> Arc<dyn OperatorApi> {
        Arc::clone(&self.operator)
    }

    // ── Avatars ──────────────────────────────────────────────────

    pub async fn list_avatars(&self) -> Result<Vec<Avatar>> {
        self.avatars.list_avatars().await
    }

    pub async fn get_avatar(&self, id: &str) -> Result<Avatar> {
        self.avatars.get_avatar(id).await
    }

    pub async fn patch_avatar(&self, id: &str, patch: &PatchAvatar) -> Result<Avatar> {
        self.avatars.patch_avatar(id, patch).await
    }

    pub async fn list_proxies(&self) -> Result<Vec<Proxy>> {
        self.avatars.list_proxies().await
    }

    pub async fn assign_proxy(&self, avatar_id: &str, proxy_id: &str) -> Result<()> {
        self.avatars.assign_proxy(avatar_id, proxy_id).await
    }

    pub async fn unassign_proxy(&self, avatar_id: &str) -> Result<()> {
        self.avatars.unassign_proxy(avatar_id).await
    }

    /// Phone numbers currently held by any avatar. Used to keep WEB1
    /// account assignment from reusing a number.
    pub async fn used_phone_numbers(&self) -> Result<HashSet<String>> {
        let avatars = self.avatars.list_avatars().await?;
        Ok(avatars
            .into_iter()
            .filter_map(|a| a.phone_number)
            .filter(|p| !p.is_empty())
            .collect())
    }

    /// Join the avatar inventory with live worker state for `slot`.
    pub async fn combined_avatars(&self, slot: u32) -> Result<Vec<CombinedAvatar>> {
        let avatars = self.avatars.list_avatars().await?;
        let workers = self.operator.list_characters(slot).await?;
        Ok(aggregate::combine_avatars(avatars, workers))
    }

    // ── Operator ─────────────────────────────────────────────────

    pub async fn operator_characters(&self, slot: u32) -> Result<Vec<ProfileWorkerView>> {
        self.operator.list_characters(slot).await
    }

    pub async fn start_character(&self, slot: u32, id: &str) -> Result<()> {
        self.operator.start_character(slot, id).await
    }

    pub async fn stop_character(&self, slot: u32, id: &str) -> Result<()> {
        self.operator.stop_character(slot, id).await
    }

    pub async fn start_all_characters(&self, slot: u32) -> Result<()> {
        self.operator.start_all(slot).await
    }

    pub async fn operator_scenarios(&self, slot: u32) -> Result<Vec<ScenarioResult>> {
        self.operator.get_scenarios(slot).await
    }

    pub async fn operator_scenario(&self, slot: u32, id: &str) -> Result<ScenarioResult> {
        self.operator.get_scenario(slot, id).await
    }

    pub async fn submit_scenario(&self, slot: u32, scenario: &Scenario) -> Result<String> {
        self.operator.submit_scenario(slot, scenario).await
    }

    pub async fn stop_scenario(&self, slot: u32, id: &str) -> Result<()> {
        self.operator.stop_scenario(slot, id).await
    }

    pub async fn activate_profile(&self, slot: u32, id: &str) -> Result<()> {
        self.operator.activate_profile(slot, id).await
    }

    pub async fn activation_status(&self, slot: u32, id: &str) -> Result<ActivationStatus> {
        self.operator.activation_status(slot, id).await
    }

    pub async fn submit_otp(&self, slot: u32, id: &str, otp: &OtpSubmission) -> Result<()> {
        self.operator.submit_otp(slot, id, otp).await
    }

    // ── Orchestrator ─────────────────────────────────────────────

    pub async fn orchestrator_characters(&self) -> Result<Vec<OrchestratorCharacter>> {
        self.orchestrator.list_characters().await
    }

    pub async fn add_orchestrator_characters(&self, ids: &[String]) -> Result<()> {
        self.orchestrator.add_characters(ids).await
    }

    pub async fn delete_orchestrator_character(&self, id: &str) -> Result<()> {
        self.orchestrator.delete_character(id).await
    }

    pub async fn get_chat(&self, id: &str) -> Result<Chat> {
        self.orchestrator.get_chat(id).await
    }

    pub async fn chat_characters(&self, id: &str) -> Result<Vec<OrchestratorCharacter>> {
        self.orchestrator.chat_characters(id).await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let root = self.orchestrator.root_category().await?;
        let descendants = self.orchestrator.descendant_categories(&root.id).await?;
        Ok(aggregate::dedupe_categories(root, descendants))
    }

    /// Fetch the de-duplicated category list, then the chats of every
    /// category concurrently. There is no concurrency cap and no
    /// partial-failure tolerance: one failed per-category fetch aborts
    /// the whole aggregation. The result is deterministic with respect
    /// to the de-duplicated category order.
    pub async fn chats_with_categories(&self) -> Result<ChatsWithCategories> {
        let categories = self.categories().await?;

        let mut fetches = JoinSet::new();
        for category in &categories {
            let orchestrator = Arc::clone(&self.orchestrator);
            let id = category.id.clone();
            fetches.spawn(async move {
                let chats = orchestrator.chats_in_category(&id).await?;
                Ok::<_, anyhow::Error>((id, chats))
            });
        }

        let mut chats_by_category: HashMap<String, Vec<Chat>> = HashMap::new();
        while let Some(joined) = fetches.join_next().await {
            let (id, chats) = joined.context("Per-category chat fetch panicked")??;
            chats_by_category.insert(id, chats);
        }

        let categories = categories
            .into_iter()
            .map(|category| {
                let count = chats_by_category
                    .get(&category.id)
                    .map(Vec::len)
                    .unwrap_or(0);
                CategoryWithCount { category, count }
            })
            .collect();

        Ok(ChatsWithCategories {
            categories,
            chats_by_category,
        })
    }

    pub async fn missions(&self) -> Result<Vec<Mission>> {
        self.orchestrator.list_missions().await
    }

    pub async fn mission(&self, id: &str) -> Result<Mission> {
        self.orchestrator.get_mission(id).await
    }

    pub async fn delete_mission(&self, id: &str) -> Result<()> {
        self.orchestrator.delete_mission(id).await
    }

    pub async fn create_mission(&self, mission: &NewMission) -> Result<Mission> {
        self.orchestrator.create_mission(mission).await
    }

    pub async fn set_mission_description(&self, id: &str, description: &str) -> Result<()> {
        self.orchestrator.set_mission_description(id, description).await
    }

    pub async fn plan_mission(&self, id: &str) -> Result<Vec<Scenario>> {
        self.orchestrator.plan_mission(id).await
    }

    pub async fn run_mission(&self, id: &str) -> Result<()> {
        self.orchestrator.run_mission(id).await
    }

    pub async fn upload_resolve_phone_results(&self, upload: ResolvePhoneUpload) -> Result<()> {
        self.orchestrator.upload_resolve_phone_results(upload).await
    }

    pub async fn mission_statistics(&self, mission_id: Option<&str>) -> Result<Value> {
        self.orchestrator.mission_statistics(mission_id).await
    }

    pub async fn missions_with_statistics(&self) -> Result<Value> {
        self.orchestrator.missions_with_statistics().await
    }

    pub async fn missions_with_exposure_and_stats(&self) -> Result<Value> {
        self.orchestrator.missions_with_exposure_and_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::types::WorkerState;

    struct FakeAvatars {
        avatars: Vec<Avatar>,
    }

    #[async_trait]
    impl AvatarsApi for FakeAvatars {
        async fn list_avatars(&self) -> Result<Vec<Avatar>> {
            Ok(self.avatars.clone())
        }
        async fn get_avatar(&self, _id: &str) -> Result<Avatar> {
            anyhow::bail!("not used")
        }
        async fn patch_avatar(&self, _id: &str, _patch: &PatchAvatar) -> Result<Avatar> {
            anyhow::bail!("not used")
        }
        async fn list_proxies(&self) -> Result<Vec<Proxy>> {
            Ok(Vec::new())
        }
        async fn assign_proxy(&self, _avatar_id: &str, _proxy_id: &str) -> Result<()> {
            Ok(())
        }
        async fn unassign_proxy(&self, _avatar_id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct FakeOperator {
        workers: Vec<ProfileWorkerView>,
    }

    #[async_trait]
    impl OperatorApi for FakeOperator {
        async fn list_characters(&self, _slot: u32) -> Result<Vec<ProfileWorkerView>> {
            Ok(self.workers.clone())
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

    /// Orchestrator stub serving a fixed category tree; chat fetches
    /// for ids listed in `failing` return errors.
    struct FakeOrchestrator {
        root: Category,
        descendants: Vec<Category>,
        chats: HashMap<String, Vec<Chat>>,
        failing: Vec<String>,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OrchestratorApi for FakeOrchestrator {
        async fn list_characters(&self) -> Result<Vec<OrchestratorCharacter>> {
            Ok(Vec::new())
        }
        async fn add_characters(&self, _ids: &[String]) -> Result<()> {
            Ok(())
        }
        async fn delete_character(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn get_chat(&self, _id: &str) -> Result<Chat> {
            anyhow::bail!("not used")
        }
        async fn chat_characters(&self, _id: &str) -> Result<Vec<OrchestratorCharacter>> {
            Ok(Vec::new())
        }
        async fn root_category(&self) -> Result<Category> {
            Ok(self.root.clone())
        }
        async fn descendant_categories(&self, _id: &str) -> Result<Vec<Category>> {
            Ok(self.descendants.clone())
        }
        async fn chats_in_category(&self, id: &str) -> Result<Vec<Chat>> {
            self.fetched.lock().unwrap().push(id.to_string());
            if self.failing.iter().any(|f| f == id) {
                anyhow::bail!("chat fetch failed for {}", id);
            }
            Ok(self.chats.get(id).cloned().unwrap_or_default())
        }
        async fn list_missions(&self) -> Result<Vec<Mission>> {
            Ok(Vec::new())
        }
        async fn get_mission(&self, _id: &str) -> Result<Mission> {
            anyhow::bail!("not used")
        }
        async fn delete_mission(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn create_mission(&self, _mission: &NewMission) -> Result<Mission> {
            anyhow::bail!("not used")
        }
        async fn set_mission_description(&self, _id: &str, _description: &str) -> Result<()> {
            Ok(())
        }
        async fn plan_mission(&self, _id: &str) -> Result<Vec<Scenario>> {
            Ok(Vec::new())
        }
        async fn run_mission(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn upload_resolve_phone_results(&self, _upload: ResolvePhoneUpload) -> Result<()> {
            Ok(())
        }
        async fn mission_statistics(&self, _mission_id: Option<&str>) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn missions_with_statistics(&self) -> Result<Value> {
            Ok(Value::Null)
        }
        async fn missions_with_exposure_and_stats(&self) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn category(id: &str) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_uppercase(),
            parent_id: None,
            character_count: 0,
            chat_count: 0,
        }
    }

    fn chat(id: &str) -> Chat {
        Chat {
            id: id.to_string(),
            title: None,
            username: None,
            members: None,
            members_count: None,
            subscribers_count: None,
            category_id: None,
        }
    }

    fn avatar(id: &str, phone: Option<&str>) -> Avatar {
        Avatar {
            id: id.to_string(),
            eliza_character: Value::Null,
            gender: None,
            date_of_birth: None,
            phone_number: phone.map(str::to_string),
            addresses: Vec::new(),
            social_accounts: HashMap::new(),
            proxy: None,
        }
    }

    fn worker(id: &str) -> ProfileWorkerView {
        ProfileWorkerView {
            id: id.to_string(),
            state: WorkerState::Idle,
            current_scenario: None,
            current_scenario_result: None,
            pending_actions: 0,
            browser_port: None,
        }
    }

    fn service_with_orchestrator(orchestrator: FakeOrchestrator) -> ApiService {
        ApiService::with_clients(
            Arc::new(FakeAvatars { avatars: vec![] }),
            Arc::new(FakeOperator { workers: vec![] }),
            Arc::new(orchestrator),
        )
    }

    #[tokio::test]
    async fn test_chats_with_categories_dedupes_and_maps_each_id_once() {
        let mut chats = HashMap::new();
        chats.insert("root".to_string(), vec![chat("c1")]);
        chats.insert("a".to_string(), vec![chat("c2"), chat("c3")]);
        chats.insert("b".to_string(), vec![]);

        // Descendants contain a duplicate of the root itself.
        let service = service_with_orchestrator(FakeOrchestrator {
            root: category("root"),
            descendants: vec![category("a"), category("root"), category("b")],
            chats,
            failing: vec![],
            fetched: Mutex::new(Vec::new()),
        });

        let result = service.chats_with_categories().await.unwrap();

        let ids: Vec<&str> = result
            .categories
            .iter()
            .map(|c| c.category.id.as_str())
            .collect();
        assert_eq!(ids, vec!["root", "a", "b"]);
        assert_eq!(result.chats_by_category.len(), 3);
        assert_eq!(result.chats_by_category["a"].len(), 2);

        let counts: Vec<usize> = result.categories.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn test_chats_with_categories_aborts_on_single_failure() {
        let service = service_with_orchestrator(FakeOrchestrator {
            root: category("root"),
            descendants: vec![category("a")],
            chats: HashMap::new(),
            failing: vec!["a".to_string()],
            fetched: Mutex::new(Vec::new()),
        });

        let err = service.chats_with_categories().await.unwrap_err();
        assert!(err.to_string().contains("chat fetch failed"));
    }

    #[tokio::test]
    async fn test_combined_avatars_join() {
        let service = ApiService::with_clients(
            Arc::new(FakeAvatars {
                avatars: vec![avatar("a", None), avatar("b", None)],
            }),
            Arc::new(FakeOperator {
                workers: vec![worker("b")],
            }),
            Arc::new(service_stub_orchestrator()),
        );

        let combined = service.combined_avatars(0).await.unwrap();
        assert_eq!(combined.len(), 2);
        assert!(combined[0].profile_worker_view.is_none());
        assert!(combined[1].profile_worker_view.is_some());
    }

    #[tokio::test]
    async fn test_used_phone_numbers_skips_absent_and_empty() {
        let service = ApiService::with_clients(
            Arc::new(FakeAvatars {
                avatars: vec![
                    avatar("a", Some("111")),
                    avatar("b", None),
                    avatar("c", Some("")),
                ],
            }),
            Arc::new(FakeOperator { workers: vec![] }),
            Arc::new(service_stub_orchestrator()),
        );

        let used = service.used_phone_numbers().await.unwrap();
        assert_eq!(used.len(), 1);
        assert!(used.contains("111"));
    }

    fn service_stub_orchestrator() -> FakeOrchestrator {
        FakeOrchestrator {
            root: category("root"),
            descendants: vec![],
            chats: HashMap::new(),
            failing: vec![],
            fetched: Mutex::new(Vec::new()),
        }
    }
}

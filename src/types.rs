//! Avatar Fleet Operations - Type Definitions
//!
//! Shared types for the fleet operations service: avatar inventory records,
//! operator worker state, scenarios and their action variants, orchestrator
//! missions, and the client traits implemented by the upstream HTTP clients.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Avatars & Proxies ───────────────────────────────────────────

/// Network egress identity assigned to at most one avatar at a time.
/// Assignment and ping health are owned by the avatars service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proxy {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_is_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ping_remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ping_at: Option<String>,
}

/// Avatar inventory record as served by the avatars service
/// (upstream name: AvatarModelWithProxy).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Avatar {
    pub id: String,
    /// Freeform character/profile blob; opaque to this service.
    #[serde(default)]
    pub eliza_character: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Value>,
    /// Per-network flags: does this avatar hold an account there.
    #[serde(default)]
    pub social_accounts: HashMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Proxy>,
}

/// Single-field patch against an avatar record: a JSON-pointer style
/// path plus the new value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatchAvatar {
    pub path: String,
    pub value: Value,
}

// ─── Operator Worker State ───────────────────────────────────────

/// Runtime state of an avatar's automation worker on the operator service.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Init,
    Starting,
    Stopping,
    Stopped,
    Idle,
    Working,
    Paused,
}

impl WorkerState {
    /// A worker counts as running until it reaches `Stopped`.
    pub fn is_running(&self) -> bool {
        !matches!(self, WorkerState::Stopped)
    }
}

/// Ephemeral view of an avatar's worker. Exists only while the operator
/// service is actively tracking the avatar; never persisted here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileWorkerView {
    pub id: String,
    pub state: WorkerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_scenario: Option<Scenario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_scenario_result: Option<ScenarioResult>,
    #[serde(default)]
    pub pending_actions: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_port: Option<u16>,
}

/// Join of an avatar inventory record with its live worker state.
/// `profile_worker_view` is absent when the avatar has no active worker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombinedAvatar {
    #[serde(flatten)]
    pub avatar: Avatar,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_worker_view: Option<ProfileWorkerView>,
}

// ─── Scenarios & Actions ─────────────────────────────────────────

/// One step of a scenario. The wire format is a discriminated object:
/// `{"type": "send_message", "args": {...}}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum Action {
    SendMessage(SendMessageArgs),
    SendBulkMessages(SendBulkMessagesArgs),
    JoinGroup(GroupArgs),
    LeaveGroup(GroupArgs),
    ReplyToMessage(ReplyToMessageArgs),
    ForwardMessage(ForwardMessageArgs),
    Behavioural(BehaviouralArgs),
    ReadMessages(ReadMessagesArgs),
    ResolvePhone(ResolvePhoneArgs),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageArgs {
    pub chat_id: String,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkMessage {
    pub chat_id: String,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendBulkMessagesArgs {
    pub messages: Vec<BulkMessage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupArgs {
    pub group_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplyToMessageArgs {
    pub chat_id: String,
    pub message_id: String,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForwardMessageArgs {
    pub from_chat_id: String,
    pub message_id: String,
    pub to_chat_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviouralArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadMessagesArgs {
    pub chat_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvePhoneArgs {
    pub phone_numbers: Vec<String>,
}

/// Typed result payload of a completed action. Mirrors the `Action`
/// discriminant so `actions[i]` and `actions_responses[i].content`
/// carry the same tag.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ActionContent {
    SendMessage(SentMessageContent),
    SendBulkMessages(BulkSendContent),
    JoinGroup(GroupContent),
    LeaveGroup(GroupContent),
    ReplyToMessage(SentMessageContent),
    ForwardMessage(SentMessageContent),
    Behavioural(BehaviouralContent),
    ReadMessages(ReadMessagesContent),
    ResolvePhone(ResolvePhoneContent),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SentMessageContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkSendContent {
    #[serde(default)]
    pub message_ids: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviouralContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadMessagesContent {
    #[serde(default)]
    pub messages: Vec<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedPhone {
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub found: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvePhoneContent {
    #[serde(default)]
    pub resolved: Vec<ResolvedPhone>,
}

/// Per-action outcome within a scenario result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub status_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ActionContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

/// Ordered list of actions executed against one avatar profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub profile_id: String,
    pub actions: Vec<Action>,
}

/// Execution record of a scenario. `actions_responses` is positional
/// against the scenario's `actions` and may be shorter while the
/// scenario is still running.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: String,
    #[serde(default)]
    pub actions_responses: Vec<ActionResponse>,
}

// ─── Missions ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MissionType {
    RandomDistributionMission,
    EchoMission,
    AllocateProfilesGroupsMission,
    PuppetShowMission,
    FluffMission,
}

/// Orchestrator-owned unit of work. The status lifecycle is external;
/// `status_code` is surfaced as an opaque string and never interpreted
/// beyond display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub mission_type: MissionType,
    #[serde(default)]
    pub payload: Value,
    pub status_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Payload for creating a mission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewMission {
    pub mission_type: MissionType,
    #[serde(default)]
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Multipart upload forwarded to the orchestrator's resolve-phone
/// results endpoint.
#[derive(Clone, Debug)]
pub struct ResolvePhoneUpload {
    pub file_name: String,
    pub csv_bytes: Vec<u8>,
    pub mission_id: Option<String>,
    pub batch_size: Option<u32>,
    pub extra: Option<Value>,
}

// ─── Categories & Chats ──────────────────────────────────────────

/// Category tree node used to tag avatars and chats. The count fields
/// are upstream rollups used only for filtering displays.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub character_count: u64,
    #[serde(default)]
    pub chat_count: u64,
}

/// Chat record as the orchestrator serves it. Upstream is inconsistent
/// about which member-count field is populated; use
/// [`crate::aggregate::normalize_chat`] before display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribers_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

/// Chat with exactly one canonical member count, for the view layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizedChat {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryWithCount {
    pub category: Category,
    pub count: usize,
}

/// Result of the chats-with-categories aggregation: the de-duplicated
/// category list (root first, order preserved) and chats keyed by
/// category id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatsWithCategories {
    pub categories: Vec<CategoryWithCount>,
    pub chats_by_category: HashMap<String, Vec<Chat>>,
}

/// Avatar registration record on the orchestrator side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorCharacter {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

// ─── WEB1 Accounts ───────────────────────────────────────────────

/// Phone-number/credential record sourced from the WEB1 CSV file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Web1Account {
    pub item_id: String,
    pub user_id: String,
    pub origin_country: String,
    pub phone_number: String,
    pub password: String,
    #[serde(rename = "2fa_password", skip_serializing_if = "Option::is_none")]
    pub two_fa_password: Option<String>,
}

// ─── Activation ──────────────────────────────────────────────────

/// Status reported by the operator service while logging an avatar's
/// profile into its social network account.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationStatus {
    Idle,
    Started,
    CheckingProfile,
    AlreadyLoggedIn,
    WaitingForOtp,
    EnteringOtp,
    CheckingIfWaitingForPassword,
    WaitingForPassword,
    EnteringPassword,
    #[serde(rename = "WAITING_10_SECONDS")]
    Waiting10Seconds,
    VerifyingLogin,
    Skipped,
    Success,
    LoginVerificationFailed,
    Failed,
}

impl ActivationStatus {
    /// Terminal statuses stop activation polling unconditionally.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActivationStatus::Success
                | ActivationStatus::Failed
                | ActivationStatus::LoginVerificationFailed
        )
    }
}

/// Credentials supplied by the operator while activation is paused on
/// `WAITING_FOR_OTP`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtpSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// ─── Client Traits ───────────────────────────────────────────────

/// Avatars inventory service client.
#[async_trait]
pub trait AvatarsApi: Send + Sync {
    async fn list_avatars(&self) -> Result<Vec<Avatar>>;
    async fn get_avatar(&self, id: &str) -> Result<Avatar>;
    async fn patch_avatar(&self, id: &str, patch: &PatchAvatar) -> Result<Avatar>;
    async fn list_proxies(&self) -> Result<Vec<Proxy>>;
    async fn assign_proxy(&self, avatar_id: &str, proxy_id: &str) -> Result<()>;
    async fn unassign_proxy(&self, avatar_id: &str) -> Result<()>;
}

/// Operator service client. All paths are scoped by an operator slot.
#[async_trait]
pub trait OperatorApi: Send + Sync {
    async fn list_characters(&self, slot: u32) -> Result<Vec<ProfileWorkerView>>;
    async fn start_character(&self, slot: u32, id: &str) -> Result<()>;
    async fn stop_character(&self, slot: u32, id: &str) -> Result<()>;
    async fn start_all(&self, slot: u32) -> Result<()>;
    async fn stop_all(&self, slot: u32) -> Result<()>;
    async fn get_scenarios(&self, slot: u32) -> Result<Vec<ScenarioResult>>;
    async fn get_scenario(&self, slot: u32, id: &str) -> Result<ScenarioResult>;
    async fn submit_scenario(&self, slot: u32, scenario: &Scenario) -> Result<String>;
    async fn stop_scenario(&self, slot: u32, id: &str) -> Result<()>;
    async fn activate_profile(&self, slot: u32, id: &str) -> Result<()>;
    async fn activation_status(&self, slot: u32, id: &str) -> Result<ActivationStatus>;
    async fn submit_otp(&self, slot: u32, id: &str, otp: &OtpSubmission) -> Result<()>;
}

/// Orchestrator service client.
#[async_trait]
pub trait OrchestratorApi: Send + Sync {
    async fn list_characters(&self) -> Result<Vec<OrchestratorCharacter>>;
    async fn add_characters(&self, ids: &[String]) -> Result<()>;
    async fn delete_character(&self, id: &str) -> Result<()>;
    async fn get_chat(&self, id: &str) -> Result<Chat>;
    async fn chat_characters(&self, id: &str) -> Result<Vec<OrchestratorCharacter>>;
    async fn root_category(&self) -> Result<Category>;
    async fn descendant_categories(&self, id: &str) -> Result<Vec<Category>>;
    async fn chats_in_category(&self, id: &str) -> Result<Vec<Chat>>;
    async fn list_missions(&self) -> Result<Vec<Mission>>;
    async fn get_mission(&self, id: &str) -> Result<Mission>;
    async fn delete_mission(&self, id: &str) -> Result<()>;
    async fn create_mission(&self, mission: &NewMission) -> Result<Mission>;
    async fn set_mission_description(&self, id: &str, description: &str) -> Result<()>;
    async fn plan_mission(&self, id: &str) -> Result<Vec<Scenario>>;
    async fn run_mission(&self, id: &str) -> Result<()>;
    async fn upload_resolve_phone_results(&self, upload: ResolvePhoneUpload) -> Result<()>;
    async fn mission_statistics(&self, mission_id: Option<&str>) -> Result<Value>;
    async fn missions_with_statistics(&self) -> Result<Value>;
    async fn missions_with_exposure_and_stats(&self) -> Result<Value>;
}

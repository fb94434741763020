use serde::{Deserialize, Serialize};

/// One direct message from a user, as forwarded by the dispatch layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub user_id: String,
    /// Raw message text.
    #[serde(alias = "body")]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub user_id: String,
    pub code: String,
}

/// Body of the triggers that only need a user id (`/daily`, `/reset`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderRequest {
    pub user_id: String,
    /// 24h `HH:MM`.
    #[serde(alias = "time_of_day")]
    pub time: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplicitRequest {
    pub user_id: String,
    /// Omitted means toggle.
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "first_page")]
    pub page: usize,
}

fn first_page() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

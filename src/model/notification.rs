use serde::Serialize;
use strum::IntoStaticStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    LeaveSubmitted,
    LeaveApproved,
    LeaveRejected,
    LeaveCancelled,
    LeaveAutoApproved,
    UrgentReminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub recipient_id: u64,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub kind: NotificationKind,
}

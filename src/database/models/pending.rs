//! Pending conversational actions.
//!
//! A user can be in the middle of at most one multi-message flow. The
//! next plain text message they send is interpreted by that flow.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PendingAction {
    /// Waiting for the custom username.
    SetUsername,
    /// Admin picked "send to one user"; waiting for the target id.
    AwaitTarget,
    /// Admin gave a target id; waiting for the text.
    AwaitDirectText { target: u64 },
    /// Admin picked "send to all"; waiting for the text.
    AwaitBroadcastText,
}

impl PendingAction {
    pub fn is_admin_flow(&self) -> bool {
        !matches!(self, Self::SetUsername)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_form_is_tagged() {
        let json = serde_json::to_string(&PendingAction::AwaitDirectText { target: 5 }).unwrap();
        assert_eq!(json, r#"{"action":"await_direct_text","target":5}"#);

        let parsed: PendingAction = serde_json::from_str(r#"{"action":"set_username"}"#).unwrap();
        assert_eq!(parsed, PendingAction::SetUsername);
        assert!(!parsed.is_admin_flow());
    }
}

/**
 * Real-time Event System
 *
 * Wire format of the live-messaging socket. Every frame is a JSON text
 * frame shaped `{"event": "<name>", "data": {...}}`, both directions.
 *
 * # Inbound
 *
 * `ClientIntent` covers what a client may ask for: send a direct message,
 * mark one read, join or leave a group, post to a group.
 *
 * # Outbound
 *
 * `ServerEvent` covers room events fanned out to subscribers, the
 * acknowledgements returned only to the originating connection, the
 * `ready` frame sent after admission and the `error` frame.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;
use crate::shared::messaging::{validate_content, DirectMessage, GroupMessageView};

/// Intent decoded from an inbound socket frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientIntent {
    #[serde(alias = "sendMessage")]
    SendDirectMessage { content: String, receiver_id: Uuid },
    #[serde(alias = "markMessageAsRead")]
    MarkRead { message_id: Uuid },
    JoinGroup { group_id: Uuid },
    LeaveGroup { group_id: Uuid },
    SendGroupMessage { content: String, group_id: Uuid },
}

impl ClientIntent {
    /// Decode and validate a text frame
    pub fn parse(frame: &str) -> Result<Self, SharedError> {
        let intent: ClientIntent = serde_json::from_str(frame)?;
        intent.validate()?;
        Ok(intent)
    }

    pub fn validate(&self) -> Result<(), SharedError> {
        match self {
            Self::SendDirectMessage { content, .. } | Self::SendGroupMessage { content, .. } => {
                validate_content(content)
            }
            _ => Ok(()),
        }
    }

    /// Wire name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendDirectMessage { .. } => "sendDirectMessage",
            Self::MarkRead { .. } => "markRead",
            Self::JoinGroup { .. } => "joinGroup",
            Self::LeaveGroup { .. } => "leaveGroup",
            Self::SendGroupMessage { .. } => "sendGroupMessage",
        }
    }
}

/// Event pushed to a connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Admission finished; lists the rooms the connection was subscribed to
    Ready { user_id: Uuid, rooms: Vec<String> },

    // Room events
    MessageReceived(DirectMessage),
    MessageUpdated(DirectMessage),
    UserJoinedGroup {
        user_id: Uuid,
        group_id: Uuid,
        joined_at: DateTime<Utc>,
    },
    UserLeftGroup { user_id: Uuid, group_id: Uuid },
    GroupMessageReceived(GroupMessageView),

    // Acknowledgements to the originator
    MessageSent(DirectMessage),
    MessageMarkedAsRead(DirectMessage),
    GroupJoined { group_id: Uuid },
    GroupLeft { group_id: Uuid },
    GroupMessageSent(GroupMessageView),

    Error { reason: String, code: String },
}

impl ServerEvent {
    pub fn error(reason: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
            code: code.into(),
        }
    }

    /// Wire name of the event
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::MessageReceived(_) => "messageReceived",
            Self::MessageUpdated(_) => "messageUpdated",
            Self::UserJoinedGroup { .. } => "userJoinedGroup",
            Self::UserLeftGroup { .. } => "userLeftGroup",
            Self::GroupMessageReceived(_) => "groupMessageReceived",
            Self::MessageSent(_) => "messageSent",
            Self::MessageMarkedAsRead(_) => "messageMarkedAsRead",
            Self::GroupJoined { .. } => "groupJoined",
            Self::GroupLeft { .. } => "groupLeft",
            Self::GroupMessageSent(_) => "groupMessageSent",
            Self::Error { .. } => "error",
        }
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_send_direct_message() {
        let receiver = Uuid::new_v4();
        let frame = format!(
            r#"{{"event":"sendDirectMessage","data":{{"content":"hi","receiverId":"{}"}}}}"#,
            receiver
        );
        let intent = ClientIntent::parse(&frame).unwrap();
        assert_eq!(
            intent,
            ClientIntent::SendDirectMessage {
                content: "hi".into(),
                receiver_id: receiver
            }
        );
    }

    #[test]
    fn test_parse_accepts_legacy_names() {
        let id = Uuid::new_v4();
        let frame = format!(r#"{{"event":"markMessageAsRead","data":{{"messageId":"{}"}}}}"#, id);
        assert_eq!(
            ClientIntent::parse(&frame).unwrap(),
            ClientIntent::MarkRead { message_id: id }
        );

        let frame = format!(
            r#"{{"event":"sendMessage","data":{{"content":"yo","receiverId":"{}"}}}}"#,
            id
        );
        assert_eq!(ClientIntent::parse(&frame).unwrap().name(), "sendDirectMessage");
    }

    #[test]
    fn test_parse_rejects_empty_content() {
        let frame = format!(
            r#"{{"event":"sendGroupMessage","data":{{"content":"","groupId":"{}"}}}}"#,
            Uuid::new_v4()
        );
        let err = ClientIntent::parse(&frame).unwrap_err();
        assert_eq!(err.field(), Some("content"));
    }

    #[test]
    fn test_parse_rejects_bad_ids_and_unknown_events() {
        assert!(ClientIntent::parse(r#"{"event":"joinGroup","data":{"groupId":"nope"}}"#).is_err());
        assert!(ClientIntent::parse(r#"{"event":"typing","data":{}}"#).is_err());
        assert!(ClientIntent::parse("garbage").is_err());
    }

    #[test]
    fn test_server_event_wire_shape() {
        let user_id = Uuid::new_v4();
        let group_id = Uuid::new_v4();
        let event = ServerEvent::UserLeftGroup { user_id, group_id };
        let json: serde_json::Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
        assert_eq!(json["event"], event.event_name());
        assert_eq!(json["data"]["userId"], user_id.to_string());
        assert_eq!(json["data"]["groupId"], group_id.to_string());
    }

    #[test]
    fn test_error_event_shape() {
        let json = serde_json::to_value(ServerEvent::error("Group not found", "not_found")).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["data"]["reason"], "Group not found");
        assert_eq!(json["data"]["code"], "not_found");
    }
}

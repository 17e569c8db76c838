use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Announcement, Message, ReactionMap};

/// Events sent over the WebSocket gateway.
///
/// Snapshots always carry the complete current view, never a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the connection is authenticated
    Ready { address: String, username: String },

    /// The full message window after a change to the messages collection
    FeedSnapshot { messages: Vec<Message> },

    /// The recomputed reaction summary of one message
    ReactionSnapshot {
        message_id: Uuid,
        reactions: ReactionMap,
    },

    /// The banners the user should currently see
    AnnouncementSnapshot { announcements: Vec<Announcement> },

    /// A command could not be carried out
    Error { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    SubscribeFeed,
    UnsubscribeFeed,
    SubscribeReactions { message_id: Uuid },
    UnsubscribeReactions { message_id: Uuid },
    SubscribeAnnouncements,
    UnsubscribeAnnouncements,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_format() {
        let cmd: GatewayCommand = serde_json::from_str(r#"{"type":"SubscribeFeed"}"#).unwrap();
        assert_eq!(cmd, GatewayCommand::SubscribeFeed);

        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"SubscribeReactions","data":{{"message_id":"{}"}}}}"#, id);
        let cmd: GatewayCommand = serde_json::from_str(&raw).unwrap();
        assert_eq!(cmd, GatewayCommand::SubscribeReactions { message_id: id });
    }
}

use serde::{Deserialize, Serialize};

/// Kind of notification carried by the per-game push feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FeedMessageKind {
    /// Some player stat of the game changed remotely.
    #[serde(rename = "PLAYER_STAT_UPDATE")]
    PlayerStatUpdate,
    /// The team stats of the game changed remotely.
    #[serde(rename = "TEAM_STAT_UPDATE")]
    TeamStatUpdate,
    /// Anything else the broker may publish on the topic.
    #[serde(other)]
    Unknown,
}

/// JSON frame published on `/topic/games/{gameId}`.
///
/// The payload is kept opaque: a notification only signals that state changed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedMessage {
    /// Which totals changed.
    #[serde(rename = "type")]
    pub kind: FeedMessageKind,
    /// Raw payload, unused by the bridge.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl FeedMessage {
    /// Build a notification without payload.
    pub fn notification(kind: FeedMessageKind) -> Self {
        Self {
            kind,
            payload: serde_json::Value::Null,
        }
    }

    /// Parse a frame body.
    pub fn from_json_str(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_unknown_kinds() {
        let message =
            FeedMessage::from_json_str(r#"{"type":"TEAM_STAT_UPDATE","gameId":"g1","stat":{}}"#)
                .unwrap();
        assert_eq!(message.kind, FeedMessageKind::TeamStatUpdate);
        assert!(message.payload.is_null());

        let message = FeedMessage::from_json_str(r#"{"type":"GAME_OVER","payload":1}"#).unwrap();
        assert_eq!(message.kind, FeedMessageKind::Unknown);
    }
}

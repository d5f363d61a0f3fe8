// Session-level values that live outside any zone.
//
// Players, pointers, chat messages and the server policy are replicated by
// commands but are not part of the campaign document.

use serde::{Deserialize, Serialize};

use crate::types::{Guid, Role};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub role: Role,
}

impl Player {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    pub fn is_gm(&self) -> bool {
        self.role == Role::Gm
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    #[default]
    Arrow,
    Speech,
    Thought,
    Look,
}

/// A player's on-map pointer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    pub zone_id: Guid,
    pub x: i32,
    pub y: i32,
    /// Degrees clockwise from north.
    pub direction: i32,
    pub kind: PointerKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageChannel {
    #[default]
    Say,
    Emote,
    Gm,
    Whisper,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub channel: MessageChannel,
    pub source: String,
    pub target: Option<String>,
    pub text: String,
}

impl TextMessage {
    pub fn say(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: MessageChannel::Say,
            source: source.into(),
            target: None,
            text: text.into(),
        }
    }

    /// Whether `player` should see this message in their chat log.
    pub fn is_visible_to(&self, player: &Player) -> bool {
        match self.channel {
            MessageChannel::Say | MessageChannel::Emote => true,
            MessageChannel::Gm => player.is_gm() || self.source == player.name,
            MessageChannel::Whisper => {
                self.source == player.name || self.target.as_deref() == Some(player.name.as_str())
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementMetric {
    #[default]
    OneTwoOne,
    OneOneOne,
    Manhattan,
    NoDiagonals,
}

/// Server-wide rules the GM sets for the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPolicy {
    pub players_can_reveal_vision: bool,
    pub use_individual_views: bool,
    pub use_individual_fow: bool,
    pub restricted_impersonation: bool,
    pub players_receive_campaign_macros: bool,
    pub movement_metric: MovementMetric,
}

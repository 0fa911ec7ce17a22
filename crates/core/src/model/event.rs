use serde::{Deserialize, Serialize};

use crate::model::ChildId;

/// Discriminant of a progress event, as sent in the `kind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Flashcard,
    Chore,
    Outdoor,
    AffirmationViewed,
}

impl EventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Flashcard => "flashcard",
            EventKind::Chore => "chore",
            EventKind::Outdoor => "outdoor",
            EventKind::AffirmationViewed => "affirmation_viewed",
        }
    }
}

/// Kind-specific payload of a progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum EventBody {
    #[serde(rename_all = "camelCase")]
    Flashcard {
        subject: String,
        correct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        card_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Chore { chore_id: String },
    #[serde(rename_all = "camelCase")]
    Outdoor { activity_id: String },
    #[serde(rename_all = "camelCase")]
    AffirmationViewed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        affirmation_id: Option<String>,
    },
}

impl EventBody {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::Flashcard { .. } => EventKind::Flashcard,
            EventBody::Chore { .. } => EventKind::Chore,
            EventBody::Outdoor { .. } => EventKind::Outdoor,
            EventBody::AffirmationViewed { .. } => EventKind::AffirmationViewed,
        }
    }

    /// Chore or outdoor activity id for events that complete one.
    #[must_use]
    pub fn completion_id(&self) -> Option<&str> {
        match self {
            EventBody::Chore { chore_id } => Some(chore_id),
            EventBody::Outdoor { activity_id } => Some(activity_id),
            EventBody::Flashcard { .. } | EventBody::AffirmationViewed { .. } => None,
        }
    }
}

/// Outbound progress event. Sent once; never retried by the poster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub child_id: ChildId,
    #[serde(flatten)]
    pub body: EventBody,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(child_id: ChildId, body: EventBody) -> Self {
        Self { child_id, body }
    }
}

/// Backend acknowledgment of a submitted event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventAck {
    pub points_awarded: u32,
    pub new_achievement_ids: Vec<String>,
}

use serde::{Deserialize, Serialize};

/// One diary entry. Identity and timestamps are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    /// Title for structured entries, body text for plain entries,
    /// description for images.
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub payload: Payload,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Type-specific payload of a memory. The `type` tag matches the wire
/// format of the diary backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Text,
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    List {
        items: Vec<String>,
    },
    Timeline {
        events: Vec<TimelineEvent>,
    },
    Image {
        image_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        media_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        album: Option<String>,
    },
}

impl Payload {
    /// The wire name of this payload's type.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text => "text",
            Payload::Table { .. } => "table",
            Payload::List { .. } => "list",
            Payload::Timeline { .. } => "timeline",
            Payload::Image { .. } => "image",
        }
    }

    /// Display name used in builder/editor feedback ("Table created...").
    pub fn label(&self) -> &'static str {
        match self {
            Payload::Text => "Memory",
            Payload::Table { .. } => "Table",
            Payload::List { .. } => "List",
            Payload::Timeline { .. } => "Timeline",
            Payload::Image { .. } => "Image",
        }
    }
}

/// One entry on a timeline. `time` may be empty when the input line had
/// no dash separator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub time: String,
    pub description: String,
}

impl TimelineEvent {
    /// Render as "9:00 AM — Wake up" or "• Wake up" for untimed events.
    pub fn display(&self) -> String {
        if self.time.is_empty() {
            format!("• {}", self.description)
        } else {
            format!("{} — {}", self.time, self.description)
        }
    }
}

/// A memory as submitted to the store for creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMemory {
    #[serde(default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Partial update applied by `MemoryStore::update`. `None` means "leave
/// unchanged"; `category: Some(None)` clears the category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(flatten)]
    pub payload: Option<Payload>,
}

/// Who a reply line is attributed to in the terminal.
///
/// `Mother` is the diary's conversational voice; `Mid` is the system
/// channel (prompts, listings, errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Mother,
    Mid,
}

impl Speaker {
    pub fn name(&self) -> &'static str {
        match self {
            Speaker::Mother => "Mother",
            Speaker::Mid => "MiD",
        }
    }
}

/// One attributed output line from the dialogue engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub speaker: Speaker,
    pub text: String,
}

impl Reply {
    pub fn mother(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Mother,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Mid,
            text: text.into(),
        }
    }
}

/// Everything the engine produced for one input line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Turn {
    pub replies: Vec<Reply>,
    /// Set by the `clear` command; the front end wipes its scrollback.
    #[serde(default)]
    pub cleared: bool,
}

impl Turn {
    pub fn from_replies(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            cleared: false,
        }
    }

    /// Convenience for single-reply turns.
    pub fn one(reply: Reply) -> Self {
        Self::from_replies(vec![reply])
    }
}

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One observed input action, as written to and read from the session's
/// event store. The serialized line format is the wire contract between the
/// capture worker and the controller; both sides must agree exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    /// ISO-8601 wall-clock instant, microsecond precision.
    pub timestamp: String,
    /// Frontmost application at capture time, when the OS query succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// Title of the frontmost window, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    /// Coarse category derived from `app` (see `context::classify`). Always
    /// written by the worker; tolerated missing on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Kind-specific payload. Tagged by the `kind` field so each line in the
/// event store is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    MouseClick {
        x: f64,
        y: f64,
        button: MouseButton,
        pressed: bool,
    },
    MouseScroll {
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
    },
    KeyPress {
        /// Printable character, or a symbolic name for non-printable keys
        /// (e.g. "return", "escape", "cmd").
        key: String,
        /// Best-effort hint attached by the follow-up tagging pass.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    KeyRelease {
        key: String,
    },
}

impl EventKind {
    /// Short label for logs and event summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MouseClick { .. } => "mouse_click",
            Self::MouseScroll { .. } => "mouse_scroll",
            Self::KeyPress { .. } => "key_press",
            Self::KeyRelease { .. } => "key_release",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

impl CapturedEvent {
    /// Build an event stamped with the current instant, not yet enriched.
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: now_timestamp(),
            app: None,
            window: None,
            category: None,
        }
    }
}

/// Current UTC instant formatted to microsecond precision.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// One past synthesis outcome in the example corpus. Appended to the corpus
/// log as a single JSON line; never mutated after being written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleRecord {
    pub prompt: String,
    pub code: String,
    /// 1 = success, 0 = failure (integer on the wire, matching the log format).
    pub reward: u8,
    pub timestamp: String,
    /// Prompt embedding; computed at most once and cached. Missing vectors
    /// are backfilled in memory on corpus load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ExampleRecord {
    pub fn new(prompt: impl Into<String>, code: impl Into<String>, success: bool) -> Self {
        Self {
            prompt: prompt.into(),
            code: code.into(),
            reward: if success { 1 } else { 0 },
            timestamp: now_timestamp(),
            embedding: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.reward == 1
    }
}

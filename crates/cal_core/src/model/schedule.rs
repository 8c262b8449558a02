use serde::{Deserialize, Serialize};

/// Lifecycle state of a schedule. Serialized with the wire labels used by
/// the remote service ("Not Started", "In Progress", ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parse a CLI argument form ("in-progress", "completed", ...).
    pub fn from_arg(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "not-started" => Some(Self::NotStarted),
            "in-progress" => Some(Self::InProgress),
            "completed" | "done" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses never produce reminders.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Online,
    #[serde(rename = "In-Person")]
    InPerson,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::InPerson => "In-Person",
        }
    }

    pub fn from_arg(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(' ', "-").as_str() {
            "online" => Some(Self::Online),
            "in-person" | "offline" => Some(Self::InPerson),
            _ => None,
        }
    }
}

/// A single calendar entry. Timestamps are RFC3339 strings; well-formed
/// records have start_time strictly before end_time, enforced at the API
/// layer rather than here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub task_name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub status: ScheduleStatus,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub reminder_minutes: u32,
    #[serde(default)]
    pub ringtone_id: Option<u8>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Schedule {
    /// Composite key identifying one reminder occurrence of this schedule.
    pub fn occurrence_key(&self) -> String {
        format!("{}_{}", self.id, self.start_time)
    }
}

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a recruitment drive.
    DriveId
);
string_id!(
    /// Identifier of a round inside a drive.
    RoundId
);
string_id!(
    /// Identifier of a per-student, per-drive progression record.
    ProgressId
);
string_id!(
    /// Student reference issued by the identity collaborator.
    StudentId
);
string_id!(
    /// Company reference issued by the company directory.
    CompanyId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl DriveStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    Aptitude,
    Coding,
    Technical,
    Hr,
    GroupDiscussion,
    Presentation,
    Other,
}

impl RoundType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Aptitude => "Aptitude",
            Self::Coding => "Coding",
            Self::Technical => "Technical",
            Self::Hr => "HR",
            Self::GroupDiscussion => "Group Discussion",
            Self::Presentation => "Presentation",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl RoundStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Outcome of a single round for a single student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Shortlisted,
    Rejected,
}

impl EntryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Shortlisted => "shortlisted",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Active,
    Placed,
    Rejected,
}

impl OverallStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Placed => "placed",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalResult {
    Selected,
    Rejected,
}

/// A company's recruitment process instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementDrive {
    pub id: DriveId,
    pub company: CompanyId,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_rounds: u32,
    pub status: DriveStatus,
    pub created_at: DateTime<Utc>,
}

/// One evaluation stage of a drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRound {
    pub id: RoundId,
    pub drive_id: DriveId,
    pub round_number: u32,
    pub round_name: String,
    pub round_type: RoundType,
    pub description: String,
    /// Minutes.
    pub duration: Option<u32>,
    pub max_marks: f64,
    pub passing_marks: Option<f64>,
    pub scheduled_date: Option<NaiveDate>,
    pub venue: Option<String>,
    pub status: RoundStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-round outcome stored inside a progression record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundProgressEntry {
    pub round_number: u32,
    pub status: EntryStatus,
    pub marks_obtained: Option<f64>,
    pub max_marks: Option<f64>,
    pub percentage: Option<f64>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl RoundProgressEntry {
    pub fn pending(round_number: u32) -> Self {
        Self {
            round_number,
            status: EntryStatus::Pending,
            marks_obtained: None,
            max_marks: None,
            percentage: None,
            evaluated_at: None,
        }
    }
}

/// The system of record for one student's journey through one drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRoundProgress {
    pub id: ProgressId,
    pub student_id: StudentId,
    pub drive_id: DriveId,
    pub current_round: u32,
    pub overall_status: OverallStatus,
    pub round_progress: Vec<RoundProgressEntry>,
    pub average_percentage: f64,
    pub final_result: Option<FinalResult>,
}

/// Admin request for a new drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDrive {
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_rounds: u32,
    #[serde(default)]
    pub status: Option<DriveStatus>,
}

/// Admin request for a new round in an existing drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRound {
    pub round_number: u32,
    pub round_name: String,
    pub round_type: RoundType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default = "default_max_marks")]
    pub max_marks: f64,
    #[serde(default)]
    pub passing_marks: Option<f64>,
    #[serde(default)]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub venue: Option<String>,
}

fn default_max_marks() -> f64 {
    100.0
}

impl NewRound {
    /// Minimal round request with default marking.
    pub fn named(round_number: u32, round_name: &str, round_type: RoundType) -> Self {
        Self {
            round_number,
            round_name: round_name.to_string(),
            round_type,
            description: String::new(),
            duration: None,
            max_marks: default_max_marks(),
            passing_marks: None,
            scheduled_date: None,
            venue: None,
        }
    }
}

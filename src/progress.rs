use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("progress must be between 0 and 100, got {0}")]
pub struct InvalidRangeError(pub i64);

/// Course completion percentage, always within 0..=100
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema,
)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const DONE: Progress = Progress(100);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Progress {
    type Error = InvalidRangeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Ok(Progress(v)),
            _ => Err(InvalidRangeError(value)),
        }
    }
}

impl From<Progress> for i64 {
    fn from(value: Progress) -> Self {
        value.0 as i64
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Course completion status, stored and serialized with its Indonesian label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CompletionStatus {
    #[serde(rename = "SELESAI")]
    Completed,
    #[default]
    #[serde(rename = "BELUM SELESAI")]
    NotCompleted,
}

impl CompletionStatus {
    pub fn from_progress(progress: Progress) -> Self {
        if progress == Progress::DONE {
            CompletionStatus::Completed
        } else {
            CompletionStatus::NotCompleted
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompletionStatus::Completed => "SELESAI",
            CompletionStatus::NotCompleted => "BELUM SELESAI",
        }
    }
}

impl FromStr for CompletionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SELESAI" => Ok(CompletionStatus::Completed),
            "BELUM SELESAI" => Ok(CompletionStatus::NotCompleted),
            _ => Err(format!(
                "status must be SELESAI or BELUM SELESAI, got {s:?}"
            )),
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated progress write.
///
/// Status is derived from the percentage. Completed lessons are stored as given;
/// `None` leaves the stored sequence untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub progress: Progress,
    pub status: CompletionStatus,
    pub completed_lessons: Option<Vec<String>>,
}

impl ProgressUpdate {
    pub fn new(
        progress: i64,
        completed_lessons: Option<Vec<String>>,
    ) -> Result<Self, InvalidRangeError> {
        let progress = Progress::try_from(progress)?;
        Ok(Self {
            progress,
            status: CompletionStatus::from_progress(progress),
            completed_lessons,
        })
    }
}

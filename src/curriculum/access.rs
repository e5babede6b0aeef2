//! Lesson access rules.
//!
//! A lesson is accessible when the learner already completed it, when it is the
//! first lesson of the curriculum, or when the lesson right before it (in
//! teaching order, across chapter boundaries) is completed. The rule only looks
//! at the immediate predecessor, so lessons completed out of order or listed
//! twice do not affect the result.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Catalog, Lesson};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid lesson path: {0}")]
pub struct InvalidLessonError(pub String);

/// Per learner state of a single lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum LessonState {
    Locked,
    Unlocked,
    Completed,
}

impl LessonState {
    pub fn is_accessible(self) -> bool {
        !matches!(self, LessonState::Locked)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonStatus {
    pub path: String,
    pub label: String,
    pub state: LessonState,
}

impl Catalog {
    /// Whether `lesson_path` may be opened given the learner's completed lessons.
    pub fn is_accessible(
        &self,
        lesson_path: &str,
        completed_lessons: &[String],
    ) -> Result<bool, InvalidLessonError> {
        self.lesson_state(lesson_path, completed_lessons)
            .map(LessonState::is_accessible)
    }

    pub fn lesson_state(
        &self,
        lesson_path: &str,
        completed_lessons: &[String],
    ) -> Result<LessonState, InvalidLessonError> {
        let idx = self
            .position(lesson_path)
            .ok_or_else(|| InvalidLessonError(lesson_path.to_string()))?;
        let completed = |path: &str| completed_lessons.iter().any(|c| c == path);
        Ok(self.state_at(idx, completed))
    }

    /// State of every lesson, in teaching order
    pub fn lesson_states(&self, completed_lessons: &[String]) -> Vec<LessonStatus> {
        let completed: HashSet<&str> = completed_lessons.iter().map(String::as_str).collect();
        self.lessons()
            .enumerate()
            .map(|(idx, Lesson { path, label })| LessonStatus {
                path: path.clone(),
                label: label.clone(),
                state: self.state_at(idx, |p| completed.contains(p)),
            })
            .collect()
    }

    fn state_at(&self, idx: usize, completed: impl Fn(&str) -> bool) -> LessonState {
        if completed(self.order[idx].as_str()) {
            LessonState::Completed
        } else if idx == 0 || completed(self.order[idx - 1].as_str()) {
            LessonState::Unlocked
        } else {
            LessonState::Locked
        }
    }
}

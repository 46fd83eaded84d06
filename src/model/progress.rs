//! Progress rollup.
//!
//! Lesson completion and quiz approval are folded into per-module and
//! per-student percentages. A lesson counts as finished once the student
//! marked it done and, when the lesson carries a quiz, the quiz submission
//! was approved.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::model::entity::SubmissionStatus;

/// `round(100 * done / total)` with halves rounded up, `0` for an empty total.
pub fn percentage(done: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    let done = done.clamp(0, total);
    ((done * 200 + total) / (total * 2)) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuizState {
    NotRequired,
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

impl QuizState {
    pub fn new(has_quiz: bool, status: Option<&str>) -> Self {
        if !has_quiz {
            return Self::NotRequired;
        }
        match status.map(SubmissionStatus::from) {
            None => Self::NotSubmitted,
            Some(SubmissionStatus::Pending) => Self::Pending,
            Some(SubmissionStatus::Approved) => Self::Approved,
            Some(SubmissionStatus::Rejected) => Self::Rejected,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::NotRequired | Self::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonStatus {
    pub lesson_id: Uuid,
    pub module_id: Uuid,
    pub completed: bool,
    pub quiz: QuizState,
}

impl LessonStatus {
    pub fn is_finished(&self) -> bool {
        self.completed && self.quiz.is_satisfied()
    }
}

#[derive(Debug, Clone)]
pub struct ModuleHeader {
    pub id: Uuid,
    pub title: String,
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ModuleProgress {
    pub module_id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub percentage: i32,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct ProgressTotals {
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub percentage: i32,
    pub quizzes_pending: i64,
    pub quizzes_approved: i64,
    pub quizzes_rejected: i64,
}

impl ProgressTotals {
    pub fn from_lessons<'a, I>(lessons: I) -> Self
    where
        I: IntoIterator<Item = &'a LessonStatus>,
    {
        let mut totals = Self::default();
        for lesson in lessons {
            totals.total_lessons += 1;
            if lesson.is_finished() {
                totals.completed_lessons += 1;
            }
            match lesson.quiz {
                QuizState::Pending => totals.quizzes_pending += 1,
                QuizState::Approved => totals.quizzes_approved += 1,
                QuizState::Rejected => totals.quizzes_rejected += 1,
                QuizState::NotRequired | QuizState::NotSubmitted => {}
            }
        }
        totals.percentage = percentage(totals.completed_lessons, totals.total_lessons);
        totals
    }
}

/// Per-module rollup in the order of `modules`. Lessons of unknown modules are ignored.
pub fn rollup_modules(modules: &[ModuleHeader], lessons: &[LessonStatus]) -> Vec<ModuleProgress> {
    let mut counters: HashMap<Uuid, (i64, i64)> = HashMap::with_capacity(modules.len());
    for lesson in lessons {
        let entry = counters.entry(lesson.module_id).or_default();
        entry.0 += 1;
        if lesson.is_finished() {
            entry.1 += 1;
        }
    }

    modules
        .iter()
        .map(|m| {
            let (total, done) = counters.get(&m.id).copied().unwrap_or_default();
            ModuleProgress {
                module_id: m.id,
                title: m.title.clone(),
                order_index: m.order_index,
                total_lessons: total,
                completed_lessons: done,
                percentage: percentage(done, total),
            }
        })
        .collect()
}

/// Splits a flat `(student, lesson)` listing into per-student lesson lists.
pub fn group_by_student<I>(rows: I) -> HashMap<Uuid, Vec<LessonStatus>>
where
    I: IntoIterator<Item = (Uuid, LessonStatus)>,
{
    let mut grouped: HashMap<Uuid, Vec<LessonStatus>> = HashMap::new();
    for (student_id, status) in rows {
        grouped.entry(student_id).or_default().push(status);
    }
    grouped
}

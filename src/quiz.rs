use serde::Deserialize;
use tracing::debug;

use crate::content::{self, ContentError};
use crate::progress::ProgressRecord;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub level: u32,
    pub required_level: u32,
    /// Percentage of correct answers needed to pass.
    pub required_score: u32,
    pub questions: Vec<Question>,
}

/// The opening mission is never locked.
pub const FIRST_QUIZ_ID: &str = "privacy-basics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum QuizStatus {
    Completed,
    Available,
    Locked,
}

impl Quiz {
    pub fn status(&self, progress: &ProgressRecord) -> QuizStatus {
        if progress.completed_quizzes.iter().any(|id| id == &self.id) {
            QuizStatus::Completed
        } else if self.id == FIRST_QUIZ_ID || progress.level >= self.required_level {
            QuizStatus::Available
        } else {
            QuizStatus::Locked
        }
    }

    /// Correct answers needed to reach `required_score`.
    pub fn answers_needed(&self) -> usize {
        let total = self.questions.len() as u32;
        (self.required_score * total).div_ceil(100) as usize
    }
}

pub fn catalog() -> Result<Vec<Quiz>, ContentError> {
    content::load(content::QUIZZES_FILE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub correct: usize,
    pub total: usize,
    pub percentage: u32,
    pub passed: bool,
    pub points: u32,
}

/// A single attempt at a quiz.
#[derive(Debug, Clone)]
pub struct QuizRun {
    quiz: Quiz,
    current: usize,
    selected: Option<usize>,
    correct: usize,
    points: u32,
}

impl QuizRun {
    pub fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            current: 0,
            selected: None,
            correct: 0,
            points: 0,
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions.get(self.current)
    }

    pub fn question_index(&self) -> usize {
        self.current
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn correct_so_far(&self) -> usize {
        self.correct
    }

    /// Answers the current question. Only the first answer counts; returns
    /// whether it was correct, or `None` if already answered or out of range.
    pub fn answer(&mut self, option: usize) -> Option<bool> {
        let question = self.quiz.questions.get(self.current)?;
        if self.selected.is_some() || option >= question.options.len() {
            return None;
        }
        let correct = option == question.correct_answer;
        debug!(quiz = %self.quiz.id, question = %question.id, correct, "answered");
        if correct {
            self.correct += 1;
            self.points += question.points;
        }
        self.selected = Some(option);
        Some(correct)
    }

    /// Moves to the next question once the current one is answered. Returns
    /// false when there are no more questions.
    pub fn next(&mut self) -> bool {
        if self.selected.is_none() || self.current + 1 >= self.quiz.questions.len() {
            return false;
        }
        self.current += 1;
        self.selected = None;
        true
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.quiz.questions.len()
    }

    pub fn finish(&self) -> QuizOutcome {
        let total = self.quiz.questions.len();
        let percentage = if total == 0 {
            0
        } else {
            (self.correct * 100 / total) as u32
        };
        QuizOutcome {
            correct: self.correct,
            total,
            percentage,
            passed: percentage >= self.quiz.required_score,
            points: self.points,
        }
    }
}

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::quiz::{Quiz, QuizOutcome};

pub const POINTS_PER_LEVEL: u32 = 100;
pub const GUARDIAN_LEVEL: u32 = 5;
/// Questions to the safety helper that earn the curious-explorer badge.
pub const CURIOUS_QUESTIONS: u32 = 10;

/// The learner's persistent progress, in the wire shape the stores exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub level: u32,
    pub total_points: u32,
    pub badges: Vec<String>,
    pub completed_quizzes: Vec<String>,
    pub completed_games: Vec<String>,
    pub streak_days: u32,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            level: 1,
            total_points: 0,
            badges: Vec::new(),
            completed_quizzes: Vec::new(),
            completed_games: Vec::new(),
            streak_days: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub required_level: u32,
    pub max_points: u32,
}

pub const PASSWORD_GAME: GameInfo = GameInfo {
    id: "password-game",
    title: "Password Fortress",
    description: "Build a super strong password by following more and more fun rules!",
    required_level: 1,
    max_points: 100,
};

pub const SHARE_SHIELD_GAME: GameInfo = GameInfo {
    id: "share-shield",
    title: "Share or Shield",
    description: "Decide which information is safe to share online and which to protect!",
    required_level: 1,
    max_points: 96,
};

pub const GAMES: [GameInfo; 2] = [PASSWORD_GAME, SHARE_SHIELD_GAME];

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Badge {
    FirstSteps,
    PasswordPro,
    InfoDetective,
    PrivacyGuardian,
    CuriousExplorer,
}

impl Badge {
    pub fn title(&self) -> &'static str {
        match self {
            Badge::FirstSteps => "First Steps",
            Badge::PasswordPro => "Password Pro",
            Badge::InfoDetective => "Info Detective",
            Badge::PrivacyGuardian => "Privacy Guardian",
            Badge::CuriousExplorer => "Curious Explorer",
        }
    }
}

/// What happened, as far as badges are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Achievement {
    PasswordGameWon,
    PerfectShareShield,
    /// Total questions put to the safety helper so far.
    QuestionsAsked(u32),
}

impl ProgressRecord {
    pub fn is_unlocked(&self, game: &GameInfo) -> bool {
        self.level >= game.required_level
    }

    pub fn has_completed_game(&self, game_id: &str) -> bool {
        self.completed_games.iter().any(|g| g == game_id)
    }

    pub fn has_badge(&self, badge: Badge) -> bool {
        let id = badge.to_string();
        self.badges.iter().any(|b| *b == id)
    }

    /// Credits a finished game. Replays still earn points but the game is
    /// listed once.
    pub fn record_game(&mut self, game_id: &str, points: u32) {
        self.total_points += points;
        if !self.has_completed_game(game_id) {
            self.completed_games.push(game_id.to_string());
        }
        self.level = self.level.max(self.total_points / POINTS_PER_LEVEL + 1);
        info!(game_id, points, total = self.total_points, level = self.level, "game recorded");
    }

    /// Credits a quiz attempt. Failed or repeated quizzes change nothing;
    /// returns whether the record changed.
    pub fn record_quiz(&mut self, quiz: &Quiz, outcome: &QuizOutcome) -> bool {
        if !outcome.passed || self.completed_quizzes.iter().any(|q| q == &quiz.id) {
            return false;
        }
        self.completed_quizzes.push(quiz.id.clone());
        self.total_points += outcome.points;
        if quiz.level >= self.level {
            self.level = quiz.level + 1;
        }
        info!(quiz = %quiz.id, points = outcome.points, level = self.level, "quiz recorded");
        true
    }

    pub fn points_to_next_level(&self) -> u32 {
        ((self.level + 1) * POINTS_PER_LEVEL).saturating_sub(self.total_points)
    }

    /// Awards every badge the record now qualifies for. Returns the new ones.
    pub fn award_badges(&mut self, achievement: Option<Achievement>) -> Vec<Badge> {
        let earned = [
            (Badge::FirstSteps, !self.completed_quizzes.is_empty()),
            (
                Badge::PasswordPro,
                achievement == Some(Achievement::PasswordGameWon),
            ),
            (
                Badge::InfoDetective,
                achievement == Some(Achievement::PerfectShareShield),
            ),
            (Badge::PrivacyGuardian, self.level >= GUARDIAN_LEVEL),
            (
                Badge::CuriousExplorer,
                matches!(achievement, Some(Achievement::QuestionsAsked(n)) if n >= CURIOUS_QUESTIONS),
            ),
        ];

        let mut new_badges = Vec::new();
        for (badge, qualifies) in earned {
            if qualifies && !self.has_badge(badge) {
                self.badges.push(badge.to_string());
                new_badges.push(badge);
            }
        }
        if !new_badges.is_empty() {
            info!(?new_badges, "badges awarded");
        }
        new_badges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::catalog;

    fn passed(points: u32) -> QuizOutcome {
        QuizOutcome {
            correct: 5,
            total: 5,
            percentage: 100,
            passed: true,
            points,
        }
    }

    #[test]
    fn test_default_record() {
        let record = ProgressRecord::default();
        assert_eq!(record.level, 1);
        assert_eq!(record.streak_days, 1);
        assert_eq!(record.points_to_next_level(), 200);
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let json = serde_json::to_value(ProgressRecord::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "level": 1,
                "totalPoints": 0,
                "badges": [],
                "completedQuizzes": [],
                "completedGames": [],
                "streakDays": 1
            })
        );
    }

    #[test]
    fn test_record_game_levels_up_by_points() {
        let mut record = ProgressRecord::default();
        record.record_game(PASSWORD_GAME.id, 92);
        assert_eq!(record.level, 1);
        record.record_game(PASSWORD_GAME.id, 30);
        assert_eq!(record.total_points, 122);
        assert_eq!(record.level, 2);
        assert_eq!(record.completed_games, vec!["password-game".to_string()]);
    }

    #[test]
    fn test_record_game_never_lowers_level() {
        let mut record = ProgressRecord {
            level: 4,
            ..ProgressRecord::default()
        };
        record.record_game(SHARE_SHIELD_GAME.id, 8);
        assert_eq!(record.level, 4);
    }

    #[test]
    fn test_record_quiz_only_once_and_only_when_passed() {
        let quizzes = catalog().unwrap();
        let first = &quizzes[0];
        let mut record = ProgressRecord::default();

        let failed = QuizOutcome {
            passed: false,
            ..passed(40)
        };
        assert!(!record.record_quiz(first, &failed));
        assert_eq!(record.total_points, 0);

        assert!(record.record_quiz(first, &passed(100)));
        assert_eq!(record.level, 2);
        assert_eq!(record.total_points, 100);

        assert!(!record.record_quiz(first, &passed(100)));
        assert_eq!(record.total_points, 100);
    }

    #[test]
    fn test_lower_level_quiz_does_not_raise_level() {
        let quizzes = catalog().unwrap();
        let mut record = ProgressRecord {
            level: 3,
            ..ProgressRecord::default()
        };
        record.record_quiz(&quizzes[0], &passed(100));
        assert_eq!(record.level, 3);
    }

    #[test]
    fn test_badges_awarded_once() {
        let mut record = ProgressRecord::default();
        assert!(record.award_badges(None).is_empty());

        let new = record.award_badges(Some(Achievement::PasswordGameWon));
        assert_eq!(new, vec![Badge::PasswordPro]);
        assert!(record
            .award_badges(Some(Achievement::PasswordGameWon))
            .is_empty());
        assert_eq!(record.badges, vec!["password-pro".to_string()]);
    }

    #[test]
    fn test_level_and_quiz_badges() {
        let mut record = ProgressRecord {
            level: 5,
            completed_quizzes: vec!["privacy-basics".into()],
            ..ProgressRecord::default()
        };
        let new = record.award_badges(Some(Achievement::PerfectShareShield));
        assert_eq!(
            new,
            vec![Badge::FirstSteps, Badge::InfoDetective, Badge::PrivacyGuardian]
        );
    }

    #[test]
    fn test_curious_explorer_after_ten_questions() {
        let mut record = ProgressRecord::default();
        assert!(record
            .award_badges(Some(Achievement::QuestionsAsked(CURIOUS_QUESTIONS - 1)))
            .is_empty());
        let new = record.award_badges(Some(Achievement::QuestionsAsked(CURIOUS_QUESTIONS)));
        assert_eq!(new, vec![Badge::CuriousExplorer]);
        assert_eq!(record.badges, vec!["curious-explorer".to_string()]);
        assert_eq!(Badge::CuriousExplorer.title(), "Curious Explorer");
    }

    #[test]
    fn test_unlocks() {
        let record = ProgressRecord::default();
        assert!(GAMES.iter().all(|g| record.is_unlocked(g)));
    }
}

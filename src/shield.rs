//! Share-or-Shield: decide, card by card, whether a piece of information
//! is safe to share online before the per-card countdown runs out.

use serde::Deserialize;
use tracing::{debug, info};

use crate::content::{self, ContentError};

/// Ticks a feedback card stays up before the next card is dealt.
pub const FEEDBACK_TICKS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Card {
    pub info: String,
    pub safe: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Deck {
    pub name: String,
    pub seconds_per_card: u32,
    pub points_per_card: u32,
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn embedded() -> Result<Self, ContentError> {
        content::load(content::CARDS_FILE)
    }

    pub fn max_score(&self) -> u32 {
        self.points_per_card * self.cards.len() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Choice {
    Share,
    Shield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    OutOfTime,
}

/// Shown between cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub verdict: Verdict,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Deciding,
    Feedback(Feedback),
    Finished,
}

#[derive(Debug, Clone)]
pub struct ShareOrShield {
    deck: Deck,
    current: usize,
    score: u32,
    time_remaining: u32,
    feedback_ticks: u32,
    phase: Phase,
}

impl ShareOrShield {
    pub fn new(deck: Deck) -> Self {
        let time_remaining = deck.seconds_per_card;
        let phase = if deck.cards.is_empty() {
            Phase::Finished
        } else {
            Phase::Deciding
        };
        Self {
            deck,
            current: 0,
            score: 0,
            time_remaining,
            feedback_ticks: 0,
            phase,
        }
    }

    /// Starts over from the first card with the same deck.
    pub fn restart(&mut self) {
        self.current = 0;
        self.score = 0;
        self.time_remaining = self.deck.seconds_per_card;
        self.feedback_ticks = 0;
        self.phase = if self.deck.cards.is_empty() {
            Phase::Finished
        } else {
            Phase::Deciding
        };
    }

    pub fn choose(&mut self, choice: Choice) -> Option<&Feedback> {
        if self.phase != Phase::Deciding {
            return None;
        }
        let card = &self.deck.cards[self.current];
        let correct = matches!(
            (choice, card.safe),
            (Choice::Share, true) | (Choice::Shield, false)
        );
        let verdict = if correct {
            self.score += self.deck.points_per_card;
            Verdict::Correct
        } else {
            Verdict::Incorrect
        };
        debug!(card = self.current, %choice, correct, "card answered");
        self.enter_feedback(verdict)
    }

    /// Advances the per-card countdown while a decision is pending. While
    /// feedback is shown it counts towards [`FEEDBACK_TICKS`] and then deals
    /// the next card, which may finish the game.
    pub fn tick(&mut self) -> Option<&Feedback> {
        if matches!(self.phase, Phase::Feedback(_)) {
            self.feedback_ticks += 1;
            if self.feedback_ticks >= FEEDBACK_TICKS {
                self.advance();
            }
            return None;
        }
        if self.phase != Phase::Deciding {
            return None;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            debug!(card = self.current, "card timed out");
            return self.enter_feedback(Verdict::OutOfTime);
        }
        None
    }

    /// Leaves the feedback phase. Returns the final score once the last card
    /// has been shown.
    pub fn advance(&mut self) -> Option<u32> {
        if !matches!(self.phase, Phase::Feedback(_)) {
            return None;
        }
        if self.current + 1 < self.deck.cards.len() {
            self.current += 1;
            self.time_remaining = self.deck.seconds_per_card;
            self.phase = Phase::Deciding;
            None
        } else {
            self.phase = Phase::Finished;
            info!(score = self.score, max = self.deck.max_score(), "share-or-shield finished");
            Some(self.score)
        }
    }

    fn enter_feedback(&mut self, verdict: Verdict) -> Option<&Feedback> {
        let explanation = self.deck.cards[self.current].explanation.clone();
        self.feedback_ticks = 0;
        self.phase = Phase::Feedback(Feedback {
            verdict,
            explanation,
        });
        match &self.phase {
            Phase::Feedback(feedback) => Some(feedback),
            _ => None,
        }
    }

    pub fn current_card(&self) -> Option<&Card> {
        match self.phase {
            Phase::Finished => None,
            _ => self.deck.cards.get(self.current),
        }
    }

    /// 0-based position of the current card.
    pub fn card_index(&self) -> usize {
        self.current
    }

    pub fn card_count(&self) -> usize {
        self.deck.cards.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn max_score(&self) -> u32 {
        self.deck.max_score()
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn has_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn is_perfect(&self) -> bool {
        self.has_finished() && self.score == self.deck.max_score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn small_deck() -> Deck {
        Deck {
            name: "test".into(),
            seconds_per_card: 3,
            points_per_card: 8,
            cards: vec![
                Card {
                    info: "colour".into(),
                    safe: true,
                    explanation: "fine".into(),
                },
                Card {
                    info: "address".into(),
                    safe: false,
                    explanation: "secret".into(),
                },
            ],
        }
    }

    #[test]
    fn test_embedded_deck() {
        let deck = Deck::embedded().unwrap();
        assert_eq!(deck.cards.len(), 12);
        assert_eq!(deck.seconds_per_card, 10);
        assert_eq!(deck.max_score(), 96);
    }

    #[test]
    fn test_correct_choices_score() {
        let mut game = ShareOrShield::new(small_deck());
        let feedback = game.choose(Choice::Share).unwrap();
        assert_eq!(feedback.verdict, Verdict::Correct);
        assert_eq!(feedback.explanation, "fine");
        assert_eq!(game.advance(), None);

        game.choose(Choice::Shield);
        assert_eq!(game.advance(), Some(16));
        assert!(game.is_perfect());
        assert!(game.current_card().is_none());
    }

    #[test]
    fn test_wrong_choice_scores_nothing() {
        let mut game = ShareOrShield::new(small_deck());
        let feedback = game.choose(Choice::Shield).unwrap();
        assert_eq!(feedback.verdict, Verdict::Incorrect);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_timeout_moves_to_feedback() {
        let mut game = ShareOrShield::new(small_deck());
        assert!(game.tick().is_none());
        assert!(game.tick().is_none());
        let feedback = game.tick().unwrap();
        assert_eq!(feedback.verdict, Verdict::OutOfTime);

        // no choice lands while feedback is shown
        assert!(game.choose(Choice::Share).is_none());
        assert!(game.tick().is_none());
        assert_eq!(game.score(), 0);
        assert_matches!(game.phase(), Phase::Feedback(_));
    }

    #[test]
    fn test_feedback_advances_on_its_own() {
        let mut game = ShareOrShield::new(small_deck());
        game.choose(Choice::Share);
        for _ in 1..FEEDBACK_TICKS {
            game.tick();
            assert_matches!(game.phase(), Phase::Feedback(_));
        }
        game.tick();
        assert_eq!(game.card_index(), 1);
        assert_eq!(game.time_remaining(), 3);
        assert_matches!(game.phase(), Phase::Deciding);

        // a fresh feedback card gets the full delay again
        game.choose(Choice::Shield);
        for _ in 0..FEEDBACK_TICKS {
            game.tick();
        }
        assert!(game.has_finished());
        assert!(game.is_perfect());
    }

    #[test]
    fn test_restart_clears_score() {
        let mut game = ShareOrShield::new(small_deck());
        game.choose(Choice::Share);
        game.advance();
        game.choose(Choice::Shield);
        game.advance();
        assert!(game.has_finished());

        game.restart();
        assert_eq!(game.score(), 0);
        assert_eq!(game.card_index(), 0);
        assert_eq!(game.time_remaining(), 3);
        assert_matches!(game.phase(), Phase::Deciding);
    }

    #[test]
    fn test_advance_resets_timer() {
        let mut game = ShareOrShield::new(small_deck());
        game.tick();
        game.choose(Choice::Share);
        game.advance();
        assert_eq!(game.card_index(), 1);
        assert_eq!(game.time_remaining(), 3);
        assert_matches!(game.phase(), Phase::Deciding);
    }

    #[test]
    fn test_advance_requires_feedback() {
        let mut game = ShareOrShield::new(small_deck());
        assert_eq!(game.advance(), None);
        assert_eq!(game.card_index(), 0);
    }

    #[test]
    fn test_empty_deck_is_finished() {
        let deck = Deck {
            cards: vec![],
            ..small_deck()
        };
        let mut game = ShareOrShield::new(deck);
        assert!(game.has_finished());
        assert!(game.choose(Choice::Share).is_none());
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::rules::{Rule, RuleSet};
use crate::scoring;

pub const DEFAULT_TIME_BUDGET: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Outcome {
    InProgress,
    Won,
    TimedOut,
}

/// What the trainer reports outward once a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub final_score: u32,
    pub outcome: Outcome,
}

/// How repeated hint requests for the same rule are charged.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum HintPolicy {
    /// Every accepted request adds to the penalty.
    #[default]
    Repeatable,
    /// Only the first request per rule adds to the penalty.
    ChargeOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerConfig {
    pub time_budget: u32,
    pub hint_policy: HintPolicy,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            time_budget: DEFAULT_TIME_BUDGET,
            hint_policy: HintPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HintRejected {
    #[error("the session is already over")]
    SessionOver,
    #[error("there is no rule {0}")]
    UnknownRule(usize),
    #[error("rule {0} has not been revealed yet")]
    NotRevealed(usize),
    #[error("rule {0} is already satisfied")]
    AlreadySatisfied(usize),
}

/// One play-through of the password fortress.
///
/// The host owns the clock: it calls [`Trainer::tick`] once per second and
/// forwards edits through [`Trainer::set_candidate`] on the same thread.
#[derive(Debug, Clone)]
pub struct Trainer {
    rules: RuleSet,
    config: TrainerConfig,
    candidate: String,
    active_rule_count: usize,
    time_remaining: u32,
    hints_consumed: u32,
    hinted_rules: BTreeSet<usize>,
    outcome: Outcome,
    result: Option<SessionResult>,
}

impl Trainer {
    /// Creates a trainer and starts its first session.
    pub fn new(rules: RuleSet, config: TrainerConfig) -> Self {
        let mut trainer = Self {
            rules,
            config,
            candidate: String::new(),
            active_rule_count: 1,
            time_remaining: config.time_budget,
            hints_consumed: 0,
            hinted_rules: BTreeSet::new(),
            outcome: Outcome::InProgress,
            result: None,
        };
        trainer.start();
        trainer
    }

    /// Discards the current session and starts a fresh one.
    pub fn start(&mut self) {
        self.candidate.clear();
        self.active_rule_count = 1.min(self.rules.len());
        self.time_remaining = self.config.time_budget;
        self.hints_consumed = 0;
        self.hinted_rules.clear();
        self.outcome = Outcome::InProgress;
        self.result = None;
        debug!(
            rules = self.rules.len(),
            budget = self.time_remaining,
            "password session started"
        );
    }

    /// Replaces the candidate and re-evaluates the active rules. Returns the
    /// result if this edit won the session.
    pub fn set_candidate(&mut self, text: impl Into<String>) -> Option<SessionResult> {
        if self.outcome != Outcome::InProgress {
            return None;
        }
        self.candidate = text.into();
        self.evaluate()
    }

    pub fn push_char(&mut self, c: char) -> Option<SessionResult> {
        let mut next = self.candidate.clone();
        next.push(c);
        self.set_candidate(next)
    }

    pub fn pop_char(&mut self) -> Option<SessionResult> {
        let mut next = self.candidate.clone();
        next.pop();
        self.set_candidate(next)
    }

    /// Returns the hint for an active, currently failing rule.
    pub fn request_hint(&mut self, rule_id: usize) -> Result<&str, HintRejected> {
        if self.outcome != Outcome::InProgress {
            return Err(HintRejected::SessionOver);
        }
        let rule = self
            .rules
            .get(rule_id)
            .ok_or(HintRejected::UnknownRule(rule_id))?;
        if rule_id > self.active_rule_count {
            return Err(HintRejected::NotRevealed(rule_id));
        }
        if rule.passes(&self.candidate) {
            return Err(HintRejected::AlreadySatisfied(rule_id));
        }

        let first_time = self.hinted_rules.insert(rule_id);
        if first_time || self.config.hint_policy == HintPolicy::Repeatable {
            self.hints_consumed += 1;
        }
        debug!(rule_id, hints = self.hints_consumed, "hint requested");
        Ok(rule.hint.as_str())
    }

    /// Advances the countdown by one unit.
    pub fn tick(&mut self) -> Option<SessionResult> {
        if self.outcome != Outcome::InProgress {
            return None;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            return Some(self.finish(Outcome::TimedOut));
        }
        None
    }

    fn evaluate(&mut self) -> Option<SessionResult> {
        while self.all_active_pass() && self.active_rule_count < self.rules.len() {
            self.active_rule_count += 1;
            debug!(active = self.active_rule_count, "next rule revealed");
        }
        if self.active_rule_count == self.rules.len() && self.all_active_pass() {
            return Some(self.finish(Outcome::Won));
        }
        None
    }

    fn finish(&mut self, outcome: Outcome) -> SessionResult {
        let final_score = match outcome {
            Outcome::Won => scoring::win_score(self.hints_consumed, self.time_remaining),
            _ => scoring::timeout_score(self.active_rule_count),
        };
        self.outcome = outcome;
        let result = SessionResult {
            final_score,
            outcome,
        };
        self.result = Some(result);
        info!(
            %outcome,
            score = final_score,
            hints = self.hints_consumed,
            time_remaining = self.time_remaining,
            "password session finished"
        );
        result
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn config(&self) -> TrainerConfig {
        self.config
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn active_rule_count(&self) -> usize {
        self.active_rule_count
    }

    /// Rules the engine has already advanced past.
    pub fn gates_passed(&self) -> usize {
        match self.outcome {
            Outcome::Won => self.rules.len(),
            _ => self.active_rule_count.saturating_sub(1),
        }
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn hints_consumed(&self) -> u32 {
        self.hints_consumed
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn result(&self) -> Option<SessionResult> {
        self.result
    }

    pub fn has_finished(&self) -> bool {
        self.outcome != Outcome::InProgress
    }

    pub fn active_rules(&self) -> &[Rule] {
        self.rules.prefix(self.active_rule_count)
    }

    pub fn failed_rules(&self) -> Vec<&Rule> {
        self.active_rules()
            .iter()
            .filter(|r| !r.passes(&self.candidate))
            .collect()
    }

    pub fn all_active_pass(&self) -> bool {
        self.active_rules().iter().all(|r| r.passes(&self.candidate))
    }

    /// Share of the fortress built so far, 0..=100.
    pub fn progress_percent(&self) -> u32 {
        if self.rules.is_empty() {
            return 100;
        }
        let done = self.active_rule_count.saturating_sub(1) + usize::from(self.all_active_pass());
        (done * 100 / self.rules.len()) as u32
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(RuleSet::default(), TrainerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const WINNER: &str = "MyPass2025!🔒world";

    #[test]
    fn test_new_session_state() {
        let trainer = Trainer::default();

        assert_eq!(trainer.candidate(), "");
        assert_eq!(trainer.active_rule_count(), 1);
        assert_eq!(trainer.time_remaining(), 120);
        assert_eq!(trainer.hints_consumed(), 0);
        assert_eq!(trainer.outcome(), Outcome::InProgress);
        assert_eq!(trainer.result(), None);
        assert_eq!(trainer.progress_percent(), 0);
    }

    #[test]
    fn test_walkthrough_reveals_one_rule_at_a_time() {
        let mut trainer = Trainer::default();

        assert_eq!(trainer.set_candidate("ab"), None);
        assert_eq!(trainer.active_rule_count(), 1);

        trainer.set_candidate("abcde");
        assert_eq!(trainer.active_rule_count(), 2);

        trainer.set_candidate("abcde1");
        assert_eq!(trainer.active_rule_count(), 3);

        trainer.set_candidate("abcde1A");
        assert_eq!(trainer.active_rule_count(), 4);

        // rules 5 (length 8) and 6 (lowercase) are already met, so the
        // symbol opens three gates at once
        trainer.set_candidate("abcde1A!");
        assert_eq!(trainer.active_rule_count(), 8);
        assert_eq!(trainer.failed_rules()[0].id, 8);

        trainer.set_candidate("abcde1A!2025");
        assert_eq!(trainer.active_rule_count(), 10);
        assert_eq!(trainer.outcome(), Outcome::InProgress);

        let result = trainer.set_candidate("abcde1A!2025🔒").unwrap();
        assert_eq!(result.outcome, Outcome::Won);
        assert_eq!(result.final_score, scoring::win_score(0, 120));
        assert_eq!(trainer.progress_percent(), 100);
        assert_eq!(trainer.gates_passed(), 10);
    }

    #[test]
    fn test_count_never_decreases_when_rules_break() {
        let mut trainer = Trainer::default();
        trainer.set_candidate("abcde1");
        assert_eq!(trainer.active_rule_count(), 3);

        trainer.set_candidate("");
        assert_eq!(trainer.active_rule_count(), 3);
        assert_eq!(trainer.failed_rules().len(), 2);
    }

    #[test]
    fn test_broken_earlier_rule_blocks_advancement() {
        let mut trainer = Trainer::default();
        trainer.set_candidate("abcde1");
        assert_eq!(trainer.active_rule_count(), 3);

        // uppercase present but the digit is gone
        trainer.set_candidate("abcdeA");
        assert_eq!(trainer.active_rule_count(), 3);
        assert!(!trainer.all_active_pass());
    }

    #[test]
    fn test_pasting_full_answer_wins_immediately() {
        let mut trainer = Trainer::default();
        let result = trainer.set_candidate(WINNER).unwrap();
        assert_eq!(result.outcome, Outcome::Won);
        assert_eq!(result.final_score, 92);
    }

    #[test]
    fn test_edits_after_win_are_ignored() {
        let mut trainer = Trainer::default();
        trainer.set_candidate(WINNER);
        assert_eq!(trainer.set_candidate("x"), None);
        assert_eq!(trainer.candidate(), WINNER);
    }

    #[test]
    fn test_push_and_pop_char() {
        let mut trainer = Trainer::default();
        for c in "abcd".chars() {
            trainer.push_char(c);
        }
        assert_eq!(trainer.active_rule_count(), 1);
        trainer.push_char('🔒');
        assert_eq!(trainer.active_rule_count(), 2);
        trainer.pop_char();
        assert_eq!(trainer.candidate(), "abcd");
    }

    #[test]
    fn test_hint_for_failing_active_rule() {
        let mut trainer = Trainer::default();
        let hint = trainer.request_hint(1).unwrap().to_string();
        assert_eq!(hint, trainer.rules().get(1).unwrap().hint);
        assert_eq!(trainer.hints_consumed(), 1);
    }

    #[test]
    fn test_hint_for_satisfied_rule_is_rejected() {
        let mut trainer = Trainer::default();
        trainer.set_candidate("abcde");
        assert_matches!(trainer.request_hint(1), Err(HintRejected::AlreadySatisfied(1)));
        assert_eq!(trainer.hints_consumed(), 0);
    }

    #[test]
    fn test_hint_for_hidden_or_unknown_rule_is_rejected() {
        let mut trainer = Trainer::default();
        assert_matches!(trainer.request_hint(2), Err(HintRejected::NotRevealed(2)));
        assert_matches!(trainer.request_hint(0), Err(HintRejected::UnknownRule(0)));
        assert_matches!(trainer.request_hint(11), Err(HintRejected::UnknownRule(11)));
        assert_eq!(trainer.hints_consumed(), 0);
    }

    #[test]
    fn test_repeated_hints_stack_by_default() {
        let mut trainer = Trainer::default();
        for _ in 0..4 {
            trainer.request_hint(1).unwrap();
        }
        assert_eq!(trainer.hints_consumed(), 4);

        let result = trainer.set_candidate(WINNER).unwrap();
        assert_eq!(result.final_score, scoring::win_score(4, 120));
    }

    #[test]
    fn test_charge_once_policy() {
        let config = TrainerConfig {
            hint_policy: HintPolicy::ChargeOnce,
            ..TrainerConfig::default()
        };
        let mut trainer = Trainer::new(RuleSet::default(), config);
        trainer.request_hint(1).unwrap();
        let again = trainer.request_hint(1).unwrap().to_string();
        assert!(!again.is_empty());
        assert_eq!(trainer.hints_consumed(), 1);

        trainer.set_candidate("abcde");
        trainer.request_hint(2).unwrap();
        assert_eq!(trainer.hints_consumed(), 2);
    }

    #[test]
    fn test_hint_after_finish_is_rejected() {
        let mut trainer = Trainer::default();
        trainer.set_candidate(WINNER);
        assert_matches!(trainer.request_hint(1), Err(HintRejected::SessionOver));
    }

    #[test]
    fn test_timeout_scores_opened_gates() {
        let mut trainer = Trainer::default();
        trainer.set_candidate("abcde1A");
        assert_eq!(trainer.active_rule_count(), 4);

        let mut result = None;
        for _ in 0..120 {
            result = trainer.tick().or(result);
        }
        let result = result.unwrap();
        assert_eq!(result.outcome, Outcome::TimedOut);
        assert_eq!(result.final_score, 30);
        assert_eq!(trainer.time_remaining(), 0);
    }

    #[test]
    fn test_tick_at_terminal_state_is_a_no_op() {
        let mut trainer = Trainer::new(
            RuleSet::default(),
            TrainerConfig {
                time_budget: 2,
                ..TrainerConfig::default()
            },
        );
        assert_eq!(trainer.tick(), None);
        assert!(trainer.tick().is_some());
        let before = trainer.result();

        assert_eq!(trainer.tick(), None);
        assert_eq!(trainer.time_remaining(), 0);
        assert_eq!(trainer.outcome(), Outcome::TimedOut);
        assert_eq!(trainer.result(), before);
    }

    #[test]
    fn test_win_uses_remaining_time() {
        let mut trainer = Trainer::default();
        for _ in 0..75 {
            trainer.tick();
        }
        let result = trainer.set_candidate(WINNER).unwrap();
        assert_eq!(result.final_score, 60 + 20 + 4);
    }

    #[test]
    fn test_start_resets_everything() {
        let mut trainer = Trainer::default();
        trainer.request_hint(1).unwrap();
        trainer.set_candidate(WINNER);
        trainer.start();

        assert_eq!(trainer.outcome(), Outcome::InProgress);
        assert_eq!(trainer.hints_consumed(), 0);
        assert_eq!(trainer.active_rule_count(), 1);
        assert_eq!(trainer.candidate(), "");
        assert_eq!(trainer.result(), None);
    }

    #[test]
    fn test_session_result_json_shape() {
        let result = SessionResult {
            final_score: 30,
            outcome: Outcome::TimedOut,
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json, serde_json::json!({"finalScore": 30, "outcome": "timed-out"}));
        assert_eq!(Outcome::TimedOut.to_string(), "timed-out");
    }
}

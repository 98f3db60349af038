//! Terminal score functions for the password game.
//!
//! Both are applied exactly once, at the transition out of
//! [`Outcome::InProgress`](crate::trainer::Outcome).

pub const WIN_BASE: u32 = 60;
pub const WIN_MAX: u32 = 100;
pub const HINT_BONUS: u32 = 20;
pub const HINT_PENALTY: u32 = 2;
pub const TIMEOUT_MAX: u32 = 50;
pub const POINTS_PER_GATE: u32 = 10;

/// `min(100, 60 + max(0, 20 - 2*hints) + floor(time_remaining / 10))`
pub fn win_score(hints_consumed: u32, time_remaining: u32) -> u32 {
    let hint_bonus = HINT_BONUS.saturating_sub(hints_consumed.saturating_mul(HINT_PENALTY));
    let time_bonus = time_remaining / 10;
    (WIN_BASE + hint_bonus + time_bonus).min(WIN_MAX)
}

/// Partial credit for the gates opened before time ran out.
pub fn timeout_score(active_rule_count: usize) -> u32 {
    let gates = active_rule_count.saturating_sub(1) as u32;
    gates.saturating_mul(POINTS_PER_GATE).min(TIMEOUT_MAX)
}

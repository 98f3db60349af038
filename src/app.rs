use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};

use crate::config::Config;
use crate::history::{HistoryEntry, SessionLog};
use crate::progress::{
    Achievement, Badge, GameInfo, ProgressRecord, PASSWORD_GAME, SHARE_SHIELD_GAME,
};
use crate::quiz::{Quiz, QuizRun, QuizStatus};
use crate::runtime::AppEvent;
use crate::shield::{Choice, Deck, Phase, ShareOrShield};
use crate::store::DefaultStore;
use crate::trainer::{SessionResult, Trainer};

/// The game hosted by the terminal front end.
#[derive(Debug)]
pub enum Game {
    Password(Trainer),
    Shield(ShareOrShield),
    Quiz(QuizRun),
}

impl Game {
    pub fn password(config: &Config) -> Self {
        Game::Password(Trainer::new(config.rule_set(), config.trainer_config()))
    }

    pub fn shield(deck: Deck) -> Self {
        Game::Shield(ShareOrShield::new(deck))
    }

    pub fn quiz(quiz: Quiz) -> Self {
        Game::Quiz(QuizRun::new(quiz))
    }

    pub fn title(&self) -> &str {
        match self {
            Game::Password(_) => PASSWORD_GAME.title,
            Game::Shield(_) => SHARE_SHIELD_GAME.title,
            Game::Quiz(run) => run.quiz().title.as_str(),
        }
    }

    /// Why `progress` does not allow starting this game yet.
    pub fn locked_reason(&self, progress: &ProgressRecord) -> Option<String> {
        let (what, required_level) = match self {
            Game::Password(_) => game_lock(&PASSWORD_GAME, progress)?,
            Game::Shield(_) => game_lock(&SHARE_SHIELD_GAME, progress)?,
            Game::Quiz(run) => {
                let quiz = run.quiz();
                if quiz.status(progress) != QuizStatus::Locked {
                    return None;
                }
                (format!("quiz '{}'", quiz.id), quiz.required_level)
            }
        };
        Some(format!(
            "{what} unlocks at level {required_level} (you are level {})",
            progress.level
        ))
    }

    fn restart(&mut self) {
        match self {
            Game::Password(trainer) => trainer.start(),
            Game::Shield(game) => game.restart(),
            Game::Quiz(run) => *run = QuizRun::new(run.quiz().clone()),
        }
    }
}

fn game_lock(game: &GameInfo, progress: &ProgressRecord) -> Option<(String, u32)> {
    (!progress.is_unlocked(game)).then(|| (game.title.to_string(), game.required_level))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Playing,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintPopup {
    pub rule_id: usize,
    pub text: String,
}

/// What the results screen shows about a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub outcome: String,
    pub score: u32,
    pub max_score: u32,
    pub new_badges: Vec<Badge>,
    /// False when progress could only be kept locally.
    pub saved: bool,
}

/// Where finished games are written: the progress store and the session log.
#[derive(Debug)]
pub struct Recorder {
    user_id: String,
    store: DefaultStore,
    log: Option<SessionLog>,
}

impl Recorder {
    pub fn new(user_id: impl Into<String>, store: DefaultStore, log: Option<SessionLog>) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            log,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &DefaultStore {
        &self.store
    }

    fn save(&self, record: &ProgressRecord) -> bool {
        self.store.save(&self.user_id, record)
    }

    /// Awards the badges `achievement` earns outside a game and stores them.
    /// Returns the new ones.
    pub fn award(&self, achievement: Achievement) -> Vec<Badge> {
        let mut record = self.store.load(&self.user_id).record;
        let new_badges = record.award_badges(Some(achievement));
        if !new_badges.is_empty() && !self.save(&record) {
            warn!(?new_badges, "badges only kept locally");
        }
        new_badges
    }

    fn append(&self, entry: HistoryEntry) {
        if let Some(log) = &self.log {
            if let Err(e) = log.append(&entry) {
                warn!(error = %e, "could not append to session log");
            }
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub game: Game,
    pub state: AppState,
    pub hint: Option<HintPopup>,
    /// One-line message shown under the game, e.g. a refused hint.
    pub notice: Option<String>,
    pub summary: Option<GameSummary>,
    pub progress: ProgressRecord,
    /// True when progress was loaded from the local copy.
    pub offline: bool,
    recorder: Recorder,
    should_quit: bool,
}

impl App {
    pub fn new(game: Game, recorder: Recorder) -> Self {
        let loaded = recorder.store.load(&recorder.user_id);
        Self {
            game,
            state: AppState::Playing,
            hint: None,
            notice: None,
            summary: None,
            progress: loaded.record,
            offline: loaded.from_cache,
            recorder,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.on_tick(),
            AppEvent::Key(key) => self.on_key(key),
            AppEvent::Resize => {}
        }
    }

    pub fn on_tick(&mut self) {
        if self.state != AppState::Playing {
            return;
        }
        match &mut self.game {
            Game::Password(trainer) => {
                if let Some(result) = trainer.tick() {
                    self.finish_password(result);
                }
            }
            Game::Shield(game) => {
                game.tick();
                if game.has_finished() {
                    let (score, max_score) = (game.score(), game.max_score());
                    let perfect = game.is_perfect();
                    self.finish_shield(score, max_score, perfect);
                }
            }
            Game::Quiz(_) => {}
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if key.code == KeyCode::Esc {
            if self.hint.take().is_none() {
                self.should_quit = true;
            }
            return;
        }

        match self.state {
            AppState::Playing => match self.game {
                Game::Password(_) => self.on_password_key(key),
                Game::Shield(_) => self.on_shield_key(key),
                Game::Quiz(_) => self.on_quiz_key(key),
            },
            AppState::Results => match key.code {
                KeyCode::Char('r') => self.restart(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
        }
    }

    pub fn restart(&mut self) {
        self.game.restart();
        self.state = AppState::Playing;
        self.hint = None;
        self.notice = None;
        self.summary = None;
    }

    fn on_password_key(&mut self, key: KeyEvent) {
        let Game::Password(trainer) = &mut self.game else {
            return;
        };
        let chord = key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
        let finished = match key.code {
            KeyCode::Char(_) if chord => None,
            KeyCode::Char(c) => {
                self.hint = None;
                self.notice = None;
                trainer.push_char(c)
            }
            KeyCode::Backspace => {
                self.notice = None;
                trainer.pop_char()
            }
            KeyCode::Tab => {
                let first_failing = trainer.failed_rules().first().map(|r| r.id);
                if let Some(rule_id) = first_failing {
                    self.request_hint(rule_id);
                }
                None
            }
            KeyCode::F(n) => {
                self.request_hint(n as usize);
                None
            }
            _ => None,
        };
        if let Some(result) = finished {
            self.finish_password(result);
        }
    }

    fn request_hint(&mut self, rule_id: usize) {
        let Game::Password(trainer) = &mut self.game else {
            return;
        };
        match trainer.request_hint(rule_id) {
            Ok(text) => {
                self.hint = Some(HintPopup {
                    rule_id,
                    text: text.to_string(),
                });
                self.notice = None;
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    fn on_shield_key(&mut self, key: KeyEvent) {
        let Game::Shield(game) = &mut self.game else {
            return;
        };
        let deciding = *game.phase() == Phase::Deciding;
        match (deciding, key.code) {
            (true, KeyCode::Left | KeyCode::Char('1')) => {
                game.choose(Choice::Share);
            }
            (true, KeyCode::Right | KeyCode::Char('2')) => {
                game.choose(Choice::Shield);
            }
            (false, KeyCode::Enter | KeyCode::Char(' ')) => {
                if let Some(score) = game.advance() {
                    let perfect = game.is_perfect();
                    let max_score = game.max_score();
                    self.finish_shield(score, max_score, perfect);
                }
            }
            _ => {}
        }
    }

    fn on_quiz_key(&mut self, key: KeyEvent) {
        let Game::Quiz(run) = &mut self.game else {
            return;
        };
        match key.code {
            KeyCode::Char(c @ '1'..='9') => {
                let option = c as usize - '1' as usize;
                run.answer(option);
            }
            KeyCode::Enter if run.selected().is_some() => {
                if !run.next() {
                    self.finish_quiz();
                }
            }
            _ => {}
        }
    }

    fn finish_password(&mut self, result: SessionResult) {
        let Game::Password(trainer) = &self.game else {
            return;
        };
        let entry = HistoryEntry {
            date: chrono::Local::now(),
            game: PASSWORD_GAME.id.to_string(),
            outcome: result.outcome.to_string(),
            score: result.final_score,
            hints: trainer.hints_consumed(),
            time_remaining: trainer.time_remaining(),
        };
        let achievement = (result.outcome == crate::trainer::Outcome::Won)
            .then_some(Achievement::PasswordGameWon);

        self.progress
            .record_game(PASSWORD_GAME.id, result.final_score);
        let new_badges = self.progress.award_badges(achievement);
        self.conclude(entry, PASSWORD_GAME.max_points, new_badges);
    }

    fn finish_shield(&mut self, score: u32, max_score: u32, perfect: bool) {
        let entry = HistoryEntry {
            date: chrono::Local::now(),
            game: SHARE_SHIELD_GAME.id.to_string(),
            outcome: if perfect { "perfect" } else { "finished" }.to_string(),
            score,
            hints: 0,
            time_remaining: 0,
        };
        self.progress.record_game(SHARE_SHIELD_GAME.id, score);
        let new_badges = self
            .progress
            .award_badges(perfect.then_some(Achievement::PerfectShareShield));
        self.conclude(entry, max_score, new_badges);
    }

    fn finish_quiz(&mut self) {
        let Game::Quiz(run) = &self.game else {
            return;
        };
        let outcome = run.finish();
        let quiz = run.quiz();
        let max_score = quiz.questions.iter().map(|q| q.points).sum();
        let entry = HistoryEntry {
            date: chrono::Local::now(),
            game: quiz.id.clone(),
            outcome: if outcome.passed { "passed" } else { "failed" }.to_string(),
            score: outcome.points,
            hints: 0,
            time_remaining: 0,
        };
        self.progress.record_quiz(quiz, &outcome);
        let new_badges = self.progress.award_badges(None);
        self.conclude(entry, max_score, new_badges);
    }

    fn conclude(&mut self, entry: HistoryEntry, max_score: u32, new_badges: Vec<Badge>) {
        let saved = self.recorder.save(&self.progress);
        info!(game = %entry.game, score = entry.score, saved, "game concluded");
        self.summary = Some(GameSummary {
            outcome: entry.outcome.clone(),
            score: entry.score,
            max_score,
            new_badges,
            saved,
        });
        self.recorder.append(entry);
        self.hint = None;
        self.state = AppState::Results;
    }
}

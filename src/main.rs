use std::{
    error::Error,
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
};

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use passfort::{
    app::{App, AppState, Game, Recorder},
    app_dirs::AppDirs,
    assistant::{reply_or_fallback, CannedResponder, OfflineGateway},
    config::{Config, ConfigError, ConfigStore, FileConfigStore},
    history::{HistoryEntry, SessionLog},
    progress::{Achievement, ProgressRecord, CURIOUS_QUESTIONS, GAMES},
    quiz::{self, Quiz, QuizStatus},
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    shield::Deck,
    store,
    trainer::HintPolicy,
    util::format_time,
};

/// password-building and online-safety games for young learners
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Password Fortress and friends: build a strong password rule by rule against the clock, decide what is safe to share online, and pass quiz missions to level up."
)]
pub struct Cli {
    /// seconds on the password game clock
    #[clap(short = 't', long, value_parser = clap::value_parser!(u32).range(1..))]
    time: Option<u32>,

    /// whether asking for the same hint twice costs twice
    #[clap(long, value_enum)]
    hints: Option<HintPolicy>,

    /// the year token the password must contain
    #[clap(long)]
    year: Option<String>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// play Password Fortress (default)
    Play,
    /// play Share or Shield
    Shield,
    /// take a quiz mission
    Quiz {
        /// quiz id, e.g. privacy-basics
        id: String,
    },
    /// show level, points, badges and missions
    Progress {
        /// print the raw progress record as JSON
        #[clap(long)]
        json: bool,
    },
    /// list finished games, newest first
    History,
    /// ask the safety helper a question
    Ask {
        #[clap(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// show a random online-safety tip
    Tip,
}

impl Cli {
    /// File settings with command-line flags layered on top.
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(time) = self.time {
            config.time_budget_secs = time;
        }
        if let Some(hints) = self.hints {
            config.hint_policy = hints;
        }
        if let Some(year) = &self.year {
            config.year_token = year.clone();
        }
        config
    }

    /// Like [`Cli::apply_to`], but a flag may not leave the config invalid.
    fn resolve(&self, config: Config) -> Result<Config, ConfigError> {
        let config = self.apply_to(config);
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing() {
    let Some(path) = AppDirs::trace_log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    // the terminal belongs to the TUI, so logs only go to the file
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let store = FileConfigStore::new();
    let mut config = store.load();
    if config.ensure_user_id() {
        if let Err(e) = store.save(&config) {
            warn!(error = %e, "could not persist new user id");
        }
    }
    match cli.resolve(config) {
        Ok(config) => config,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    }
}

/// Adds one to the stored question count and returns the new total. The
/// file config is reloaded so this run's flags are not written back.
fn count_question() -> u32 {
    let store = FileConfigStore::new();
    let mut config = store.load();
    let asked = config.record_question();
    if let Err(e) = store.save(&config) {
        warn!(error = %e, "could not persist question count");
    }
    asked
}

fn open_recorder(user_id: &str) -> Recorder {
    let db = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("progress.db"));
    let local =
        AppDirs::local_progress_path().unwrap_or_else(|| PathBuf::from("progress.json"));
    let log = AppDirs::history_path().map(SessionLog::with_path);
    Recorder::new(user_id, store::open_default(&db, &local), log)
}

fn status_label(status: QuizStatus) -> &'static str {
    match status {
        QuizStatus::Completed => "done",
        QuizStatus::Available => "open",
        QuizStatus::Locked => "lock",
    }
}

fn progress_report(record: &ProgressRecord, quizzes: &[Quiz]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Level {} ({} points, {} to next level)",
        record.level,
        record.total_points,
        record.points_to_next_level()
    );
    let badges = if record.badges.is_empty() {
        "none yet".to_string()
    } else {
        record.badges.join(", ")
    };
    let _ = writeln!(out, "Badges: {badges}");
    let _ = writeln!(out, "Games:");
    for game in GAMES {
        let mark = if record.has_completed_game(game.id) {
            "done"
        } else {
            "open"
        };
        let _ = writeln!(out, "  [{mark}] {} ({})", game.title, game.id);
    }
    let _ = writeln!(out, "Quizzes:");
    for quiz in quizzes {
        let status = quiz.status(record);
        let _ = write!(out, "  [{}] {} ({})", status_label(status), quiz.title, quiz.id);
        if status == QuizStatus::Locked {
            let _ = write!(out, " unlocks at level {}", quiz.required_level);
        }
        out.push('\n');
    }
    out
}

fn history_report(entries: &[HistoryEntry], best: &[(String, u32)]) -> String {
    if entries.is_empty() {
        return "No games played yet.\n".to_string();
    }
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(
            out,
            "{}  {:<20} {:<10} {:>3}  hints {:<2} left {}",
            e.date.format("%Y-%m-%d %H:%M"),
            e.game,
            e.outcome,
            e.score,
            e.hints,
            format_time(e.time_remaining)
        );
    }
    let _ = writeln!(out, "\nBest scores:");
    for (game, score) in best {
        let _ = writeln!(out, "  {game:<20} {score}");
    }
    out
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(&cli);
    let command = cli.command.clone().unwrap_or(Command::Play);
    info!(?command, user = config.user_id(), "starting");

    let game = match command {
        Command::Progress { json } => {
            let recorder = open_recorder(config.user_id());
            let record = recorder.store().load(recorder.user_id()).record;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print!("{}", progress_report(&record, &quiz::catalog()?));
            }
            return Ok(());
        }
        Command::History => {
            let log = SessionLog::with_path(
                AppDirs::history_path().unwrap_or_else(|| PathBuf::from("log.csv")),
            );
            print!("{}", history_report(&log.read()?, &log.best_scores()?));
            return Ok(());
        }
        Command::Ask { text } => {
            let canned = CannedResponder::embedded()?;
            println!(
                "{}",
                reply_or_fallback(&mut OfflineGateway, &canned, &text.join(" "))
            );
            let asked = count_question();
            if asked >= CURIOUS_QUESTIONS {
                let recorder = open_recorder(config.user_id());
                for badge in recorder.award(Achievement::QuestionsAsked(asked)) {
                    println!("\nNew badge: {} ({badge})", badge.title());
                }
            }
            return Ok(());
        }
        Command::Tip => {
            if let Some(tip) = CannedResponder::embedded()?.tip() {
                println!("{tip}");
            }
            return Ok(());
        }
        Command::Play => Game::password(&config),
        Command::Shield => Game::shield(Deck::embedded()?),
        Command::Quiz { id } => {
            let Some(quiz) = quiz::catalog()?.into_iter().find(|q| q.id == id) else {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::InvalidValue, format!("unknown quiz '{id}'"))
                    .exit();
            };
            Game::quiz(quiz)
        }
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = App::new(game, open_recorder(config.user_id()));
    if let Some(reason) = app.game.locked_reason(&app.progress) {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::InvalidValue, reason).exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::every_second());

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let was_playing = app.state == AppState::Playing;
        app.handle_event(runner.step());
        if app.should_quit() {
            break;
        }
        if !was_playing && app.state == AppState::Playing {
            // a restarted game gets a full first second
            runner.reset_ticks();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    #[test]
    fn test_defaults_to_play() {
        let cli = Cli::parse_from(["passfort"]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.time, None);
        assert_eq!(cli.hints, None);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "passfort",
            "--time",
            "90",
            "--hints",
            "charge-once",
            "--year",
            "2030",
            "play",
        ]);
        assert_eq!(cli.time, Some(90));
        assert_eq!(cli.hints, Some(HintPolicy::ChargeOnce));
        assert_eq!(cli.year.as_deref(), Some("2030"));
        assert_eq!(cli.command, Some(Command::Play));
    }

    #[test]
    fn test_zero_time_is_rejected() {
        assert!(Cli::try_parse_from(["passfort", "--time", "0"]).is_err());
    }

    #[test]
    fn test_subcommands() {
        let cli = Cli::parse_from(["passfort", "quiz", "privacy-basics"]);
        assert_eq!(
            cli.command,
            Some(Command::Quiz {
                id: "privacy-basics".into()
            })
        );

        let cli = Cli::parse_from(["passfort", "progress", "--json"]);
        assert_eq!(cli.command, Some(Command::Progress { json: true }));

        let cli = Cli::parse_from(["passfort", "ask", "what", "is", "a", "password"]);
        assert_eq!(
            cli.command,
            Some(Command::Ask {
                text: vec!["what".into(), "is".into(), "a".into(), "password".into()]
            })
        );
    }

    #[test]
    fn test_tip_subcommand() {
        let cli = Cli::parse_from(["passfort", "tip"]);
        assert_eq!(cli.command, Some(Command::Tip));
    }

    #[test]
    fn test_ask_needs_text() {
        assert!(Cli::try_parse_from(["passfort", "ask"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["passfort", "--time", "45"]);
        let file = Config {
            year_token: "2024".into(),
            ..Config::default()
        };
        let merged = cli.apply_to(file);
        assert_eq!(merged.time_budget_secs, 45);
        assert_eq!(merged.year_token, "2024");
        assert_eq!(merged.hint_policy, HintPolicy::Repeatable);
    }

    #[test]
    fn test_flags_cannot_break_the_year_rule() {
        for year in ["", "  ", "password", "myPassWord1"] {
            let cli = Cli::parse_from(["passfort", "--year", year]);
            assert!(cli.resolve(Config::default()).is_err(), "{year:?}");
        }

        let cli = Cli::parse_from(["passfort", "--year", "2031"]);
        let config = cli.resolve(Config::default()).unwrap();
        assert_eq!(config.year_token, "2031");
    }

    #[test]
    fn test_progress_report() {
        let record = ProgressRecord {
            completed_games: vec!["password-game".into()],
            badges: vec!["password-pro".into()],
            ..ProgressRecord::default()
        };
        let report = progress_report(&record, &quiz::catalog().unwrap());
        assert!(report.starts_with("Level 1 (0 points, 200 to next level)"));
        assert!(report.contains("Badges: password-pro"));
        assert!(report.contains("[done] Password Fortress"));
        assert!(report.contains("[open] Share or Shield"));
        assert!(report.contains("(privacy-basics)"));
        assert!(report.contains("unlocks at level 2"));
    }

    #[test]
    fn test_history_report() {
        assert_eq!(history_report(&[], &[]), "No games played yet.\n");

        let entries = vec![HistoryEntry {
            date: Local::now(),
            game: "password-game".into(),
            outcome: "won".into(),
            score: 88,
            hints: 1,
            time_remaining: 65,
        }];
        let report = history_report(&entries, &[("password-game".into(), 88)]);
        assert!(report.contains("left 01:05"));
        assert!(report.contains("Best scores:"));
    }
}

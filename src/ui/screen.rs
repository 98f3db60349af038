use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Gauge, Paragraph, Widget, Wrap},
};

use super::{bold, countdown, dim, header_line, help_line, HORIZONTAL_MARGIN, VERTICAL_MARGIN};
use crate::app::{App, AppState, Game};
use crate::shield::{Phase, Verdict};

/// A UI Screen boundary: renders one state of the app
pub trait Screen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

fn offline_marker<'a>(app: &App) -> Vec<Span<'a>> {
    if app.offline {
        vec![Span::styled("offline  ", dim().fg(Color::Yellow))]
    } else {
        Vec::new()
    }
}

/// Password Fortress: candidate input, revealed rules, countdown
pub struct PasswordScreen;

impl Screen for PasswordScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let Game::Password(trainer) = &app.game else {
            return;
        };
        let [header, gauge, input, rules, notice, help] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .spacing(1)
        .areas(area);

        let mut right = offline_marker(app);
        right.push(countdown(trainer.time_remaining()));
        header_line(app.game.title(), right, header.width).render(header, buf);

        Gauge::default()
            .gauge_style(Style::default().fg(Color::Green))
            .percent(trainer.progress_percent().min(100) as u16)
            .label(format!(
                "{} of {} rules cleared",
                trainer.gates_passed(),
                trainer.rules().len()
            ))
            .render(gauge, buf);

        let char_count = trainer.candidate().chars().count();
        Paragraph::new(Line::from(vec![
            Span::styled(trainer.candidate(), bold()),
            Span::styled("▏", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]))
        .block(Block::bordered().title(format!(" Your password ({char_count} characters) ")))
        .render(input, buf);

        // newest rule first so it stays visible when the list is long
        let latest = trainer.active_rule_count();
        let lines: Vec<Line> = trainer
            .active_rules()
            .iter()
            .rev()
            .map(|rule| {
                let passes = rule.passes(trainer.candidate());
                let (mark, color) = if passes {
                    ("✓", Color::Green)
                } else {
                    ("✗", Color::Red)
                };
                let mut style = Style::default().fg(color);
                if rule.id == latest {
                    style = style.add_modifier(Modifier::BOLD);
                }
                Line::from(vec![
                    Span::styled(format!("{mark} Rule {}: ", rule.id), style),
                    Span::styled(rule.description.as_str(), style),
                ])
            })
            .collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(rules, buf);

        if let Some(text) = &app.notice {
            Paragraph::new(Span::styled(
                text.as_str(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .render(notice, buf);
        }

        help_line(&[
            ("type", "to build"),
            ("Tab", "hint"),
            ("F1-F10", "hint for rule"),
            ("Esc", "quit"),
        ])
        .render(help, buf);
    }
}

/// Share or Shield: one card at a time
pub struct ShieldScreen;

impl Screen for ShieldScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let Game::Shield(game) = &app.game else {
            return;
        };
        let [header, card, verdict, help] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .spacing(1)
        .areas(area);

        let mut right = offline_marker(app);
        right.push(Span::styled(
            format!(
                "Card {}/{}  Score {}  ",
                game.card_index() + 1,
                game.card_count(),
                game.score()
            ),
            dim(),
        ));
        right.push(countdown(game.time_remaining()));
        header_line(app.game.title(), right, header.width).render(header, buf);

        if let Some(current) = game.current_card() {
            let [_, middle, _] = Layout::vertical([
                Constraint::Fill(1),
                Constraint::Length(3),
                Constraint::Fill(1),
            ])
            .areas(card);
            Paragraph::new(Span::styled(current.info.as_str(), bold()))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::bordered().title(" Would you share this online? "))
                .render(middle, buf);
        }

        let lines = match game.phase() {
            Phase::Deciding => vec![Line::from(vec![
                Span::styled("← Share it", bold().fg(Color::Green)),
                Span::raw("        "),
                Span::styled("Shield it →", bold().fg(Color::Blue)),
            ])],
            Phase::Feedback(feedback) => {
                let (text, color) = match feedback.verdict {
                    Verdict::Correct => ("Correct! +8", Color::Green),
                    Verdict::Incorrect => ("Not quite!", Color::Red),
                    Verdict::OutOfTime => ("Out of time!", Color::Yellow),
                };
                vec![
                    Line::from(Span::styled(text, bold().fg(color))),
                    Line::from(feedback.explanation.as_str()),
                ]
            }
            Phase::Finished => Vec::new(),
        };
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(verdict, buf);

        let keys: &[(&str, &str)] = match game.phase() {
            Phase::Deciding => &[("←/1", "share"), ("→/2", "shield"), ("Esc", "quit")],
            _ => &[("Enter", "next card"), ("Esc", "quit")],
        };
        help_line(keys).render(help, buf);
    }
}

/// Quiz mission: one multiple-choice question at a time
pub struct QuizScreen;

impl Screen for QuizScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let Game::Quiz(run) = &app.game else {
            return;
        };
        let Some(question) = run.current_question() else {
            return;
        };
        let [header, body, help] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .spacing(1)
        .areas(area);

        let quiz = run.quiz();
        let mut right = offline_marker(app);
        right.push(Span::styled(
            format!(
                "{} correct, need {}  ",
                run.correct_so_far(),
                quiz.answers_needed()
            ),
            dim(),
        ));
        right.push(Span::styled(
            format!(
                "Question {}/{}",
                run.question_index() + 1,
                quiz.questions.len()
            ),
            dim(),
        ));
        header_line(app.game.title(), right, header.width).render(header, buf);

        let mut text = Text::from(Line::from(Span::styled(question.question.as_str(), bold())));
        text.push_line(Line::default());
        for (i, option) in question.options.iter().enumerate() {
            let style = match run.selected() {
                Some(_) if i == question.correct_answer => Style::default().fg(Color::Green),
                Some(picked) if picked == i => Style::default().fg(Color::Red),
                Some(_) => dim(),
                None => Style::default(),
            };
            text.push_line(Line::styled(format!("  {}. {option}", i + 1), style));
        }
        if run.selected().is_some() {
            text.push_line(Line::default());
            text.push_line(Line::styled(
                question.explanation.as_str(),
                Style::default().add_modifier(Modifier::ITALIC),
            ));
        }
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .render(body, buf);

        let keys: &[(&str, &str)] = if run.selected().is_none() {
            &[("1-4", "answer"), ("Esc", "quit")]
        } else if run.is_last() {
            &[("Enter", "finish"), ("Esc", "quit")]
        } else {
            &[("Enter", "next question"), ("Esc", "quit")]
        };
        help_line(keys).render(help, buf);
    }
}

/// Summary after any game
pub struct ResultsScreen;

impl ResultsScreen {
    fn headline(outcome: &str) -> (&'static str, Color) {
        match outcome {
            "won" => ("🏰 Fortress complete!", Color::Green),
            "timed-out" => ("⏰ Time's up!", Color::Yellow),
            "perfect" => ("🛡 Perfect round!", Color::Green),
            "passed" => ("🎉 Mission passed!", Color::Green),
            "failed" => ("Not this time, try again!", Color::Yellow),
            _ => ("Round finished!", Color::Cyan),
        }
    }
}

impl Screen for ResultsScreen {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        let Some(summary) = &app.summary else {
            return;
        };
        let [body, help] = Layout::vertical([Constraint::Min(5), Constraint::Length(1)])
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .areas(area);

        let (headline, color) = Self::headline(&summary.outcome);
        let progress = &app.progress;
        let mut lines = vec![
            Line::from(Span::styled(headline, bold().fg(color))),
            Line::default(),
            Line::from(vec![
                Span::styled("Score ", dim()),
                Span::styled(format!("{} / {}", summary.score, summary.max_score), bold()),
            ]),
            Line::from(vec![
                Span::styled("Level ", dim()),
                Span::styled(progress.level.to_string(), bold()),
                Span::styled(
                    format!(
                        "  {} points, {} to next level",
                        progress.total_points,
                        progress.points_to_next_level()
                    ),
                    dim(),
                ),
            ]),
        ];
        if !summary.new_badges.is_empty() {
            lines.push(Line::default());
            for badge in &summary.new_badges {
                lines.push(Line::styled(
                    format!("🏅 New badge: {}", badge.title()),
                    bold().fg(Color::Yellow),
                ));
            }
        }
        if !summary.saved {
            lines.push(Line::default());
            lines.push(Line::styled(
                "Progress saved on this device only",
                dim().fg(Color::Yellow),
            ));
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(format!(" {} ", app.game.title())))
            .render(body, buf);

        help_line(&[("r", "play again"), ("q", "quit")]).render(help, buf);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(app: &App) -> Box<dyn Screen> {
    match (&app.state, &app.game) {
        (AppState::Results, _) => Box::new(ResultsScreen),
        (AppState::Playing, Game::Password(_)) => Box::new(PasswordScreen),
        (AppState::Playing, Game::Shield(_)) => Box::new(ShieldScreen),
        (AppState::Playing, Game::Quiz(_)) => Box::new(QuizScreen),
    }
}

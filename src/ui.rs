use itertools::{EitherOrBoth, Itertools};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Gauge, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use keypace::{config::Theme, session::Phase};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

struct Palette {
    bg: Color,
    fg: Color,
    dim: Color,
    correct: Color,
    incorrect: Color,
    accent: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg: Color::Reset,
                fg: Color::White,
                dim: Color::DarkGray,
                correct: Color::Green,
                incorrect: Color::Red,
                accent: Color::Magenta,
            },
            Theme::Light => Self {
                bg: Color::White,
                fg: Color::Black,
                dim: Color::Gray,
                correct: Color::Rgb(0, 128, 0),
                incorrect: Color::Rgb(200, 0, 0),
                accent: Color::Blue,
            },
        }
    }
}

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let palette = Palette::for_theme(self.theme);
        let snapshot = self.controller.snapshot();

        let base = Style::default().bg(palette.bg).fg(palette.fg);
        Block::default().style(base).render(area, buf);

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().fg(palette.dim);

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let prompt_lines = ((snapshot.reference_text.width() as f64 / max_chars_per_line as f64)
            .ceil() as u16)
            .max(1)
            + 1;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),            // stats
                Constraint::Length(1),            // countdown gauge
                Constraint::Length(1),            // padding
                Constraint::Length(prompt_lines), // passage
                Constraint::Length(1),            // results
                Constraint::Min(0),
                Constraint::Length(1), // keys
            ])
            .split(area);

        // stats
        let best_style = if self.pulse % 5 >= 2 {
            bold.fg(palette.accent).add_modifier(Modifier::REVERSED)
        } else {
            bold.fg(palette.accent)
        };
        let stats = Line::from(vec![
            Span::styled("time ", dim),
            Span::styled(format!("{}s", snapshot.duration_remaining), bold),
            Span::styled("   wpm ", dim),
            Span::styled(snapshot.wpm.to_string(), bold),
            Span::styled("   accuracy ", dim),
            Span::styled(format!("{}%", snapshot.accuracy), bold),
            Span::styled("   best ", dim),
            Span::styled(snapshot.best_wpm.to_string(), best_style),
        ]);
        Paragraph::new(stats)
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        Gauge::default()
            .gauge_style(Style::default().fg(palette.accent).bg(palette.bg))
            .ratio(snapshot.progress.clamp(0.0, 1.0))
            .label(Span::styled(
                format!("{} / {}s", snapshot.duration_remaining, snapshot.duration_total),
                Style::default().fg(palette.fg),
            ))
            .render(chunks[1], buf);

        // passage
        let correct = bold.fg(palette.correct);
        let incorrect = bold.fg(palette.incorrect);
        let untyped = bold.fg(palette.dim);
        let cursor_pos = snapshot.typed_text.chars().count();
        let show_cursor = snapshot.phase == Phase::Running;

        let spans = snapshot
            .reference_text
            .chars()
            .zip_longest(snapshot.typed_text.chars())
            .enumerate()
            .map(|(idx, pair)| match pair {
                EitherOrBoth::Both(expected, typed) if expected == typed => {
                    Span::styled(expected.to_string(), correct)
                }
                EitherOrBoth::Both(_, typed) | EitherOrBoth::Right(typed) => {
                    Span::styled(visible(typed), incorrect)
                }
                EitherOrBoth::Left(expected) if show_cursor && idx == cursor_pos => {
                    Span::styled(
                        expected.to_string(),
                        untyped.add_modifier(Modifier::UNDERLINED),
                    )
                }
                EitherOrBoth::Left(expected) => Span::styled(expected.to_string(), untyped),
            })
            .collect::<Vec<Span>>();

        Paragraph::new(Line::from(spans))
            .alignment(if prompt_lines <= 2 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);

        if let Some(report) = self.last_report {
            let mut spans = vec![
                Span::styled(format!("{} wpm", report.wpm), bold.fg(palette.accent)),
                Span::styled(
                    format!(
                        " · {}% accuracy · {} words in {}s",
                        report.accuracy, report.words, report.elapsed_secs
                    ),
                    Style::default().fg(palette.fg),
                ),
            ];
            if self.new_best {
                spans.push(Span::styled("  new best!", best_style));
            }
            Paragraph::new(Line::from(spans))
                .alignment(Alignment::Center)
                .render(chunks[4], buf);
        }

        Paragraph::new(Span::styled(
            key_help(snapshot.phase),
            dim.add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
    }
}

fn visible(c: char) -> String {
    match c {
        ' ' => "·".to_owned(),
        c => c.to_string(),
    }
}

fn key_help(phase: Phase) -> String {
    let keys: &[(&str, &str)] = match phase {
        Phase::Idle | Phase::Ready => &[
            ("enter", "start"),
            ("tab", "duration"),
            ("ctrl+t", "theme"),
            ("ctrl+c", "quit"),
        ],
        Phase::Running => &[
            ("esc", "restart"),
            ("ctrl+w", "delete word"),
            ("ctrl+c", "quit"),
        ],
        Phase::Ended => &[
            ("enter", "new passage"),
            ("tab", "duration"),
            ("ctrl+t", "theme"),
            ("ctrl+c", "quit"),
        ],
    };
    keys.iter()
        .map(|(key, action)| format!("({key}) {action}"))
        .join("  ")
}

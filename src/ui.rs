//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use std::time::{Duration, Instant};

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::App;
use crate::config::UiSettings;
use crate::library::format_duration;
use crate::player::{PlayerState, VolumeTier};

const CONTROLS: &[(&str, &str)] = &[
    ("j/k", "up/down"),
    ("h/l", "prev/next song"),
    ("enter", "play selected song"),
    ("space/p", "play/pause"),
    ("+/-", "volume"),
    ("m", "mute"),
    ("gg/G", "top/bottom"),
    ("/", "search"),
    ("v", "switch view"),
    ("s", "shuffle"),
    ("r", "repeat"),
    ("R", "reload"),
    ("q", "quit"),
];

/// Render the controls help text, incorporating the scrub step.
fn controls_text(scrub_fraction: f64) -> String {
    let mut parts: Vec<String> = CONTROLS
        .iter()
        .map(|(k, v)| format!("[{k}] {v}"))
        .collect();
    let pct = (scrub_fraction * 100.0).round() as u32;
    parts.insert(2, format!("[H/L] scrub -/+{pct}%"));
    parts.join(" | ")
}

fn secs(s: f64) -> Duration {
    Duration::try_from_secs_f64(s.max(0.0)).unwrap_or_default()
}

/// `m:ss / m:ss`, or just the elapsed part when the duration is unknown.
fn time_text(elapsed: f64, duration: Option<f64>) -> String {
    match duration {
        Some(d) => format!("{} / {}", format_duration(secs(elapsed)), format_duration(secs(d))),
        None => format_duration(secs(elapsed)),
    }
}

fn phase_text(app: &App) -> &'static str {
    match app.phase {
        PlayerState::Idle => "Stopped",
        PlayerState::Loading => "Loading",
        PlayerState::Playing => "Playing",
        PlayerState::Paused => "Paused",
    }
}

fn volume_text(app: &App) -> String {
    let tier = match app.volume_tier {
        VolumeTier::Muted => "muted",
        VolumeTier::Low => "low",
        VolumeTier::Full => "full",
    };
    format!("Vol: {:.0}% ({tier})", app.volume * 100.0)
}

fn status_text(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();

    if app.follow_playback {
        parts.push(" CURSOR: Follow".to_string());
    } else {
        parts.push(" CURSOR: Free-roam".to_string());
    }

    parts.push(format!("REPEAT: {}", app.repeat.label()));
    parts.push(format!("VIEW: {}", app.view.label()));

    let q = app.search_query.trim();
    if app.search_mode || !q.is_empty() {
        let mut search_part = String::from("SEARCH:");
        if !q.is_empty() {
            search_part.push(' ');
            search_part.push_str(q);
        }
        parts.push(search_part);
    }

    match &app.now_playing {
        Some(track) => {
            parts.push(format!(
                "Song: {} [{}]",
                track.display,
                time_text(app.elapsed, app.duration)
            ));
            parts.push(phase_text(app).to_string());
        }
        None => parts.push("Stopped".to_string()),
    }

    parts.push(volume_text(app));

    if app.shuffle {
        parts.push("Shuffle: ON".to_string());
    } else {
        parts.push("Shuffle: OFF".to_string());
    }

    if app.catalog_busy {
        parts.push(format!("Catalog: {} (loading)", app.catalog_label));
    } else {
        parts.push(format!("Catalog: {}", app.catalog_label));
    }

    parts.join(" • ")
}

/// Render the entire UI into the provided `frame`.
pub fn draw(frame: &mut Frame, app: &App, ui_settings: &UiSettings, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" encore ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let mut status_lines = vec![Line::from(status_text(app))];
    if let Some(err) = app.error_line(now) {
        status_lines.push(Line::styled(
            format!(" ! {err}"),
            Style::default().fg(Color::Red),
        ));
    }
    let status_par = Paragraph::new(status_lines)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" progress "))
        .gauge_style(Style::default().add_modifier(Modifier::BOLD))
        .ratio(app.progress.clamp(0.0, 1.0))
        .label(time_text(app.elapsed, app.duration));
    frame.render_widget(gauge, chunks[2]);

    // Main list
    {
        // Only build ListItems for the visible window, centered on the selection.
        let total = app.tracks.len();
        let list_height = chunks[3].height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = app.tracks[start..end]
            .iter()
            .enumerate()
            .map(|(offset, track)| {
                let item = ListItem::new(track.display.as_str());
                if app.current_index == Some(start + offset) {
                    item.style(Style::default().add_modifier(Modifier::BOLD))
                } else {
                    item
                }
            })
            .collect();

        let title = if app.catalog_busy {
            format!(" {} (loading…) ", app.view.label().to_lowercase())
        } else {
            format!(" {} ({total}) ", app.view.label().to_lowercase())
        };
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[3], &mut state);
    }

    let footer_text = if app.search_mode {
        format!(
            "/{}_   [enter] keep results | [esc] clear | [ctrl-j/k] move",
            app.search_query
        )
    } else {
        controls_text(ui_settings.scrub_fraction)
    };
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_text_includes_scrub_percentage() {
        let text = controls_text(0.05);
        assert!(text.contains("[H/L] scrub -/+5%"));
        assert!(text.starts_with("[j/k] up/down | [h/l] prev/next song | [H/L]"));
        assert!(text.contains("[v] switch view"));
    }

    #[test]
    fn time_text_handles_unknown_duration() {
        assert_eq!(time_text(75.4, Some(200.0)), "1:15 / 3:20");
        assert_eq!(time_text(5.0, None), "0:05");
        assert_eq!(time_text(f64::NAN, None), "0:00");
    }
}

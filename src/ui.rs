use crate::app::{App, ViewMode};
use crate::models::{PokemonDetail, PokemonType};
use crate::storage::KeyValueStore;
use crate::utils::{format_height, format_name, format_weight, text_to_lines};
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Span, Spans};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;

pub fn draw_ui<B: Backend, S: KeyValueStore>(
    terminal: &mut Terminal<B>,
    app: &App<S>,
) -> io::Result<()> {
    terminal.draw(|f| render(f, app)).map(|_| ())
}

fn render<B: Backend, S: KeyValueStore>(f: &mut Frame<B>, app: &App<S>) {
    let size = f.size();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(size);

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(chunks[0]);

    render_list(f, app, left_chunks[0]);
    render_search(f, app, left_chunks[1]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(3)])
        .split(chunks[1]);
    render_detail(f, app, right_chunks[0]);
    render_status(f, app, right_chunks[1]);

    if app.show_help {
        render_help(f, size);
    }
}

fn render_list<B: Backend, S: KeyValueStore>(f: &mut Frame<B>, app: &App<S>, area: Rect) {
    let visible = app.visible();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|p| {
            let star = if p.is_favorite { "★" } else { " " };
            ListItem::new(vec![Spans::from(vec![
                Span::styled(star, Style::default().fg(Color::Yellow)),
                Span::raw(format!(" #{} {}", p.id, format_name(&p.name))),
            ])])
        })
        .collect();

    let title = match app.view {
        ViewMode::Favorites => format!("Favorites ({})", app.favorites.snapshot().ids.len()),
        ViewMode::All if app.is_searching() => format!("Results for \"{}\"", app.active_query()),
        ViewMode::All => {
            let more = if app.has_next_page() { "  [n] more" } else { "" };
            format!("Pokémon {}/{}{}", visible.len(), app.total_count(), more)
        }
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !visible.is_empty() {
        state.select(Some(app.selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn render_search<B: Backend, S: KeyValueStore>(f: &mut Frame<B>, app: &App<S>, area: Rect) {
    let text = if app.search_mode {
        format!("/{}", app.search_input)
    } else if app.search_input.is_empty() {
        "Press '/' to search by name.".to_string()
    } else {
        format!("{}  (Esc in search to clear)", app.search_input)
    };
    let title = if app.searching { "Search (searching...)" } else { "Search" };
    let para = Paragraph::new(vec![Spans::from(Span::raw(text))])
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(para, area);
}

fn type_badges(types: &[PokemonType]) -> Vec<Span<'static>> {
    let mut spans = vec![Span::raw("Types: ")];
    for (i, t) in types.iter().enumerate() {
        let (r, g, b) = t.color;
        // choose contrasting foreground (black or white)
        let lum = 0.2126 * (r as f32) + 0.7152 * (g as f32) + 0.0722 * (b as f32);
        let fg = if lum > 160.0 { Color::Black } else { Color::White };
        spans.push(Span::styled(
            format!(" {} ", format_name(&t.name)),
            Style::default().fg(fg).bg(Color::Rgb(r, g, b)),
        ));
        if i + 1 < types.len() {
            spans.push(Span::raw(" "));
        }
    }
    spans
}

fn render_detail<B: Backend, S: KeyValueStore>(f: &mut Frame<B>, app: &App<S>, area: Rect) {
    let Some(p) = &app.detail else {
        let msg = if app.loading_detail {
            "Loading..."
        } else if app.visible().is_empty() {
            "Nothing to show"
        } else {
            "Press Enter to view details"
        };
        f.render_widget(
            Paragraph::new(msg).block(Block::default().borders(Borders::ALL).title("Details")),
            area,
        );
        return;
    };

    let detail_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(6)])
        .split(area);
    render_info(f, p, detail_chunks[0]);

    let bottom_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(10)])
        .split(detail_chunks[1]);
    render_stats(f, p, bottom_chunks[0]);

    let mut right_text: Vec<Spans> = Vec::new();
    match &app.species {
        Some(species) => {
            if let Some(genus) = &species.genus {
                right_text.push(Spans::from(Span::styled(
                    genus.clone(),
                    Style::default().add_modifier(Modifier::ITALIC),
                )));
            }
            if let Some(habitat) = &species.habitat {
                right_text.push(Spans::from(Span::raw(format!("Habitat: {}", format_name(habitat)))));
            }
            right_text.push(Spans::from(Span::raw("")));
            let width = bottom_chunks[1].width.saturating_sub(2).max(10) as usize;
            for line in text_to_lines(&species.description, width) {
                right_text.push(Spans::from(Span::raw(line)));
            }
        }
        None => right_text.push(Spans::from(Span::raw("Loading description..."))),
    }
    let right_para = Paragraph::new(right_text)
        .block(Block::default().borders(Borders::ALL).title("Description"))
        .wrap(Wrap { trim: true });
    f.render_widget(right_para, bottom_chunks[1]);
}

fn render_info<B: Backend>(f: &mut Frame<B>, p: &PokemonDetail, area: Rect) {
    let star = if p.is_favorite { " ★" } else { "" };
    let mut info_lines: Vec<Spans> = vec![
        Spans::from(Span::styled(
            format!("{} (#{}){}", format_name(&p.name), p.id, star),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Spans::from(type_badges(&p.types)),
    ];
    if !p.abilities.is_empty() {
        let abilities: Vec<String> = p
            .abilities
            .iter()
            .map(|a| {
                if a.is_hidden {
                    format!("{} (hidden)", a.display_name)
                } else {
                    a.display_name.clone()
                }
            })
            .collect();
        info_lines.push(Spans::from(Span::raw(format!(
            "Abilities: {}",
            abilities.join(", ")
        ))));
    }
    info_lines.push(Spans::from(Span::raw(format!(
        "Height: {}  Weight: {}  Base EXP: {}",
        format_height(p.height),
        format_weight(p.weight),
        p.base_experience
    ))));
    info_lines.push(Spans::from(Span::styled(
        p.image_url.clone(),
        Style::default().fg(Color::DarkGray),
    )));
    let info_para = Paragraph::new(info_lines)
        .block(Block::default().borders(Borders::ALL).title("Info"))
        .wrap(Wrap { trim: true });
    f.render_widget(info_para, area);
}

fn render_stats<B: Backend>(f: &mut Frame<B>, p: &PokemonDetail, area: Rect) {
    // NAME (padded) | VALUE | [bar...], scaled to each stat's own maximum.
    let inner_w = area.width.saturating_sub(2) as usize;
    let name_w = 8usize;
    let val_w = 4usize;
    let bar_max_w = inner_w.saturating_sub(name_w + val_w + 2);

    let stat_lines: Vec<Spans> = p
        .stats
        .iter()
        .map(|st| {
            let max = st.max_value.max(1) as f32;
            let ratio = (st.value as f32 / max).min(1.0);
            let bar = "█".repeat((ratio * bar_max_w as f32).round() as usize);
            Spans::from(Span::raw(format!(
                "{:<name_w$} {:>val_w$} {}",
                st.display_name,
                st.value,
                bar,
                name_w = name_w,
                val_w = val_w
            )))
        })
        .collect();

    let stats_para =
        Paragraph::new(stat_lines).block(Block::default().borders(Borders::ALL).title("Stats"));
    f.render_widget(stats_para, area);
}

fn render_status<B: Backend, S: KeyValueStore>(f: &mut Frame<B>, app: &App<S>, area: Rect) {
    let (text, style) = if let Some(err) = &app.last_error {
        (format!("{}  [r] retry", err), Style::default().fg(Color::Red))
    } else if app.loading_list || app.loading_more || app.loading_favorites {
        ("Loading...".to_string(), Style::default().fg(Color::Green))
    } else {
        (
            "[h] help  [f] favorite  [v] favorites view  [q] quit".to_string(),
            Style::default(),
        )
    };
    let para = Paragraph::new(Spans::from(Span::styled(text, style)))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(para, area);
}

fn render_help<B: Backend>(f: &mut Frame<B>, area: Rect) {
    // helper to compute a centered rect for popups
    fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
        let popup_w = r.width.saturating_mul(percent_x) / 100;
        let popup_h = r.height.saturating_mul(percent_y) / 100;
        let popup_x = r.x + (r.width.saturating_sub(popup_w) / 2);
        let popup_y = r.y + (r.height.saturating_sub(popup_h) / 2);
        Rect::new(popup_x, popup_y, popup_w, popup_h)
    }
    let popup = centered_rect(60, 50, area);
    let help_lines: Vec<Spans> = [
        "q          Quit",
        "/          Enter search mode",
        "Enter      Apply search / open details",
        "Esc        Clear search or close details",
        "Up/Down    Navigate list",
        "n          Load more",
        "f          Toggle favorite",
        "v          Switch between all and favorites",
        "r          Refresh or retry",
        "h          Toggle this help",
    ]
    .iter()
    .map(|l| Spans::from(Span::raw(*l)))
    .collect();

    let mut lines = vec![
        Spans::from(Span::styled(
            "Keybindings",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Spans::from(Span::raw("")),
    ];
    lines.extend(help_lines);

    f.render_widget(ratatui::widgets::Clear, popup);
    let help_para = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_para, popup);
}

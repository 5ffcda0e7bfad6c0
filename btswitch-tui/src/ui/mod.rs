/*!
 * bt-switch TUI Interface
 */

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, Form, Tab};

// Conservative color palette
const BLUE: Color = Color::Rgb(100, 149, 237);
const GRAY: Color = Color::Rgb(128, 128, 128);
const WHITE: Color = Color::Rgb(255, 255, 255);
const GREEN: Color = Color::Rgb(34, 139, 34);
const RED: Color = Color::Rgb(220, 20, 60);

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(8),    // Body
            Constraint::Length(1), // Key help
        ])
        .split(f.area());

    render_tabs(f, chunks[0], app);
    match app.tab {
        Tab::Dashboard => render_dashboard(f, chunks[1], app),
        _ => render_config_tab(f, chunks[1], app),
    }
    render_help(f, chunks[2], app);

    if let Some(form) = &app.form {
        render_form(f, form);
    }
}

fn render_tabs(f: &mut Frame, area: Rect, app: &App) {
    let titles: Vec<&str> = Tab::ALL.iter().map(Tab::title).collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .style(Style::default().fg(GRAY))
        .highlight_style(Style::default().fg(BLUE).add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("bt-switch @ {}", app.hostname))
                .border_style(Style::default().fg(BLUE)),
        );
    f.render_widget(tabs, area);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_device_picker(f, columns[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(4)])
        .split(columns[1]);

    render_status(f, right[0], app);
    render_log(f, right[1], app);
}

fn render_device_picker(f: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .config
        .devices
        .iter()
        .enumerate()
        .map(|(i, (alias, device))| {
            let checked = app.selected.contains(alias);
            let (mark, mark_color) = if checked { ("[x]", GREEN) } else { ("[ ]", GRAY) };
            let prefix = if i == app.cursor { "▶ " } else { "  " };

            let content = Line::from(vec![
                Span::raw(prefix),
                Span::styled(mark, Style::default().fg(mark_color)),
                Span::raw(" "),
                Span::styled(device.name.as_str(), Style::default().fg(WHITE)),
                Span::styled(format!("  {}", device.mac), Style::default().fg(GRAY)),
            ]);

            if i == app.cursor {
                ListItem::new(content).style(Style::default().bg(BLUE).fg(WHITE))
            } else {
                ListItem::new(content)
            }
        })
        .collect();

    let title = match &app.group {
        Some(group) => format!("Devices (group: {group})"),
        None => "Devices".to_string(),
    };

    if items.is_empty() {
        let paragraph = Paragraph::new("No devices configured")
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(BLUE)),
            )
            .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(BLUE)),
    );
    f.render_widget(list, area);
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let target = match app.target.as_deref() {
        Some(alias) => {
            let address = app
                .config
                .hosts
                .get(alias)
                .map(|h| h.destination())
                .unwrap_or_default();
            Span::styled(format!("{alias} ({address})"), Style::default().fg(WHITE))
        }
        None => Span::styled("none", Style::default().fg(RED)),
    };

    let (state, state_color) = if app.is_busy() {
        ("Running", BLUE)
    } else {
        ("Idle", GREEN)
    };

    let lines = vec![
        Line::from(vec![Span::styled("Target: ", Style::default().fg(GRAY)), target]),
        Line::from(vec![
            Span::styled("Group: ", Style::default().fg(GRAY)),
            Span::styled(
                app.group.as_deref().unwrap_or("-"),
                Style::default().fg(WHITE),
            ),
        ]),
        Line::from(vec![
            Span::styled("Selected: ", Style::default().fg(GRAY)),
            Span::styled(
                app.selected.len().to_string(),
                Style::default().fg(WHITE),
            ),
        ]),
        Line::from(vec![
            Span::styled("State: ", Style::default().fg(GRAY)),
            Span::styled(state, Style::default().fg(state_color).add_modifier(Modifier::BOLD)),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Switch")
            .border_style(Style::default().fg(GRAY)),
    );
    f.render_widget(paragraph, area);
}

fn render_log(f: &mut Frame, area: Rect, app: &App) {
    // newest lines at the bottom, clipped to the panel height
    let visible = area.height.saturating_sub(2) as usize;
    let start = app.logs.len().saturating_sub(visible);

    let lines: Vec<Line> = app.logs[start..]
        .iter()
        .map(|line| {
            let color = if line.contains("Error") || line.contains("failed") {
                RED
            } else {
                WHITE
            };
            Line::from(Span::styled(line.as_str(), Style::default().fg(color)))
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Log")
                .border_style(Style::default().fg(GRAY)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_config_tab(f: &mut Frame, area: Rect, app: &App) {
    let rows: Vec<Line> = match app.tab {
        Tab::Devices => app
            .config
            .devices
            .iter()
            .map(|(alias, d)| row(alias, format!("{}  {}", d.mac, d.name)))
            .collect(),
        Tab::Hosts => app
            .config
            .hosts
            .iter()
            .map(|(alias, h)| {
                row(
                    alias,
                    format!("{}  {}  {}", h.destination(), h.protocol, h.driver_type),
                )
            })
            .collect(),
        Tab::Groups => app
            .config
            .groups
            .iter()
            .map(|(alias, members)| row(alias, members.join(", ")))
            .collect(),
        Tab::Defaults => app
            .config
            .defaults
            .iter()
            .map(|(host, d)| {
                row(
                    host,
                    format!("{} -> {}", d.default_device, d.default_target),
                )
            })
            .collect(),
        Tab::Dashboard => Vec::new(),
    };

    let items: Vec<ListItem> = rows
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == app.cursor {
                ListItem::new(line).style(Style::default().bg(BLUE).fg(WHITE))
            } else {
                ListItem::new(line)
            }
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(app.tab.title())
            .border_style(Style::default().fg(BLUE)),
    );
    f.render_widget(list, area);
}

fn row(alias: &str, detail: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{alias:<16}"),
            Style::default().fg(WHITE).add_modifier(Modifier::BOLD),
        ),
        Span::styled(detail, Style::default().fg(GRAY)),
    ])
}

fn render_help(f: &mut Frame, area: Rect, app: &App) {
    let keys = if app.form.is_some() {
        "[Enter] Save  [Esc] Cancel  [Tab/↑/↓] Field"
    } else {
        match app.tab {
            Tab::Dashboard => {
                "[Space] Select  [g] Group  [t] Target  [s] Switch  [p] Push  [l] Pull  [r] Reload  [Tab] Next  [q] Quit"
            }
            Tab::Devices | Tab::Hosts => "[a] Add  [d] Delete  [r] Reload  [Tab] Next  [q] Quit",
            Tab::Groups | Tab::Defaults => {
                "[a] Add  [e] Edit  [d] Delete  [r] Reload  [Tab] Next  [q] Quit"
            }
        }
    };
    f.render_widget(
        Paragraph::new(keys).style(Style::default().fg(GRAY)),
        area,
    );
}

fn render_form(f: &mut Frame, form: &Form) {
    let height = form.fields.len() as u16 + 2;
    let area = centered(f.area(), 50, height);

    let label_width: usize = 10;
    let lines: Vec<Line> = form
        .fields
        .iter()
        .enumerate()
        .map(|(i, (label, input))| {
            let label_style = if i == form.focus {
                Style::default().fg(BLUE).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(GRAY)
            };
            Line::from(vec![
                Span::styled(format!("{label:<label_width$}"), label_style),
                Span::styled(input.value(), Style::default().fg(WHITE)),
            ])
        })
        .collect();

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(form.title())
                .border_style(Style::default().fg(BLUE)),
        ),
        area,
    );

    let input = &form.fields[form.focus].1;
    f.set_cursor_position((
        area.x + 1 + label_width as u16 + input.visual_cursor() as u16,
        area.y + 1 + form.focus as u16,
    ));
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

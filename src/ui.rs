use crate::{
    app::{App, LauncherKind, LogLevel, Screen},
    install::{InstallOutcome, InstallPhase},
};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{io, time::Duration};

#[derive(Clone)]
struct Theme {
    accent: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
    log_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(120, 200, 120),
            border: Color::Rgb(65, 75, 90),
            text: Color::Rgb(220, 230, 240),
            muted: Color::Rgb(135, 145, 155),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            header_bg: Color::Rgb(22, 28, 36),
            log_bg: Color::Rgb(16, 20, 26),
        }
    }

    fn block(&self, title: &'static str) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: &'static str) -> Block<'static> {
        self.block(title).padding(Padding {
            left: 1,
            right: 1,
            top: 1,
            bottom: 0,
        })
    }

    fn phase_color(&self, phase: InstallPhase) -> Color {
        match phase {
            InstallPhase::Idle => self.muted,
            InstallPhase::Done => self.success,
            InstallPhase::Failed => self.error,
            _ => self.warning,
        }
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.poll_install();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                handle_key(app, key);
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.request_quit();
        return;
    }

    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Enter => app.accept(),
        KeyCode::Esc => app.cancel(),
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Char('c') => app.copy_log_to_clipboard(),
        KeyCode::PageUp => app.scroll_log_up(5),
        KeyCode::PageDown => app.scroll_log_down(5),
        _ => {}
    }
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let theme = Theme::new();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(10),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!("{} Installer", app.config.profile_name),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(app.launcher().short_label(), Style::default().fg(theme.text)),
        ]),
        Line::from(vec![
            Span::styled("Phase: ", Style::default().fg(theme.muted)),
            Span::styled(
                app.phase.label(),
                Style::default()
                    .fg(theme.phase_color(app.phase))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
    ])
    .style(Style::default().bg(theme.header_bg))
    .alignment(Alignment::Center);
    frame.render_widget(header, chunks[0]);

    match app.screen {
        Screen::ChooseLauncher => draw_launcher_choice(frame, app, &theme, chunks[1]),
        _ => draw_prompt(frame, app, &theme, chunks[1]),
    }

    let log_height = chunks[2].height.saturating_sub(2) as usize;
    let log = Paragraph::new(build_log_lines(app, &theme, log_height))
        .block(theme.block("Log"))
        .style(Style::default().bg(theme.log_bg));
    frame.render_widget(log, chunks[2]);

    let status = Paragraph::new(status_bar_line(app, chunks[3].width))
        .style(Style::default().fg(theme.muted));
    frame.render_widget(status, chunks[3]);
}

fn draw_launcher_choice(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let split = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(3)])
        .split(area);

    let intro = Paragraph::new(app.prompt())
        .style(Style::default().fg(theme.text))
        .wrap(Wrap { trim: true })
        .block(theme.panel("Welcome"));
    frame.render_widget(intro, split[0]);

    let items: Vec<ListItem> = LauncherKind::ALL
        .iter()
        .map(|kind| ListItem::new(kind.label()))
        .collect();
    let list = List::new(items)
        .block(theme.block("Launcher"))
        .style(Style::default().fg(theme.text))
        .highlight_style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(app.selected));
    frame.render_stateful_widget(list, split[1], &mut state);
}

fn draw_prompt(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let title = match app.screen {
        Screen::Confirm => "Confirm",
        Screen::ExtractOnly => "Manual install",
        _ => "Install",
    };
    let mut lines: Vec<Line<'static>> = app
        .prompt()
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(theme.text))))
        .collect();

    if let Some(outcome) = &app.outcome {
        lines.push(Line::from(""));
        let (text, color) = match outcome {
            InstallOutcome::Installed => (
                format!(
                    "Done. Open your launcher and pick the {} profile.",
                    app.config.profile_name
                ),
                theme.success,
            ),
            InstallOutcome::Extracted { .. } => (
                "Files are on your Desktop.".to_string(),
                theme.success,
            ),
            InstallOutcome::Failed { message, .. } => (message.clone(), theme.error),
        };
        lines.push(Line::from(Span::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(theme.panel(title));
    frame.render_widget(body, area);
}

fn hint(app: &App) -> &'static str {
    if app.is_running() {
        return "c copy log | PgUp/PgDn scroll";
    }
    match app.screen {
        Screen::ChooseLauncher => "Up/Down choose | Enter next | q quit",
        Screen::Confirm => "Enter confirm | Esc cancel",
        Screen::Install if app.can_start_install() => "Enter install | c copy log | q quit",
        _ => "c copy log | q quit",
    }
}

fn status_bar_line(app: &App, width: u16) -> String {
    let width = width as usize;
    let left = format!("Status: {}", app.status);
    let right = hint(app).to_string();

    if width == 0 {
        return String::new();
    }

    if left.len() + right.len() + 1 > width {
        let available = width.saturating_sub(left.len() + 1);
        let mut trimmed_right = right;
        if trimmed_right.len() > available {
            trimmed_right.truncate(available);
        }
        return format!("{left} {trimmed_right}");
    }

    let spaces = width - left.len() - right.len();
    format!("{left}{}{right}", " ".repeat(spaces))
}

fn build_log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if height == 0 {
        return Vec::new();
    }

    if app.logs.is_empty() {
        return vec![Line::from(Span::styled(
            "Nothing yet.",
            Style::default().fg(theme.muted),
        ))];
    }

    let total = app.logs.len();
    let max_scroll = total.saturating_sub(height);
    let scroll = app.log_scroll.min(max_scroll);
    let start = total.saturating_sub(height + scroll);
    let end = (start + height).min(total);

    app.logs[start..end]
        .iter()
        .map(|entry| {
            let (label, color) = match entry.level {
                LogLevel::Info => ("[i]", theme.accent),
                LogLevel::Warn => ("[!]", theme.warning),
                LogLevel::Error => ("[x]", theme.error),
            };
            Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(entry.message.clone(), Style::default().fg(theme.text)),
            ])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::InstallerConfig, paths::LauncherPaths};
    use ratatui::backend::TestBackend;
    use std::{borrow::Cow, path::PathBuf};

    fn test_app() -> App {
        let paths = LauncherPaths {
            launcher_root: PathBuf::from("/cfg/.minecraft"),
            staging_root: PathBuf::from("/tmp/staging"),
            desktop_dir: PathBuf::from("/home/p/Desktop"),
            data_dir: PathBuf::from("/home/p/.local/share/smp-installer"),
        };
        App::new(InstallerConfig::default(), paths, Cow::Borrowed(&[]), None)
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn log_view_follows_the_tail() {
        let mut app = test_app();
        for index in 0..10 {
            app.log_info(format!("line {index}"));
        }
        let lines = build_log_lines(&app, &Theme::new(), 3);
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["[i] line 7", "[i] line 8", "[i] line 9"]);

        app.scroll_log_up(2);
        let lines = build_log_lines(&app, &Theme::new(), 3);
        assert_eq!(line_text(&lines[0]), "[i] line 5");
    }

    #[test]
    fn status_bar_pads_between_status_and_hint() {
        let app = test_app();
        let line = status_bar_line(&app, 80);
        assert_eq!(line.len(), 80);
        assert!(line.starts_with("Status: Pick your launcher"));
        assert!(line.ends_with("q quit"));
    }

    #[test]
    fn keys_walk_through_the_confirmation() {
        let mut app = test_app();
        handle_key(&mut app, KeyEvent::from(KeyCode::Down));
        handle_key(&mut app, KeyEvent::from(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Confirm);
        handle_key(&mut app, KeyEvent::from(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Install);
        handle_key(&mut app, KeyEvent::from(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn every_screen_renders() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        for screen in [
            Screen::ChooseLauncher,
            Screen::Confirm,
            Screen::Install,
            Screen::ExtractOnly,
        ] {
            app.screen = screen;
            terminal.draw(|frame| draw(frame, &app)).unwrap();
        }
    }
}

// 🖥️ Terminal UI - combined comparison table with difference drill-down
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ledger_recon::{
    export_to_path, report, ComparisonSession, DifferenceDetails, Record, Selector, Source, Stats,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

const PAGE_SIZE: usize = 20;

/// One line of the combined table
#[derive(Debug, Clone)]
pub struct TableLine {
    pub label: String,
    pub local: usize,
    pub inplay: usize,
    pub difference: usize,
    pub amounts: String,
    pub selector: Selector,
}

impl TableLine {
    pub fn is_gateway(&self) -> bool {
        self.selector.is_gateway_level()
    }
}

/// Flatten the combined report into table lines, gateway first
pub fn table_lines(stats: &Stats) -> Vec<TableLine> {
    let mut lines = Vec::new();

    for group in report::combined(stats) {
        lines.push(TableLine {
            label: group.gateway.clone(),
            local: group.stats.local,
            inplay: group.stats.inplay,
            difference: group.stats.difference,
            amounts: report::format_amounts(&group.stats).join(", "),
            selector: group.selector(),
        });

        for action in &group.actions {
            lines.push(TableLine {
                label: format!("  {}", action.action_type),
                local: action.stats.local,
                inplay: action.stats.inplay,
                difference: action.stats.difference,
                amounts: report::format_amounts(&action.stats).join(", "),
                selector: action.selector(&group.gateway),
            });
        }
    }

    lines
}

pub struct App {
    pub session: ComparisonSession,
    pub stats: Stats,
    pub lines: Vec<TableLine>,
    pub state: TableState,
    pub detail: Option<(Selector, DifferenceDetails)>,
    pub detail_scroll: u16,
    pub export_dir: PathBuf,
    pub status: Option<String>,
}

impl App {
    pub fn new(session: ComparisonSession, export_dir: PathBuf) -> Self {
        let stats = session.stats();
        let lines = table_lines(&stats);

        let mut state = TableState::default();
        if !lines.is_empty() {
            state.select(Some(0));
        }

        Self {
            session,
            stats,
            lines,
            state,
            detail: None,
            detail_scroll: 0,
            export_dir,
            status: None,
        }
    }

    pub fn selected_line(&self) -> Option<&TableLine> {
        self.state.selected().and_then(|i| self.lines.get(i))
    }

    /// Open the difference details of the selected line, or close them
    pub fn toggle_detail(&mut self) {
        if self.detail.take().is_some() {
            return;
        }

        if let Some(line) = self.selected_line() {
            let selector = line.selector.clone();
            let details = self.session.difference(&selector);
            self.detail = Some((selector, details));
            self.detail_scroll = 0;
        }
    }

    /// Write the first loaded local file to `local-data.csv`
    pub fn export_local(&mut self) {
        let Some(file) = self.session.files(Source::Local).first() else {
            self.status = Some("No local data loaded".to_string());
            return;
        };

        let path = self.export_dir.join("local-data.csv");
        self.status = Some(match export_to_path(&file.rows, &path) {
            Ok(rows) => format!("Exported {} rows to {}", rows, path.display()),
            Err(e) => format!("Export failed: {}", e),
        });
    }

    pub fn next(&mut self) {
        if self.detail.is_some() {
            self.detail_scroll = self.detail_scroll.saturating_add(1);
            return;
        }
        let len = self.lines.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.detail.is_some() {
            self.detail_scroll = self.detail_scroll.saturating_sub(1);
            return;
        }
        let len = self.lines.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.lines.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + PAGE_SIZE).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(PAGE_SIZE));
        self.state.select(Some(i));
    }
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc if app.detail.is_some() => app.detail = None,
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Char('d') => app.export_local(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.lines.is_empty() {
                        app.state.select(Some(app.lines.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Totals
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.detail.is_some() {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let unbalanced = app.stats.unbalanced_gateways().count();

    let spans = vec![
        Span::styled(
            "Combined Comparison",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Local: {}", app.stats.total_rows.local),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled(
            format!("InPlay: {}", app.stats.total_rows.inplay),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Unbalanced gateways: {}", unbalanced),
            Style::default().fg(if unbalanced == 0 { Color::Green } else { Color::Red }),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Gateway / Action Type", "Local", "InPlay", "Difference", "Amounts"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.lines.iter().map(|line| {
        let weight = if line.is_gateway() {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let diff_color = if line.difference == 0 { Color::Green } else { Color::Red };

        Row::new(vec![
            Cell::from(line.label.clone()).style(weight),
            Cell::from(line.local.to_string()).style(weight),
            Cell::from(line.inplay.to_string()).style(weight),
            Cell::from(line.difference.to_string()).style(weight.fg(diff_color)),
            Cell::from(line.amounts.clone()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(28),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(11),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Buckets "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn section(title: String, rows: &[Record]) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            title,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
        Line::from(""),
    ];
    lines.extend(
        report::preview_rows(rows, report::DETAIL_ROW_LIMIT)
            .into_iter()
            .map(Line::from),
    );
    lines.push(Line::from(""));
    lines
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some((selector, details)) = &app.detail else {
        return;
    };

    let mut content = vec![
        Line::from(vec![
            Span::styled("  Matched: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "local {} / inplay {}",
                details.local_matched, details.inplay_matched
            )),
        ]),
        Line::from(""),
    ];
    content.extend(section(
        format!("InPlay Records ({})", details.inplay_only.len()),
        &details.inplay_only,
    ));
    content.extend(section(
        format!("Local Records ({})", details.local_only.len()),
        &details.local_only,
    ));

    let panel = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(format!(" Difference Details for {} ", selector)),
        );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.lines.len()),
        Style::default().fg(Color::Cyan),
    )];

    if !app.session.filter().is_empty() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled("Filtered", Style::default().fg(Color::Magenta)));
    }

    if let Some(status) = &app.status {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }

    spans.push(Span::raw(" | "));
    spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" Details | "));
    spans.push(Span::styled("d", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" Download local | "));
    spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    spans.push(Span::raw(" Nav | "));
    spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

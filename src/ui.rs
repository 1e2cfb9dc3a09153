use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::sync::mpsc::{self, Receiver};

use subtracker::{
    count_label, format_amount, BookError, Change, SubscriptionBook, SubscriptionForm,
    SubscriptionStore, Theme,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Subscriptions,
    Metrics,
    Configuration,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Subscriptions => Page::Metrics,
            Page::Metrics => Page::Configuration,
            Page::Configuration => Page::Subscriptions,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Subscriptions => Page::Configuration,
            Page::Metrics => Page::Subscriptions,
            Page::Configuration => Page::Metrics,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Subscriptions => "Subscriptions",
            Page::Metrics => "Metrics",
            Page::Configuration => "Configuration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Amount,
    Date,
    Frequency,
}

impl FormField {
    fn next(&self) -> Self {
        match self {
            FormField::Name => FormField::Amount,
            FormField::Amount => FormField::Date,
            FormField::Date => FormField::Frequency,
            FormField::Frequency => FormField::Name,
        }
    }

    fn previous(&self) -> Self {
        match self {
            FormField::Name => FormField::Frequency,
            FormField::Amount => FormField::Name,
            FormField::Date => FormField::Amount,
            FormField::Frequency => FormField::Date,
        }
    }
}

/// Which record the open form writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    New,
    Existing(String),
}

/// The add/edit form while it is open
#[derive(Debug, Clone)]
pub struct Editor {
    pub target: EditTarget,
    pub form: SubscriptionForm,
    pub field: FormField,
    pub error: Option<String>,
}

impl Editor {
    fn title(&self) -> &str {
        match self.target {
            EditTarget::New => " New Subscription ",
            EditTarget::Existing(_) => " Edit Subscription ",
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Name => Some(&mut self.form.name),
            FormField::Amount => Some(&mut self.form.amount),
            FormField::Date => Some(&mut self.form.date),
            FormField::Frequency => None,
        }
    }
}

pub struct App<S: SubscriptionStore> {
    pub book: SubscriptionBook<S>,
    pub state: TableState,
    pub current_page: Page,
    pub editor: Option<Editor>,
    pub status: Option<String>,
    changes: Receiver<Change>,
}

impl<S: SubscriptionStore> App<S> {
    pub fn new(mut book: SubscriptionBook<S>) -> Self {
        // Book changes come back through a channel and become the status line
        let (tx, changes) = mpsc::channel();
        book.subscribe(Box::new(move |change: &Change| {
            let _ = tx.send(change.clone());
        }));

        let mut state = TableState::default();
        if !book.is_empty() {
            state.select(Some(0));
        }

        Self {
            book,
            state,
            current_page: Page::Subscriptions,
            editor: None,
            status: None,
            changes,
        }
    }

    pub fn theme(&self) -> Theme {
        self.book.settings().selected_theme
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.book.len();
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
        let len = self.book.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn clamp_selection(&mut self) {
        let len = self.book.len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            _ => {}
        }
    }

    pub fn open_new(&mut self) {
        self.editor = Some(Editor {
            target: EditTarget::New,
            form: SubscriptionForm::default(),
            field: FormField::Name,
            error: None,
        });
    }

    pub fn open_edit(&mut self) {
        let selected = self
            .state
            .selected()
            .and_then(|i| self.book.subscriptions().get(i));

        if let Some(sub) = selected {
            self.editor = Some(Editor {
                target: EditTarget::Existing(sub.id.clone()),
                form: SubscriptionForm::from_subscription(sub),
                field: FormField::Name,
                error: None,
            });
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(i) = self.state.selected() {
            if let Err(e) = self.book.remove_at(i) {
                self.status = Some(e.to_string());
            }
            self.clamp_selection();
        }
    }

    /// Save the open form. An invalid form stays open with its error shown.
    pub fn submit(&mut self) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };

        let result = match &editor.target {
            EditTarget::New => self.book.add(&editor.form).map(|sub| sub.id.clone()),
            EditTarget::Existing(id) => {
                self.book.update(id, &editor.form).map(|sub| sub.id.clone())
            }
        };

        match result {
            Ok(id) => {
                self.editor = None;
                let index = self.book.position(&id);
                self.state.select(index);
            }
            Err(BookError::Form(e)) => editor.error = Some(e.to_string()),
            Err(e) => {
                self.editor = None;
                self.status = Some(e.to_string());
            }
        }
    }

    /// Turn pending book changes into the status line
    pub fn drain_changes(&mut self) {
        while let Ok(change) = self.changes.try_recv() {
            self.status = Some(describe_change(&change));
        }
    }

    /// Apply one key press. Returns false when the user quits.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.editor.is_some() {
            self.handle_editor_key(key);
            return true;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Tab => self.next_page(),
            KeyCode::BackTab => self.previous_page(),
            KeyCode::Char('a') => self.open_new(),
            KeyCode::Enter | KeyCode::Char('e') if self.current_page == Page::Subscriptions => {
                self.open_edit()
            }
            KeyCode::Char('d') | KeyCode::Delete if self.current_page == Page::Subscriptions => {
                self.delete_selected()
            }
            KeyCode::Left | KeyCode::Char('h') if self.current_page == Page::Configuration => {
                let theme = self.theme().previous();
                self.book.set_theme(theme);
            }
            KeyCode::Right | KeyCode::Char('l') if self.current_page == Page::Configuration => {
                let theme = self.theme().next();
                self.book.set_theme(theme);
            }
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Home => {
                if !self.book.is_empty() {
                    self.state.select(Some(0));
                }
            }
            KeyCode::End => {
                if !self.book.is_empty() {
                    self.state.select(Some(self.book.len() - 1));
                }
            }
            _ => {}
        }
        true
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Enter {
            self.submit();
            return;
        }

        let Some(editor) = self.editor.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.editor = None,
            KeyCode::Tab | KeyCode::Down => editor.field = editor.field.next(),
            KeyCode::BackTab | KeyCode::Up => editor.field = editor.field.previous(),
            KeyCode::Left if editor.field == FormField::Frequency => {
                editor.form.frequency = editor.form.frequency.previous()
            }
            KeyCode::Right | KeyCode::Char(' ') if editor.field == FormField::Frequency => {
                editor.form.frequency = editor.form.frequency.next()
            }
            KeyCode::Backspace => {
                if let Some(text) = editor.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(text) = editor.text_mut() {
                    text.push(c);
                }
            }
            _ => {}
        }
    }
}

fn describe_change(change: &Change) -> String {
    match change {
        Change::Added { .. } => "Subscription added".to_string(),
        Change::Updated { .. } => "Subscription updated".to_string(),
        Change::Removed { .. } => "Subscription deleted".to_string(),
        Change::Imported { updated, added } => {
            format!("Imported: {} updated, {} added", updated, added)
        }
        Change::ThemeChanged { theme } => format!("Appearance: {}", theme.label()),
    }
}

// ============================================================================
// THEME PALETTE
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Palette {
    base: Style,
    accent: Color,
    muted: Color,
    border: Color,
    highlight: Style,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::System => Palette {
            base: Style::default(),
            accent: Color::Yellow,
            muted: Color::DarkGray,
            border: Color::White,
            highlight: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
        },
        Theme::Light => Palette {
            base: Style::default().fg(Color::Black).bg(Color::White),
            accent: Color::Blue,
            muted: Color::Gray,
            border: Color::Black,
            highlight: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        },
        Theme::Dark => Palette {
            base: Style::default().fg(Color::White).bg(Color::Black),
            accent: Color::Cyan,
            muted: Color::DarkGray,
            border: Color::Cyan,
            highlight: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
        },
    }
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui<S: SubscriptionStore>(app: &mut App<S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        tracing::error!(error = %err, "terminal UI stopped with an error");
    }

    Ok(res?)
}

fn run_app<B: ratatui::backend::Backend, S: SubscriptionStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        app.drain_changes();
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui<S: SubscriptionStore>(f: &mut Frame, app: &mut App<S>) {
    let colors = palette(app.theme());
    f.render_widget(Block::default().style(colors.base), f.size());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app, &colors);

    match app.current_page {
        Page::Subscriptions => render_table(f, chunks[1], app, &colors),
        Page::Metrics => render_metrics(f, chunks[1], app, &colors),
        Page::Configuration => render_configuration(f, chunks[1], app, &colors),
    }

    render_status_bar(f, chunks[2], app, &colors);

    if let Some(editor) = &app.editor {
        render_editor(f, editor, &colors);
    }
}

fn render_header<S: SubscriptionStore>(f: &mut Frame, area: Rect, app: &App<S>, colors: &Palette) {
    let pages = [Page::Subscriptions, Page::Metrics, Page::Configuration];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(colors.muted)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let summary = app.book.summary();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("{}/mo", format_amount(summary.monthly_total)),
        Style::default().fg(colors.accent),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border))
            .title(" Subtracker "),
    );

    f.render_widget(header, area);
}

fn render_table<S: SubscriptionStore>(
    f: &mut Frame,
    area: Rect,
    app: &mut App<S>,
    colors: &Palette,
) {
    if app.book.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No subscriptions yet",
                Style::default().fg(colors.muted),
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw("  Press "),
                Span::styled("a", Style::default().fg(colors.accent)),
                Span::raw(" to add one"),
            ]),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border))
                .title(" Active "),
        );
        f.render_widget(empty, area);
        return;
    }

    let header_cells = ["Name", "Amount", "Frequency", "Due"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells).height(1);

    let rows = app.book.subscriptions().iter().map(|sub| {
        let frequency_style = if sub.frequency.is_known() {
            Style::default()
        } else {
            Style::default().fg(Color::Red)
        };

        Row::new(vec![
            Cell::from(truncate(&sub.name, 30)),
            Cell::from(format_amount(sub.amount)),
            Cell::from(sub.frequency.to_string()).style(frequency_style),
            Cell::from(sub.date.format("%b %-d, %Y").to_string()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(11),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border))
            .title(" Active "),
    )
    .highlight_style(colors.highlight)
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_metrics<S: SubscriptionStore>(f: &mut Frame, area: Rect, app: &App<S>, colors: &Palette) {
    let summary = app.book.summary();

    let cards = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(area);

    let metric = |label: &str, value: String, color: Color| {
        Paragraph::new(vec![
            Line::from(Span::styled(
                format!("  {}", value),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(format!(" {} ", label)),
        )
    };

    f.render_widget(
        metric("Number of Subscriptions", summary.count.to_string(), Color::Green),
        cards[0],
    );
    f.render_widget(
        metric("Total Monthly Cost", format_amount(summary.monthly_total), Color::Blue),
        cards[1],
    );
    f.render_widget(
        metric("Total Yearly Cost", format_amount(summary.yearly_total), Color::Magenta),
        cards[2],
    );

    let note = Paragraph::new(Line::from(Span::styled(
        "  Yearly subscriptions count toward the yearly total only.",
        Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
    )));
    f.render_widget(note, cards[3]);
}

fn render_configuration<S: SubscriptionStore>(
    f: &mut Frame,
    area: Rect,
    app: &App<S>,
    colors: &Palette,
) {
    let current = app.theme();

    let mut options = vec![Span::raw("  Appearance:  ")];
    for (i, theme) in Theme::ALL.iter().enumerate() {
        if i > 0 {
            options.push(Span::raw("  "));
        }
        let style = if *theme == current {
            colors.highlight
        } else {
            Style::default().fg(colors.muted)
        };
        options.push(Span::styled(format!(" {} ", theme.label()), style));
    }

    let content = vec![
        Line::from(""),
        Line::from(options),
        Line::from(""),
        Line::from(Span::styled(
            "  ←/→ to change",
            Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
        )),
    ];

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border))
            .title(" Configuration "),
    );
    f.render_widget(panel, area);
}

fn render_status_bar<S: SubscriptionStore>(
    f: &mut Frame,
    area: Rect,
    app: &App<S>,
    colors: &Palette,
) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(colors.accent));

    let mut status_spans = vec![Span::styled(
        format!(" {} ", count_label(app.book.len())),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(message) = &app.status {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Green)));
    }

    status_spans.push(Span::raw(" | "));
    if app.editor.is_some() {
        status_spans.extend([
            key("Enter"),
            Span::raw(" Save | "),
            key("Tab"),
            Span::raw(" Field | "),
            key("←/→"),
            Span::raw(" Frequency | "),
            key("Esc"),
            Span::raw(" Cancel"),
        ]);
    } else {
        status_spans.extend([
            key("a"),
            Span::raw(" Add | "),
            key("Enter"),
            Span::raw(" Edit | "),
            key("d"),
            Span::raw(" Delete | "),
            key("Tab"),
            Span::raw(" Page | "),
            Span::styled("q", Style::default().fg(Color::Red)),
            Span::raw(" Quit"),
        ]);
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border)),
    );

    f.render_widget(status_bar, area);
}

fn render_editor(f: &mut Frame, editor: &Editor, colors: &Palette) {
    let area = centered_rect(60, 14, f.size());

    let field_line = |field: FormField, label: &str, value: String| {
        let active = editor.field == field;
        let marker = if active { "▶ " } else { "  " };
        let value_style = if active {
            Style::default().fg(colors.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::raw(marker.to_string()),
            Span::styled(format!("{:<18}", label), Style::default().fg(Color::Cyan)),
            Span::styled(value, value_style),
        ])
    };

    let frequency = if editor.form.frequency.is_known() {
        format!("‹ {} ›", editor.form.frequency)
    } else {
        format!("‹ {} (unknown) ›", editor.form.frequency)
    };

    let mut content = vec![
        Line::from(""),
        field_line(FormField::Name, "Service Name", editor.form.name.clone()),
        Line::from(""),
        field_line(FormField::Amount, "Amount", editor.form.amount.clone()),
        Line::from(""),
        field_line(
            FormField::Date,
            "Date",
            format!("{}  (YYYY-MM-DD)", editor.form.date),
        ),
        Line::from(""),
        field_line(FormField::Frequency, "Renewal Frequency", frequency),
        Line::from(""),
    ];

    if editor.target == EditTarget::New {
        content.push(Line::from(Span::styled(
            "  Enter the last billing date; the next one is stored.",
            Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    if let Some(error) = &editor.error {
        content.push(Line::from(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::Red),
        )));
    }

    let panel = Paragraph::new(content).style(colors.base).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.accent))
            .title(editor.title().to_string()),
    );

    f.render_widget(Clear, area);
    f.render_widget(panel, area);
}

/// Rect of `width_percent` of `area`'s width and `height` rows, centred
fn centered_rect(width_percent: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

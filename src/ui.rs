use crate::calendar::{applies_to_market, event_label, generate_events, MerchandisingEvent};
use crate::forecast::{compute_forecast, BusinessInputs, Forecast, ForecastRequest};
use crate::markets::Market;
use crate::money::{format_amount, format_usd};
use crate::month::MonthAnchor;
use crate::selection::EventSelection;
use crate::shipping::compute_effective_rate;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Forecast,
    Calendar,
    Inputs,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Forecast => Page::Calendar,
            Page::Calendar => Page::Inputs,
            Page::Inputs => Page::Forecast,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Forecast => Page::Inputs,
            Page::Calendar => Page::Forecast,
            Page::Inputs => Page::Calendar,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Forecast => "Forecast",
            Page::Calendar => "Calendar",
            Page::Inputs => "Inputs",
        }
    }
}

/// Editable fields on the Inputs page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Aov,
    Cogs,
    Weight,
    Budget,
}

impl InputField {
    pub const ALL: [InputField; 4] = [
        InputField::Aov,
        InputField::Cogs,
        InputField::Weight,
        InputField::Budget,
    ];

    pub fn label(&self) -> &str {
        match self {
            InputField::Aov => "AOV ($)",
            InputField::Cogs => "COGS ($)",
            InputField::Weight => "Product weight (kg)",
            InputField::Budget => "Marketing M1 ($)",
        }
    }

    /// Amount one keypress adds or removes
    pub fn step(&self) -> f64 {
        match self {
            InputField::Aov | InputField::Cogs => 1.0,
            InputField::Weight => 0.1,
            InputField::Budget => 100.0,
        }
    }
}

pub struct App {
    pub aov: f64,
    pub cogs: f64,
    pub weight_kg: f64,
    pub budget: f64,
    pub start: MonthAnchor,
    pub events: Vec<MerchandisingEvent>,
    pub selection: EventSelection,
    pub market_filter: Option<Market>,
    pub inputs: BusinessInputs,
    pub forecast: Forecast,
    pub current_page: Page,
    pub forecast_state: TableState,
    pub calendar_state: TableState,
    pub inputs_state: TableState,
}

impl App {
    pub fn new(request: &ForecastRequest) -> Self {
        let mut forecast_state = TableState::default();
        forecast_state.select(Some(0));
        let mut calendar_state = TableState::default();
        calendar_state.select(Some(0));
        let mut inputs_state = TableState::default();
        inputs_state.select(Some(0));

        Self {
            aov: request.inputs.aov,
            cogs: request.inputs.cogs,
            weight_kg: request.inputs.product_weight_kg,
            budget: request.inputs.first_month_marketing_budget,
            start: request.start,
            events: generate_events(request.start),
            selection: request.selection.clone(),
            market_filter: None,
            inputs: request.inputs,
            forecast: request.run(),
            current_page: Page::Forecast,
            forecast_state,
            calendar_state,
            inputs_state,
        }
    }

    /// Rebuild inputs and forecast from the current fields
    pub fn recompute(&mut self) {
        self.inputs = BusinessInputs::new(self.aov, self.cogs, self.weight_kg, self.budget);
        self.forecast = compute_forecast(&self.inputs, self.start, &self.selection);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// Move the forecast window; a new window starts with every event selected
    pub fn set_start(&mut self, start: MonthAnchor) {
        self.start = start;
        self.events = generate_events(start);
        self.selection = EventSelection::all(&self.events);
        self.calendar_state.select(Some(0));
        self.recompute();
    }

    pub fn shift_start_forward(&mut self) {
        self.set_start(self.start.next());
    }

    pub fn shift_start_back(&mut self) {
        self.set_start(self.start.previous());
    }

    /// Events shown on the Calendar page under the current market filter
    pub fn visible_events(&self) -> Vec<&MerchandisingEvent> {
        match self.market_filter {
            Some(market) => self
                .events
                .iter()
                .filter(|e| applies_to_market(e, market.as_str()))
                .collect(),
            None => self.events.iter().collect(),
        }
    }

    pub fn cycle_market(&mut self) {
        self.market_filter = match self.market_filter {
            None => Some(Market::ALL[0]),
            Some(current) => Market::ALL
                .iter()
                .position(|m| *m == current)
                .and_then(|i| Market::ALL.get(i + 1))
                .copied(),
        };
        self.calendar_state.select(Some(0));
    }

    pub fn toggle_selected_event(&mut self) {
        let id = self
            .calendar_state
            .selected()
            .and_then(|i| self.visible_events().get(i).map(|e| e.id.clone()));

        if let Some(id) = id {
            self.selection.toggle(&id);
            self.recompute();
        }
    }

    pub fn select_all_events(&mut self) {
        self.selection = EventSelection::all(&self.events);
        self.recompute();
    }

    pub fn select_no_events(&mut self) {
        self.selection = EventSelection::empty();
        self.recompute();
    }

    pub fn selected_field(&self) -> InputField {
        let i = self.inputs_state.selected().unwrap_or(0);
        InputField::ALL[i.min(InputField::ALL.len() - 1)]
    }

    fn field_value(&mut self, field: InputField) -> &mut f64 {
        match field {
            InputField::Aov => &mut self.aov,
            InputField::Cogs => &mut self.cogs,
            InputField::Weight => &mut self.weight_kg,
            InputField::Budget => &mut self.budget,
        }
    }

    /// Nudge the selected input by `steps` increments (never below zero)
    pub fn adjust_selected(&mut self, steps: f64) {
        let field = self.selected_field();
        let value = self.field_value(field);
        *value = ((*value + steps * field.step()) * 100.0).round().max(0.0) / 100.0;
        self.recompute();
    }

    fn active_state(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Forecast => {
                let len = self.forecast.months.len();
                (&mut self.forecast_state, len)
            }
            Page::Calendar => {
                let len = self.visible_events().len();
                (&mut self.calendar_state, len)
            }
            Page::Inputs => (&mut self.inputs_state, InputField::ALL.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }
}

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

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char(']') => app.shift_start_forward(),
                KeyCode::Char('[') => app.shift_start_back(),
                KeyCode::Char('a') => app.select_all_events(),
                KeyCode::Char('n') => app.select_no_events(),
                KeyCode::Char(' ') if app.current_page == Page::Calendar => {
                    app.toggle_selected_event()
                }
                KeyCode::Char('m') if app.current_page == Page::Calendar => app.cycle_market(),
                KeyCode::Char('+') | KeyCode::Right if app.current_page == Page::Inputs => {
                    app.adjust_selected(1.0)
                }
                KeyCode::Char('-') | KeyCode::Left if app.current_page == Page::Inputs => {
                    app.adjust_selected(-1.0)
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Forecast => render_forecast(f, chunks[1], app),
        Page::Calendar => render_calendar(f, chunks[1], app),
        Page::Inputs => render_inputs(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn header_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

fn profit_color(value: f64) -> Color {
    if value < 0.0 {
        Color::Red
    } else {
        Color::Green
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Forecast, Page::Calendar, Page::Inputs];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let totals = &app.forecast.totals;
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Start: {}", app.start.long_label()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Revenue {}", format_usd(totals.revenue)),
        Style::default().fg(Color::Cyan),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Profit {}", format_usd(totals.profit)),
        Style::default().fg(profit_color(totals.profit)),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_forecast(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Month", "Orders", "Revenue", "COGS", "Shipping", "Marketing", "Profit", "Event"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let mut rows: Vec<Row> = app
        .forecast
        .months
        .iter()
        .map(|m| {
            let event = match &m.event_name {
                Some(name) => format!("+{}% {}", m.conversion_lift_percent, name),
                None => "—".to_string(),
            };
            let event_style = if m.is_event_month() {
                Style::default().fg(Color::Magenta)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            Row::new(vec![
                Cell::from(m.month_label.clone()),
                Cell::from(m.orders.to_string()),
                Cell::from(format_amount(m.revenue)),
                Cell::from(format_amount(m.cogs_total)),
                Cell::from(format_amount(m.shipping_total)),
                Cell::from(format_amount(m.marketing_total)),
                Cell::from(format_amount(m.profit)).style(Style::default().fg(profit_color(m.profit))),
                Cell::from(event).style(event_style),
            ])
            .height(1)
        })
        .collect();

    let t = &app.forecast.totals;
    rows.push(
        Row::new(vec![
            Cell::from("Total"),
            Cell::from(t.orders.to_string()),
            Cell::from(format_amount(t.revenue)),
            Cell::from(format_amount(t.cogs)),
            Cell::from(format_amount(t.shipping)),
            Cell::from(format_amount(t.marketing)),
            Cell::from(format_amount(t.profit)).style(Style::default().fg(profit_color(t.profit))),
            Cell::from(format!("COGS {:.1}% of revenue", t.cogs_percent)),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD)),
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Length(13),
            Constraint::Length(12),
            Constraint::Length(13),
            Constraint::Length(14),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" 12-Month P&L "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.forecast_state);
}

fn render_calendar(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["", "Date", "Event", "Lift"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .visible_events()
        .into_iter()
        .map(|e| {
            let selected = app.selection.contains(&e.id);
            let (mark, style) = if selected {
                ("[x]", Style::default().fg(Color::Green))
            } else {
                ("[ ]", Style::default().fg(Color::DarkGray))
            };

            Row::new(vec![
                Cell::from(mark).style(style),
                Cell::from(e.date.format("%d %b %Y").to_string()),
                Cell::from(event_label(e)),
                Cell::from(format!("+{}%", e.conversion_lift_percent)),
            ])
            .height(1)
        })
        .collect();

    let scope = match app.market_filter {
        Some(market) => market.label().to_string(),
        None => "All markets".to_string(),
    };
    let title = format!(
        " Merchandising Events - {} ({}/{} selected) ",
        scope,
        app.selection.len(),
        app.events.len()
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(12),
            Constraint::Min(30),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.calendar_state);
}

fn render_inputs(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(InputField::ALL.len() as u16 + 3), Constraint::Min(0)])
        .split(area);

    let values = [app.aov, app.cogs, app.weight_kg, app.budget];
    let rows: Vec<Row> = InputField::ALL
        .iter()
        .zip(values)
        .map(|(field, value)| {
            Row::new(vec![
                Cell::from(field.label().to_string()),
                Cell::from(format!("{:.2}", value)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(24), Constraint::Length(14)])
        .header(
            Row::new(vec![Cell::from("Input"), Cell::from("Value")])
                .style(header_style().bg(Color::DarkGray)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Business Inputs "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[0], &mut app.inputs_state);

    let inputs = &app.inputs;
    let derived = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("  Shipping/order:        "),
            Span::styled(format_usd(inputs.shipping_per_order), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw("  Effective rate:        "),
            Span::styled(
                format!("{}/kg", format_usd(compute_effective_rate(inputs.product_weight_kg))),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(vec![
            Span::raw("  Contribution margin:   "),
            Span::styled(
                format_usd(inputs.contribution_margin().max(0.0)),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            Span::raw("  Margin % of AOV:       "),
            Span::styled(
                format!("{:.1}%", inputs.margin_percent()),
                Style::default().fg(Color::Green),
            ),
        ]),
    ];

    let panel = Paragraph::new(derived).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Margin Calculator "),
    );
    f.render_widget(panel, chunks[1]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut status_spans = vec![
        key("Tab"),
        Span::raw(" Page | "),
        key("↑/↓"),
        Span::raw(" Nav | "),
        key("[ ]"),
        Span::raw(" Start month | "),
        key("a/n"),
        Span::raw(" All/None | "),
    ];

    match app.current_page {
        Page::Calendar => {
            status_spans.push(key("Space"));
            status_spans.push(Span::raw(" Toggle | "));
            status_spans.push(key("m"));
            status_spans.push(Span::raw(" Market | "));
        }
        Page::Inputs => {
            status_spans.push(key("+/-"));
            status_spans.push(Span::raw(" Adjust | "));
        }
        Page::Forecast => {}
    }

    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

//! UI rendering for the TUI.

mod detail;

use campaign_pulse_core::format::{
    format_compact, format_currency, format_percent, format_relative_time_opt, format_thousands,
};
use campaign_pulse_core::{CampaignStatus, GlobalInsights};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Gauge, Paragraph, Row, Sparkline, Table, Wrap},
    Frame,
};

use crate::app::{App, ViewMode};

// ========== Color Palette ==========

/// Bright cyan for highlights and accents
const ACCENT_CYAN: Color = Color::Rgb(0, 255, 255);
/// Gold for money figures
const MONEY_GOLD: Color = Color::Rgb(255, 215, 0);
/// Lime green for positive trends and live status
const TREND_UP: Color = Color::Rgb(50, 205, 50);
/// Coral for negative trends and warnings
const TREND_DOWN: Color = Color::Rgb(255, 127, 80);
/// Purple for secondary highlights
const ACCENT_PURPLE: Color = Color::Rgb(138, 43, 226);
/// Soft white for primary text
const TEXT_WHITE: Color = Color::Rgb(250, 250, 250);
/// Dim gray for secondary text
const TEXT_DIM: Color = Color::Rgb(128, 128, 128);
/// Label color for metric names
const LABEL_COLOR: Color = Color::Rgb(100, 180, 180);
/// Border color for list blocks
const BORDER_LIST: Color = Color::Rgb(0, 150, 150);
/// Border color for KPI blocks
const BORDER_KPI: Color = Color::Rgb(80, 160, 80);
/// Border color for chart blocks
const BORDER_CHART: Color = Color::Rgb(180, 100, 180);
/// Gauge background
const GAUGE_BG: Color = Color::Rgb(40, 40, 40);

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    match app.view_mode {
        ViewMode::CampaignList => render_campaign_list_view(frame, app),
        ViewMode::CampaignDetail => detail::render_detail_view(frame, app),
    }
}

/// Color for a campaign status badge.
fn status_color(status: CampaignStatus) -> Color {
    match status {
        CampaignStatus::Active => TREND_UP,
        CampaignStatus::Paused => MONEY_GOLD,
        CampaignStatus::Completed => ACCENT_CYAN,
        CampaignStatus::Draft => TEXT_DIM,
        CampaignStatus::Unknown => Color::DarkGray,
    }
}

/// Render the header line: app name, base URL.
fn render_header(frame: &mut Frame, app: &App, title: &str, area: Rect) {
    let chunks = Layout::horizontal([
        Constraint::Length(17), // App name
        Constraint::Min(1),     // Title + base URL
    ])
    .split(area);

    let app_name =
        Paragraph::new(" campaign-pulse").style(Style::default().fg(Color::Cyan).bold());
    frame.render_widget(app_name, chunks[0]);

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(Color::Cyan)
                .bold()
                .add_modifier(Modifier::UNDERLINED),
        ),
        Span::styled(format!("  {}", app.base_url()), Style::default().fg(TEXT_DIM)),
    ]);
    let header = Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[1]);
}

/// Render a key hint footer from (key, label) pairs.
fn render_footer(frame: &mut Frame, hints: &[(&str, &str)], area: Rect) {
    let key_style = Style::default().fg(Color::Black).bg(Color::Cyan);
    let label_style = Style::default().fg(TEXT_DIM);

    let mut spans = Vec::with_capacity(hints.len() * 3);
    for (i, (key, label)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {}", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the list view (campaigns table).
fn render_campaign_list_view(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Layout: header, insights summary, table, footer
    let chunks = Layout::vertical([
        Constraint::Length(2), // Header
        Constraint::Length(5), // Global insights
        Constraint::Min(5),    // Table
        Constraint::Length(1), // Footer
    ])
    .split(area);

    render_header(frame, app, "Campaigns", chunks[0]);
    render_insights_panel(frame, app.insights.as_ref(), chunks[1]);

    match &app.list_error {
        Some(error) if app.campaigns.is_empty() => {
            let message = Paragraph::new(vec![
                Line::from(Span::styled(
                    "Failed to load campaigns",
                    Style::default().fg(TREND_DOWN).bold(),
                )),
                Line::from(Span::styled(error.as_str(), Style::default().fg(TEXT_DIM))),
                Line::from(Span::styled("Press r to retry", Style::default().fg(TEXT_DIM))),
            ])
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(TREND_DOWN))
                    .title(" Campaigns "),
            );
            frame.render_widget(message, chunks[2]);
        }
        _ => render_campaign_table(frame, app, chunks[2]),
    }

    render_footer(
        frame,
        &[("↑↓", "Select"), ("Enter", "Open"), ("r", "Refresh"), ("q", "Quit")],
        chunks[3],
    );
}

/// Render the global insights summary panel.
fn render_insights_panel(frame: &mut Frame, insights: Option<&GlobalInsights>, area: Rect) {
    let block = Block::default()
        .title(" Overview ")
        .title_style(Style::default().fg(ACCENT_CYAN).bold())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_LIST));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(insights) = insights else {
        let placeholder = Paragraph::new(Span::styled(
            "Global insights unavailable",
            Style::default().fg(TEXT_DIM),
        ));
        frame.render_widget(placeholder, inner);
        return;
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Campaigns  ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format!("{:.0}", insights.total_campaigns),
                Style::default().fg(ACCENT_CYAN).bold(),
            ),
            Span::styled(" total  ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format!("{:.0}", insights.active_campaigns),
                Style::default().fg(TREND_UP).bold(),
            ),
            Span::styled(" active  ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format!("{:.0}", insights.paused_campaigns),
                Style::default().fg(MONEY_GOLD).bold(),
            ),
            Span::styled(" paused", Style::default().fg(TEXT_DIM)),
        ]),
        Line::from(vec![
            Span::styled("Reach      ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format_compact(insights.total_impressions),
                Style::default().fg(TEXT_WHITE).bold(),
            ),
            Span::styled(" impressions  ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format_compact(insights.total_clicks),
                Style::default().fg(TEXT_WHITE).bold(),
            ),
            Span::styled(" clicks  ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format_compact(insights.total_conversions),
                Style::default().fg(TEXT_WHITE).bold(),
            ),
            Span::styled(" conversions", Style::default().fg(TEXT_DIM)),
        ]),
        Line::from(vec![
            Span::styled("Spend      ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format_currency(insights.total_spend),
                Style::default().fg(MONEY_GOLD).bold(),
            ),
            Span::styled("  CTR ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format_percent(insights.avg_ctr, 2),
                Style::default().fg(ACCENT_PURPLE).bold(),
            ),
            Span::styled("  CPC ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format_currency(insights.avg_cpc),
                Style::default().fg(ACCENT_PURPLE).bold(),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render the campaigns table.
fn render_campaign_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let header = Row::new([
        Cell::from("Name"),
        Cell::from("Status"),
        Cell::from("Platforms"),
        Cell::from("Budget"),
        Cell::from("Spend"),
        Cell::from("CTR"),
    ])
    .style(Style::default().fg(LABEL_COLOR).bold())
    .bottom_margin(1);

    let rows = app.campaigns.iter().map(|campaign| {
        Row::new([
            Cell::from(campaign.display_name().to_string()),
            Cell::from(campaign.status.as_str())
                .style(Style::default().fg(status_color(campaign.status))),
            Cell::from(campaign.platforms.join(", ")).style(Style::default().fg(TEXT_DIM)),
            Cell::from(format_currency(campaign.budget)),
            Cell::from(
                campaign
                    .spend
                    .map(format_currency)
                    .unwrap_or_else(|| "-".to_string()),
            )
            .style(Style::default().fg(MONEY_GOLD)),
            Cell::from(
                campaign
                    .ctr
                    .map(|ctr| format_percent(ctr, 2))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ])
    });

    let widths = [
        Constraint::Fill(1),    // Name (flexible)
        Constraint::Length(10), // Status
        Constraint::Length(20), // Platforms
        Constraint::Length(13), // Budget
        Constraint::Length(13), // Spend
        Constraint::Length(7),  // CTR
    ];

    let title = format!(" Campaigns ({}) ", app.campaigns.len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_LIST))
                .title(title),
        )
        .row_highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .fg(Color::Cyan),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

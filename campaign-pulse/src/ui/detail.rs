use super::*;

use campaign_pulse_core::analytics::{DerivedMetrics, PerformanceGrade, Trend, WindowSummary};
use campaign_pulse_core::{
    Campaign, NormalizedMetrics, StreamConnectionState, StreamStatus, TimeRange,
};

use crate::app::CampaignDetail;

pub(super) fn render_detail_view(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let Some(detail) = &app.detail else {
        return;
    };

    // Layout: header, campaign info + stream status, KPIs, charts, efficiency, footer
    let chunks = Layout::vertical([
        Constraint::Length(2), // Header
        Constraint::Length(4), // Campaign info | Stream status
        Constraint::Length(8), // KPI grid | Score
        Constraint::Min(8),    // Charts
        Constraint::Length(6), // Efficiency
        Constraint::Length(1), // Footer
    ])
    .split(area);

    render_header(frame, app, &detail.title(), chunks[0]);

    let info_chunks = Layout::horizontal([
        Constraint::Percentage(60), // Campaign info
        Constraint::Percentage(40), // Stream status
    ])
    .split(chunks[1]);
    render_campaign_info(frame, detail, info_chunks[0]);
    render_stream_status(frame, detail, info_chunks[1]);

    let derived = detail.live.derived(detail.budget());
    let current = detail.live.current();

    let kpi_chunks = Layout::horizontal([
        Constraint::Percentage(65), // KPI grid
        Constraint::Percentage(35), // Score + budget
    ])
    .split(chunks[2]);
    render_kpi_panel(frame, current.as_ref(), derived.as_ref(), kpi_chunks[0]);
    render_score_panel(frame, derived.as_ref(), detail.budget(), kpi_chunks[1]);

    render_charts(frame, detail, chunks[3]);
    render_efficiency_panel(frame, derived.as_ref(), chunks[4]);

    let stream_label = if detail.live.is_streaming_enabled() {
        "Pause stream"
    } else {
        "Resume stream"
    };
    render_footer(
        frame,
        &[
            ("Esc", "Back"),
            ("s", stream_label),
            ("r", "Refresh"),
            ("1/2/3", "7/30/90 pts"),
            ("q", "Quit"),
        ],
        chunks[5],
    );
}

fn labeled(label: &str, value: String, value_style: Style) -> Vec<Span<'static>> {
    vec![
        Span::styled(format!("{} ", label), Style::default().fg(LABEL_COLOR)),
        Span::styled(value, value_style),
        Span::raw("  "),
    ]
}

/// Render name, status, brand and platforms.
fn render_campaign_info(frame: &mut Frame, detail: &CampaignDetail, area: Rect) {
    let block = Block::default()
        .title(" Campaign ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_LIST));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = match &detail.campaign {
        Some(campaign) => campaign_info_lines(campaign),
        None => vec![Line::from(Span::styled(
            detail
                .error
                .clone()
                .unwrap_or_else(|| "Loading campaign...".to_string()),
            Style::default().fg(TREND_DOWN),
        ))],
    };

    frame.render_widget(Paragraph::new(lines), inner);
}

fn campaign_info_lines(campaign: &Campaign) -> Vec<Line<'static>> {
    let mut first = labeled(
        "Status",
        campaign.status.to_string(),
        Style::default().fg(status_color(campaign.status)).bold(),
    );
    if !campaign.brand_id.is_empty() {
        first.extend(labeled(
            "Brand",
            campaign.brand_id.clone(),
            Style::default().fg(TEXT_WHITE),
        ));
    }
    if let Some(objective) = &campaign.objective {
        first.extend(labeled(
            "Objective",
            objective.clone(),
            Style::default().fg(TEXT_WHITE),
        ));
    }

    let mut second = labeled(
        "Budget",
        format_currency(campaign.budget),
        Style::default().fg(MONEY_GOLD),
    );
    second.extend(labeled(
        "Daily",
        format_currency(campaign.daily_budget),
        Style::default().fg(MONEY_GOLD),
    ));
    if !campaign.platforms.is_empty() {
        second.extend(labeled(
            "Platforms",
            campaign.platforms.join(", "),
            Style::default().fg(TEXT_DIM),
        ));
    }

    vec![Line::from(first), Line::from(second)]
}

fn stream_status_style(status: &StreamStatus) -> Style {
    match status.state {
        StreamConnectionState::Streaming => Style::default().fg(TREND_UP).bold(),
        StreamConnectionState::Connecting if status.error.is_none() => {
            Style::default().fg(ACCENT_CYAN)
        }
        StreamConnectionState::Disconnected => Style::default().fg(TEXT_DIM),
        _ => Style::default().fg(TREND_DOWN).bold(),
    }
}

/// Render the stream state, last update and any reconnect reason.
fn render_stream_status(frame: &mut Frame, detail: &CampaignDetail, area: Rect) {
    let status = detail.live.status();

    let block = Block::default()
        .title(" Stream ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(stream_status_style(&status));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let indicator = match status.state {
        StreamConnectionState::Streaming => "● ",
        StreamConnectionState::Disconnected => "○ ",
        _ => "◌ ",
    };
    let mut first = vec![Span::styled(
        format!("{}{}", indicator, status.state.label()),
        stream_status_style(&status),
    )];
    first.push(Span::styled(
        format!("  updated {}", format_relative_time_opt(detail.live.last_updated())),
        Style::default().fg(TEXT_DIM),
    ));

    let second = match (&status.error, status.is_reconnecting()) {
        (Some(error), true) => Line::from(Span::styled(
            format!("Reconnecting: {}", error),
            Style::default().fg(TREND_DOWN),
        )),
        _ => Line::from(Span::styled(
            detail.error.clone().unwrap_or_default(),
            Style::default().fg(TREND_DOWN),
        )),
    };

    let paragraph = Paragraph::new(vec![Line::from(first), second]).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn trend_span(trend: &Trend) -> Span<'static> {
    let (arrow, color) = if trend.is_positive {
        ("▲", TREND_UP)
    } else {
        ("▼", TREND_DOWN)
    };
    Span::styled(
        format!(" {}{:.0}%", arrow, trend.percent),
        Style::default().fg(color),
    )
}

/// Render counters with trends and the rate metrics.
fn render_kpi_panel(
    frame: &mut Frame,
    current: Option<&NormalizedMetrics>,
    derived: Option<&DerivedMetrics>,
    area: Rect,
) {
    let block = Block::default()
        .title(" Metrics ")
        .title_style(Style::default().fg(ACCENT_CYAN).bold())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_KPI));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (Some(m), Some(d)) = (current, derived) else {
        let placeholder = Paragraph::new(Span::styled(
            "No metrics yet",
            Style::default().fg(TEXT_DIM),
        ));
        frame.render_widget(placeholder, inner);
        return;
    };

    let value = Style::default().fg(TEXT_WHITE).bold();
    let money = Style::default().fg(MONEY_GOLD).bold();
    let rate = Style::default().fg(ACCENT_PURPLE).bold();
    let roi_style = if d.roi >= 0.0 {
        Style::default().fg(TREND_UP).bold()
    } else {
        Style::default().fg(TREND_DOWN).bold()
    };

    let mut impressions = labeled("Impressions", format_thousands(m.impressions), value);
    impressions.insert(2, trend_span(&d.impressions_trend));
    let mut clicks = labeled("Clicks", format_thousands(m.clicks), value);
    clicks.insert(2, trend_span(&d.clicks_trend));
    let mut conversions = labeled("Conversions", format_thousands(m.conversions), value);
    conversions.insert(2, trend_span(&d.conversions_trend));
    let mut spend = labeled("Spend", format_currency(m.spend), money);
    spend.insert(2, trend_span(&d.spend_trend));

    let mut row1 = impressions;
    row1.extend(clicks);
    let mut row2 = conversions;
    row2.extend(spend);

    let mut row3 = labeled("CTR", format_percent(d.ctr, 2), rate);
    row3.extend(labeled("CPC", format_currency(d.cpc), rate));
    row3.extend(labeled("Conv. rate", format_percent(d.conversion_rate, 2), rate));

    let mut row4 = labeled("Revenue", format_currency(d.revenue), money);
    row4.extend(labeled("ROI", format_percent(d.roi, 1), roi_style));
    row4.extend(labeled("Cost/conv.", format_currency(d.cost_per_conversion), money));

    let mut row5 = labeled("Engagement", format_percent(d.engagement, 2), rate);
    if m.is_realtime {
        row5.push(Span::styled("live", Style::default().fg(TREND_UP)));
    } else {
        row5.push(Span::styled("snapshot", Style::default().fg(TEXT_DIM)));
    }

    let lines: Vec<Line> = [row1, row2, row3, row4, row5]
        .into_iter()
        .map(Line::from)
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn grade_color(grade: PerformanceGrade) -> Color {
    match grade {
        PerformanceGrade::Excellent => TREND_UP,
        PerformanceGrade::Good => MONEY_GOLD,
        PerformanceGrade::NeedsImprovement => TREND_DOWN,
    }
}

/// Render the performance score and the budget utilization gauge.
fn render_score_panel(
    frame: &mut Frame,
    derived: Option<&DerivedMetrics>,
    budget: Option<f64>,
    area: Rect,
) {
    let block = Block::default()
        .title(" Performance ")
        .title_style(Style::default().fg(ACCENT_CYAN).bold())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_KPI));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(d) = derived else {
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(2), // Score
        Constraint::Length(1), // Gauge label
        Constraint::Length(1), // Gauge
    ])
    .split(inner);

    let score = Paragraph::new(vec![Line::from(vec![
        Span::styled("Score ", Style::default().fg(LABEL_COLOR)),
        Span::styled(
            format!("{:.1}", d.performance_score),
            Style::default().fg(TEXT_WHITE).bold(),
        ),
        Span::styled(
            format!("  {}", d.grade.label()),
            Style::default().fg(grade_color(d.grade)).bold(),
        ),
    ])]);
    frame.render_widget(score, chunks[0]);

    let label = match budget {
        Some(budget) => format!("Budget used of {}", format_currency(budget)),
        None => "No budget set".to_string(),
    };
    frame.render_widget(
        Paragraph::new(Span::styled(label, Style::default().fg(TEXT_DIM))),
        chunks[1],
    );

    let utilization = d.budget_utilization;
    let gauge_color = if utilization >= 90.0 {
        TREND_DOWN
    } else if utilization >= 70.0 {
        MONEY_GOLD
    } else {
        TREND_UP
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(gauge_color).bg(GAUGE_BG))
        .ratio((utilization / 100.0).clamp(0.0, 1.0))
        .label(Span::styled(
            format!("{:.0}%", utilization),
            Style::default().fg(TEXT_WHITE).bold(),
        ));
    frame.render_widget(gauge, chunks[2]);
}

/// Sparklines take integer data; scale rates so small values stay visible.
fn sparkline_data(series: &[f64], scale: f64) -> Vec<u64> {
    series
        .iter()
        .map(|v| (v * scale).max(0.0).round() as u64)
        .collect()
}

/// Render one sparkline per series for the selected time range.
fn render_charts(frame: &mut Frame, detail: &CampaignDetail, area: Rect) {
    let range = detail.time_range;
    let summary = detail.live.summary(range);

    let title = Line::from(vec![
        Span::styled(" Trends ", Style::default().fg(ACCENT_CYAN).bold()),
        Span::styled(
            TimeRange::ALL
                .iter()
                .map(|r| {
                    if *r == range {
                        format!("[{}]", r.label())
                    } else {
                        format!(" {} ", r.label())
                    }
                })
                .collect::<String>(),
            Style::default().fg(TEXT_DIM),
        ),
        Span::styled(
            format!(" {} of {} points ", summary.points, range.points()),
            Style::default().fg(TEXT_DIM),
        ),
    ]);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_CHART));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let series: [(&str, Vec<u64>, Color); 4] = [
        (
            "Impressions",
            sparkline_data(&detail.live.series(range, |m| m.impressions), 1.0),
            ACCENT_CYAN,
        ),
        (
            "Clicks",
            sparkline_data(&detail.live.series(range, |m| m.clicks), 1.0),
            TREND_UP,
        ),
        (
            "CTR",
            sparkline_data(&detail.live.series(range, |m| m.ctr), 100.0),
            ACCENT_PURPLE,
        ),
        (
            "Spend",
            sparkline_data(&detail.live.series(range, |m| m.spend), 100.0),
            MONEY_GOLD,
        ),
    ];

    let sections = Layout::vertical([
        Constraint::Min(4),    // Sparklines
        Constraint::Length(1), // Window totals
    ])
    .split(inner);
    render_window_summary(frame, &summary, sections[1]);

    let rows = Layout::vertical([Constraint::Ratio(1, 4); 4]).split(sections[0]);
    for ((label, data, color), row) in series.iter().zip(rows.iter()) {
        let cols = Layout::horizontal([
            Constraint::Length(13), // Label
            Constraint::Min(1),     // Sparkline
        ])
        .split(*row);

        frame.render_widget(
            Paragraph::new(Span::styled(*label, Style::default().fg(LABEL_COLOR))),
            cols[0],
        );
        let sparkline = Sparkline::default()
            .data(data)
            .style(Style::default().fg(*color))
            .bar_set(symbols::bar::NINE_LEVELS);
        frame.render_widget(sparkline, cols[1]);
    }
}

fn growth_span(label: &str, growth: f64) -> Span<'static> {
    let color = if growth >= 0.0 { TREND_UP } else { TREND_DOWN };
    Span::styled(
        format!("{} {:+.1}%  ", label, growth),
        Style::default().fg(color),
    )
}

/// Totals and growth across the selected window.
fn render_window_summary(frame: &mut Frame, summary: &WindowSummary, area: Rect) {
    if summary.points == 0 {
        return;
    }
    let mut spans = labeled(
        "Spend",
        format_currency(summary.total_spend),
        Style::default().fg(MONEY_GOLD),
    );
    spans.extend(labeled(
        "Avg CTR",
        format_percent(summary.avg_ctr, 2),
        Style::default().fg(ACCENT_PURPLE),
    ));
    spans.extend(labeled(
        "Avg ROI",
        format_percent(summary.avg_roi, 1),
        Style::default().fg(TEXT_WHITE),
    ));
    spans.push(growth_span("Impr.", summary.impressions_growth));
    spans.push(growth_span("Clicks", summary.clicks_growth));
    spans.push(growth_span("Conv.", summary.conversions_growth));
    spans.push(growth_span("Revenue", summary.revenue_growth));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render efficiency metrics against their targets.
fn render_efficiency_panel(frame: &mut Frame, derived: Option<&DerivedMetrics>, area: Rect) {
    let header = Row::new([
        Cell::from("Metric"),
        Cell::from("Value"),
        Cell::from("Target"),
        Cell::from(""),
    ])
    .style(Style::default().fg(LABEL_COLOR).bold());

    let rows: Vec<Row> = derived
        .map(|d| d.efficiency.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|metric| {
            let (mark, color) = if metric.meets_target() {
                ("on target", TREND_UP)
            } else {
                ("below target", TREND_DOWN)
            };
            let format_value = |v: f64| {
                if metric.lower_is_better {
                    format_currency(v)
                } else {
                    format_percent(v, 2)
                }
            };
            Row::new([
                Cell::from(metric.name),
                Cell::from(format_value(metric.value)).style(Style::default().fg(TEXT_WHITE)),
                Cell::from(format_value(metric.target)).style(Style::default().fg(TEXT_DIM)),
                Cell::from(mark).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(24), // Metric
        Constraint::Length(12), // Value
        Constraint::Length(12), // Target
        Constraint::Fill(1),    // Status
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(" Efficiency ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(BORDER_CHART)),
    );
    frame.render_widget(table, area);
}

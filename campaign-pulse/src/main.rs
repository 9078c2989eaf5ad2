//! campaign-pulse - live marketing campaign dashboard
//!
//! Terminal UI for browsing campaigns and watching their metrics stream in.

mod app;
mod ui;

use std::io;

use anyhow::{Context, Result};
use campaign_pulse_core::format::{format_compact, format_currency, format_percent};
use campaign_pulse_core::{CampaignClient, CampaignId, Config};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;

use crate::app::App;

#[derive(Parser)]
#[command(name = "campaign-pulse")]
#[command(about = "Live terminal dashboard for marketing campaign metrics")]
#[command(version)]
struct Args {
    /// Campaign API base URL (overrides the config file and environment)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Don't open the live metrics stream when a campaign is opened
    #[arg(long, global = true)]
    no_stream: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print all campaigns and the global insights, then exit
    Campaigns,
    /// Open the dashboard directly on one campaign
    Watch {
        /// Campaign ID
        campaign_id: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.api.base_url = Some(base_url);
    }
    if args.no_stream {
        config.stream.enabled = false;
    }

    // Initialize logging (to file, not stdout since we have a TUI)
    let _log_guard = campaign_pulse_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!(
        base_url = %config.api.base_url(),
        log_file = %campaign_pulse_core::logging::log_file_path().display(),
        "campaign-pulse starting up"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let client = CampaignClient::new(&config.api).context("failed to create API client")?;

    match args.command {
        Some(Command::Campaigns) => print_campaigns(&runtime, &client),
        Some(Command::Watch { campaign_id }) => {
            run_tui(runtime, client, config, Some(CampaignId::from(campaign_id)))
        }
        None => run_tui(runtime, client, config, None),
    }
}

/// Print the campaign table and global insights to stdout.
fn print_campaigns(runtime: &Runtime, client: &CampaignClient) -> Result<()> {
    let campaigns = runtime
        .block_on(client.list_campaigns())
        .with_context(|| format!("failed to list campaigns from {}", client.base_url()))?;

    println!(
        "{:<14} {:<28} {:<10} {:>12} {:>12} {:>7}",
        "ID", "NAME", "STATUS", "BUDGET", "SPEND", "CTR"
    );
    for campaign in &campaigns {
        println!(
            "{:<14} {:<28} {:<10} {:>12} {:>12} {:>7}",
            truncate(campaign.id.as_str(), 14),
            truncate(campaign.display_name(), 28),
            campaign.status,
            format_currency(campaign.budget),
            campaign
                .spend
                .map(format_currency)
                .unwrap_or_else(|| "-".to_string()),
            campaign
                .ctr
                .map(|ctr| format_percent(ctr, 2))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    println!();
    println!("{} campaigns", campaigns.len());

    match runtime.block_on(client.fetch_global_insights()) {
        Ok(insights) => {
            println!();
            println!("Global insights:");
            println!(
                "  Campaigns:   {:.0} total, {:.0} active, {:.0} paused, {:.0} completed",
                insights.total_campaigns,
                insights.active_campaigns,
                insights.paused_campaigns,
                insights.completed_campaigns
            );
            println!(
                "  Impressions: {}  Clicks: {}  Conversions: {}",
                format_compact(insights.total_impressions),
                format_compact(insights.total_clicks),
                format_compact(insights.total_conversions)
            );
            println!(
                "  Spend:       {}  Avg CTR: {}  Avg CPC: {}",
                format_currency(insights.total_spend),
                format_percent(insights.avg_ctr, 2),
                format_currency(insights.avg_cpc)
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch global insights");
            eprintln!("Global insights unavailable: {}", e);
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Set up the terminal, run the dashboard, and restore the terminal.
fn run_tui(
    runtime: Runtime,
    client: CampaignClient,
    config: Config,
    campaign_id: Option<CampaignId>,
) -> Result<()> {
    let mut app = App::new(runtime, client, config);
    match campaign_id {
        Some(id) => app.open_campaign(id),
        None => app.load_campaigns(),
    }

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    tracing::info!("campaign-pulse shutting down");

    result
}

/// Run the main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Pull in whatever the stream published since the last frame
        app.tick();

        // Render
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    Ok(())
}

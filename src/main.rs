#[cfg(feature = "gui")]
mod app;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rms_dashboard::{
    AnalysisFilters, AnalysisType, AnalyticsClient, FetchEvent, FetchTask, RequestScope,
    analysis::lookback_start, config::AppConfig, render_report,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[cfg(feature = "gui")]
use crate::app::{DashboardApp, Message};

#[derive(Parser, Debug)]
#[command(name = "rms-dashboard")]
#[command(about = "Restaurant analytics dashboard - GUI or headless analysis runner")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one analysis and print the report
    Run {
        /// Analysis key, e.g. peak_dining or revenue_analysis
        analysis: String,
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day of the range (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Restrict to a single outlet
        #[arg(long)]
        outlet: Option<String>,
        /// Use the unfiltered snapshot endpoint
        #[arg(long)]
        snapshot: bool,
    },
    /// Check whether the analytics backend is reachable
    Health,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    #[cfg(feature = "gui")]
    let filter = if args.command.is_some() {
        EnvFilter::builder()
            .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
            .parse_lossy("rms_dashboard=debug")
    } else {
        EnvFilter::builder()
            .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
            .parse_lossy("rms_dashboard=debug,fontdb=error,wgpu=warn,naga=warn")
    };

    #[cfg(not(feature = "gui"))]
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .parse_lossy("rms_dashboard=debug");

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let config = Arc::new(config);

    let client = AnalyticsClient::new(&config.backend, &config.network)
        .context("Failed to create analytics client")?;

    match args.command {
        Some(Command::Run {
            analysis,
            start,
            end,
            outlet,
            snapshot,
        }) => {
            let end = end.unwrap_or_else(|| Local::now().date_naive());
            let start =
                start.unwrap_or_else(|| lookback_start(end, config.filters.default_lookback_days));
            if start > end {
                anyhow::bail!("Start date {} is after end date {}", start, end);
            }
            let filters = AnalysisFilters {
                start_date: start,
                end_date: end,
                outlet_id: outlet.filter(|o| !o.trim().is_empty()),
                scope: if snapshot {
                    RequestScope::Snapshot
                } else {
                    RequestScope::Filtered
                },
            };
            let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
            run_analysis(rt, client, analysis, filters)
        }
        Some(Command::Health) => {
            let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
            run_health(rt, client)
        }
        None => {
            #[cfg(feature = "gui")]
            {
                run_gui(config, client)
            }
            #[cfg(not(feature = "gui"))]
            {
                anyhow::bail!("GUI mode not available. Build with --features gui or use `run`/`health`")
            }
        }
    }
}

/// Run one analysis headlessly, logging progress and printing the report
fn run_analysis(
    rt: tokio::runtime::Runtime,
    client: AnalyticsClient,
    analysis_key: String,
    filters: AnalysisFilters,
) -> Result<()> {
    let outcome = rt.block_on(async {
        tracing::info!(
            "Running {} for {} to {}",
            analysis_key,
            filters.start_date,
            filters.end_date
        );

        let mut handle = FetchTask::spawn(client, analysis_key.clone(), filters);
        let mut outcome = None;
        while let Some(event) = handle.next_event().await {
            match event {
                FetchEvent::Progress(p) => tracing::info!("Progress: {}%", p),
                FetchEvent::Finished(result) => outcome = Some(result),
            }
        }
        outcome
    });

    let payload = match outcome {
        Some(Ok(payload)) => payload,
        Some(Err(e)) => anyhow::bail!("{} failed ({:?}): {}", analysis_key, e.kind(), e),
        None => anyhow::bail!("{} ended without an outcome", analysis_key),
    };

    // Only a known key can produce a payload
    let analysis: AnalysisType = analysis_key.parse()?;
    println!("{}", render_report(analysis, &payload));
    Ok(())
}

fn run_health(rt: tokio::runtime::Runtime, client: AnalyticsClient) -> Result<()> {
    let healthy = rt.block_on(client.check_health());
    if healthy {
        println!("Backend at {} is reachable", client.root());
        Ok(())
    } else {
        anyhow::bail!("Backend at {} is unreachable", client.root())
    }
}

/// Run in GUI mode - desktop dashboard
#[cfg(feature = "gui")]
fn run_gui(config: Arc<AppConfig>, client: AnalyticsClient) -> Result<()> {
    let window_width = config.window.width;
    let window_height = config.window.height;

    let app = iced::application(
        move || DashboardApp::new(config.clone(), client.clone()),
        update,
        view,
    )
    .title(title)
    .theme(theme)
    .window(iced::window::Settings {
        size: iced::Size::new(window_width, window_height),
        ..Default::default()
    })
    .antialiasing(true);

    app.run().context("Failed to run application")?;

    Ok(())
}

#[cfg(feature = "gui")]
fn update(app: &mut DashboardApp, message: Message) -> iced::Task<Message> {
    app.update(message)
}

#[cfg(feature = "gui")]
fn view(app: &DashboardApp) -> iced::Element<'_, Message> {
    app.view()
}

#[cfg(feature = "gui")]
fn title(app: &DashboardApp) -> String {
    app.title()
}

#[cfg(feature = "gui")]
fn theme(app: &DashboardApp) -> iced::Theme {
    app.theme()
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line dashboard for the solar flare API.
//!
//! With no subcommand, starts an interactive menu. Collection requests
//! show a live progress line while the workflow confirms that new records
//! arrived.
//!
//! Uses `indicatif-log-bridge` (via [`solar_flares_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;
mod interactive;

use std::time::Duration;

use clap::{Parser, Subcommand};
use solar_flares_ingestion::DashboardConfig;
use solar_flares_ingestion_models::SnapshotScope;
use solar_flares_listing::{ListingViewModel, SortConfig, SortDirection, SortKey};

use crate::commands::App;

#[derive(Parser)]
#[command(name = "solar_flares", about = "Solar flare dashboard")]
struct Cli {
    /// API base URL (overrides `SOLAR_FLARES_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger data collection for a date range and wait for new records.
    /// Without --start/--end, collects the last 30 days.
    Collect {
        /// Range start, local time (e.g., "2024-01-01T00:00")
        #[arg(long)]
        start: Option<String>,
        /// Range end, local time
        #[arg(long)]
        end: Option<String>,
        /// Maximum number of confirmation polls
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Delay between confirmation polls, in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Give up once failing reads run past this many milliseconds
        #[arg(long)]
        max_wait_ms: Option<u64>,
        /// Count the whole store ("all") or only the range ("range")
        #[arg(long)]
        scope: Option<SnapshotScope>,
        /// Print the listing for the range afterwards
        #[arg(long)]
        list: bool,
    },
    /// List stored solar flares
    List {
        /// Only flares from this start (local time)
        #[arg(long)]
        start: Option<String>,
        /// Only flares up to this end (local time)
        #[arg(long)]
        end: Option<String>,
        /// Column to sort by (e.g., "`class_type`"). Defaults to newest
        /// first.
        #[arg(long)]
        sort: Option<SortKey>,
        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },
    /// Show one solar flare by its flare ID
    Show {
        /// Flare identifier (e.g., "2024-01-01T00:10:00-FLR-001")
        flr_id: String,
    },
    /// Show class frequency, activity summary, and the longest flare.
    /// Without --start/--end, covers the last 30 days.
    Analytics {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = solar_flares_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = DashboardConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api.base_url = api_url;
    }
    if let Some(Commands::Collect {
        max_attempts,
        interval_ms,
        max_wait_ms,
        scope,
        ..
    }) = &cli.command
    {
        if let Some(attempts) = max_attempts {
            config.poll.max_attempts = *attempts;
        }
        if let Some(ms) = interval_ms {
            config.poll.interval = Duration::from_millis(*ms);
        }
        if let Some(ms) = max_wait_ms {
            config.poll.max_wait = Some(Duration::from_millis(*ms));
        }
        if let Some(scope) = scope {
            config.snapshot_scope = *scope;
        }
    }
    config.validate()?;

    let app = App::new(&config)?;

    let Some(command) = cli.command else {
        println!("Solar Flare Dashboard");
        println!();
        return interactive::run(&app, &multi).await;
    };

    match command {
        Commands::Collect {
            start, end, list, ..
        } => {
            let range =
                commands::collect(&app, &multi, start.as_deref(), end.as_deref()).await?;
            if list {
                let mut view = ListingViewModel::new(SortConfig::default());
                commands::list(&app, Some(&range), &mut view).await?;
            }
        }
        Commands::List {
            start,
            end,
            sort,
            desc,
        } => {
            let range = commands::optional_range(start.as_deref(), end.as_deref())?;
            let config = sort.map_or_else(SortConfig::default, |key| {
                let direction = if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                SortConfig::new(key, direction)
            });
            let mut view = ListingViewModel::new(config);
            commands::list(&app, range.as_ref(), &mut view).await?;
        }
        Commands::Show { flr_id } => commands::show(&app, &flr_id).await?,
        Commands::Analytics { start, end } => {
            let range = commands::optional_range(start.as_deref(), end.as_deref())?
                .unwrap_or_else(commands::default_range);
            commands::analytics(&app, &range).await?;
        }
    }

    Ok(())
}

//! Command implementations shared by the subcommands and the interactive
//! menu.

use chrono::{DateTime, Local, Utc};
use solar_flares_api::ApiClient;
use solar_flares_cli_utils::{MultiProgress, WorkflowSpinner};
use solar_flares_flare_models::{DateRange, FlareRecord};
use solar_flares_ingestion::{DashboardConfig, TriggerWorkflow, range};
use solar_flares_ingestion_models::WorkflowOutcome;
use solar_flares_listing::{ListingViewModel, SortKey};
use strum::IntoEnumIterator as _;

/// Days covered when no range is given.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Shared client state for one CLI session.
pub struct App {
    pub client: ApiClient,
    pub workflow: TriggerWorkflow<ApiClient, ApiClient>,
}

impl App {
    /// Builds the API client and an idle collection workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is unusable.
    pub fn new(config: &DashboardConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let client = ApiClient::new(&config.api)?;
        let workflow = TriggerWorkflow::new(
            client.clone(),
            client.clone(),
            config.poll,
            config.snapshot_scope,
        );
        log::debug!(
            "Using {} (poll {}x{:?}, scope {})",
            client.base_url(),
            config.poll.max_attempts,
            config.poll.interval,
            config.snapshot_scope
        );
        Ok(Self { client, workflow })
    }
}

/// The last [`DEFAULT_WINDOW_DAYS`] days.
#[must_use]
pub fn default_range() -> DateRange {
    range::trailing_days(Utc::now(), DEFAULT_WINDOW_DAYS)
}

/// Turns optional `--start`/`--end` flags into a range.
///
/// # Errors
///
/// Returns an error if only one bound is given or the bounds are invalid.
pub fn optional_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<DateRange>, Box<dyn std::error::Error>> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(range::normalize(start, end)?)),
        (None, None) => Ok(None),
        _ => Err("--start and --end must be given together".into()),
    }
}

/// Triggers collection for the given raw bounds (or the default window)
/// and follows it until it resolves. Returns the submitted range.
///
/// # Errors
///
/// Returns an error if the range is invalid or the workflow fails.
pub async fn collect(
    app: &App,
    multi: &MultiProgress,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<DateRange, Box<dyn std::error::Error>> {
    let handle = match (start, end) {
        (Some(start), Some(end)) => app.workflow.submit(start, end)?,
        (None, None) => app.workflow.submit_range(default_range()),
        _ => return Err("--start and --end must be given together".into()),
    };

    let range = *handle.range();
    println!("Collecting solar flares for {range}");

    let spinner = WorkflowSpinner::new(multi);
    spinner.follow(app.workflow.subscribe()).await;

    match handle.outcome().await {
        Some(WorkflowOutcome::Failed { reason }) => Err(reason.into()),
        Some(_) => Ok(range),
        None => Err("collection was superseded by a newer request".into()),
    }
}

/// Fetches and prints the listing.
///
/// # Errors
///
/// Returns an error if the API request fails.
pub async fn list(
    app: &App,
    range: Option<&DateRange>,
    view: &mut ListingViewModel,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = app.client.list_flares(range).await?;
    view.refresh(records);
    print_table(view);
    Ok(())
}

/// Prints the listing with the active sort column marked.
pub fn print_table(view: &ListingViewModel) {
    if view.is_empty() {
        println!("No solar flares found.");
        return;
    }

    let config = view.sort_config();
    let heading = |key: SortKey| {
        if key == config.key {
            format!("{} {}", key.label(), config.direction.arrow())
        } else {
            key.label().to_string()
        }
    };

    println!(
        "{:<32} {:<8} {:<17} {:<17} {:<17} {:<10} {}",
        heading(SortKey::FlrId),
        heading(SortKey::ClassType),
        heading(SortKey::BeginTime),
        heading(SortKey::PeakTime),
        heading(SortKey::EndTime),
        heading(SortKey::SourceLocation),
        heading(SortKey::ActiveRegionNum),
    );
    println!("{}", "-".repeat(115));

    for record in view.rows() {
        println!(
            "{:<32} {:<8} {:<17} {:<17} {:<17} {:<10} {}",
            record.flr_id,
            record.class_type,
            local_time(record.begin_time),
            local_time(record.peak_time),
            record.end_time.map_or_else(|| "-".to_string(), local_time),
            record.source_location.as_deref().unwrap_or("-"),
            record
                .active_region_num
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
        );
    }

    println!();
    println!("{} flare(s), sorted by {config}", view.rows().len());
}

/// Labels for the sortable columns, in [`SortKey::iter`] order.
#[must_use]
pub fn sort_labels() -> Vec<String> {
    SortKey::iter()
        .map(|key| format!("Sort by {}", key.label()))
        .collect()
}

/// Fetches and prints one flare.
///
/// # Errors
///
/// Returns an error if the flare does not exist or the request fails.
pub async fn show(app: &App, flr_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let record = match app.client.get_flare(flr_id).await {
        Ok(record) => record,
        Err(e) if e.is_not_found() => return Err(format!("No solar flare {flr_id:?}").into()),
        Err(e) => return Err(e.into()),
    };
    print_record(&record)?;
    Ok(())
}

fn print_record(record: &FlareRecord) -> Result<(), serde_json::Error> {
    println!("Flare:           {}", record.flr_id);
    println!("Class:           {}", record.class_type);
    println!("Begin:           {}", local_time(record.begin_time));
    println!("Peak:            {}", local_time(record.peak_time));
    println!(
        "End:             {}",
        record.end_time.map_or_else(|| "-".to_string(), local_time)
    );
    println!(
        "Location:        {}",
        record.source_location.as_deref().unwrap_or("-")
    );
    println!(
        "Active region:   {}",
        record
            .active_region_num
            .map_or_else(|| "-".to_string(), |n| n.to_string())
    );
    if let Some(linked) = &record.linked_events {
        println!("Linked events:");
        println!("{}", serde_json::to_string_pretty(linked)?);
    }
    Ok(())
}

/// Prints the three analytics aggregates for `range`.
///
/// # Errors
///
/// Returns an error if any request fails.
pub async fn analytics(app: &App, range: &DateRange) -> Result<(), Box<dyn std::error::Error>> {
    let peak = app.client.peak_frequency(range).await?;
    let summary = app.client.activity_summary(range).await?;
    let longest = app.client.longest_flare(range).await?;

    println!("Analytics for {range}");
    println!();
    println!("Total flares:        {}", summary.total_flares);
    println!("Peak intensity:      {}", summary.peak_intensity_class);
    println!(
        "Most common class:   {}",
        peak.most_common_class.as_deref().unwrap_or("-")
    );

    if !summary.intensity_counts.is_empty() {
        println!();
        println!("{:<10} COUNT", "CLASS");
        for (class, count) in &summary.intensity_counts {
            println!("{class:<10} {count}");
        }
    }

    println!();
    match longest {
        Some(flare) => println!(
            "Longest flare:       {} ({}, {:.0} min)",
            flare.flr_id,
            flare.class_type,
            flare.duration_seconds / 60.0
        ),
        None => println!("Longest flare:       -"),
    }
    Ok(())
}

fn local_time(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format(DISPLAY_FORMAT).to_string()
}

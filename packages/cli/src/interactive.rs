//! Menu-driven interface using `dialoguer`, for running the dashboard
//! without memorizing subcommands.

use chrono::Local;
use dialoguer::{Input, Select};
use solar_flares_cli_utils::MultiProgress;
use solar_flares_flare_models::DateRange;
use solar_flares_ingestion::range;
use solar_flares_listing::{ListingViewModel, SortConfig, SortKey};
use strum::IntoEnumIterator as _;

use crate::commands::{self, App};

/// Top-level actions available in the interactive menu.
enum Action {
    Collect,
    Browse,
    Show,
    Analytics,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Collect,
        Self::Browse,
        Self::Show,
        Self::Analytics,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Collect => "Collect new data",
            Self::Browse => "Browse solar flares",
            Self::Show => "Show one flare",
            Self::Analytics => "Analytics",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the menu loop until the user quits.
///
/// Failures of individual actions are reported and the menu is shown
/// again.
///
/// # Errors
///
/// Returns an error if the terminal prompt itself fails.
pub async fn run(app: &App, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let mut view = ListingViewModel::new(SortConfig::default());

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        let result = match Action::ALL[idx] {
            Action::Collect => collect(app, multi).await,
            Action::Browse => browse(app, &mut view).await,
            Action::Show => show(app).await,
            Action::Analytics => analytics(app).await,
            Action::Quit => return Ok(()),
        };

        if let Err(e) = result {
            log::error!("{e}");
        }
        println!();
    }
}

async fn collect(app: &App, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let (start, end) = prompt_bounds()?;
    commands::collect(app, multi, Some(&start), Some(&end)).await?;
    Ok(())
}

async fn browse(app: &App, view: &mut ListingViewModel) -> Result<(), Box<dyn std::error::Error>> {
    commands::list(app, None, view).await?;
    if view.is_empty() {
        return Ok(());
    }

    let mut labels = commands::sort_labels();
    labels.push("Back".to_string());
    let keys: Vec<SortKey> = SortKey::iter().collect();

    loop {
        let idx = Select::new()
            .with_prompt(format!("Sorted by {}", view.sort_config()))
            .items(&labels)
            .default(0)
            .interact()?;

        let Some(key) = keys.get(idx).copied() else {
            return Ok(());
        };
        view.request_sort(key);
        commands::print_table(view);
    }
}

async fn show(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    let flr_id: String = Input::new().with_prompt("Flare ID").interact_text()?;
    commands::show(app, flr_id.trim()).await
}

async fn analytics(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    let range = prompt_range()?;
    commands::analytics(app, &range).await
}

/// Asks for start and end, pre-filled with the default window.
fn prompt_bounds() -> Result<(String, String), Box<dyn std::error::Error>> {
    let default = commands::default_range();

    let start: String = Input::new()
        .with_prompt("Start (YYYY-MM-DDTHH:MM)")
        .default(range::format_for_input(default.start(), &Local))
        .interact_text()?;
    let end: String = Input::new()
        .with_prompt("End (YYYY-MM-DDTHH:MM)")
        .default(range::format_for_input(default.end(), &Local))
        .interact_text()?;

    Ok((start, end))
}

fn prompt_range() -> Result<DateRange, Box<dyn std::error::Error>> {
    let (start, end) = prompt_bounds()?;
    Ok(range::normalize(&start, &end)?)
}

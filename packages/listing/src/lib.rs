#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sorting for the solar flare listing.
//!
//! [`sorted_view`] is the pure core; [`ListingViewModel`] keeps the last
//! fetched records together with the user's sort choice so a table can be
//! redrawn after every click.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use solar_flares_flare_models::FlareRecord;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A sortable column. Parses from and prints as the record field name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortKey {
    FlrId,
    ClassType,
    BeginTime,
    PeakTime,
    EndTime,
    SourceLocation,
    ActiveRegionNum,
}

impl SortKey {
    /// Whether values in this column are instants.
    #[must_use]
    pub const fn is_timestamp(self) -> bool {
        matches!(self, Self::BeginTime | Self::PeakTime | Self::EndTime)
    }

    /// Column heading.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FlrId => "Flare ID",
            Self::ClassType => "Class",
            Self::BeginTime => "Begin",
            Self::PeakTime => "Peak",
            Self::EndTime => "End",
            Self::SourceLocation => "Location",
            Self::ActiveRegionNum => "Region",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Indicator shown next to the active column heading.
    #[must_use]
    pub const fn arrow(self) -> &'static str {
        match self {
            Self::Asc => "▲",
            Self::Desc => "▼",
        }
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    /// Newest flares first.
    fn default() -> Self {
        Self {
            key: SortKey::BeginTime,
            direction: SortDirection::Desc,
        }
    }
}

impl SortConfig {
    #[must_use]
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// The config after a click on `key`: the active column flips
    /// direction, any other column becomes active in ascending order.
    #[must_use]
    pub fn toggle(self, key: SortKey) -> Self {
        if self.key == key {
            Self::new(key, self.direction.flipped())
        } else {
            Self::new(key, SortDirection::Asc)
        }
    }
}

impl std::fmt::Display for SortConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.key, self.direction)
    }
}

/// Ascending order of two records by `key`.
///
/// Timestamps compare as instants. Missing optional values sort first.
#[must_use]
pub fn compare(a: &FlareRecord, b: &FlareRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::FlrId => a.flr_id.cmp(&b.flr_id),
        SortKey::ClassType => a.class_type.cmp(&b.class_type),
        SortKey::BeginTime => a.begin_time.cmp(&b.begin_time),
        SortKey::PeakTime => a.peak_time.cmp(&b.peak_time),
        SortKey::EndTime => a.end_time.cmp(&b.end_time),
        SortKey::SourceLocation => a.source_location.cmp(&b.source_location),
        SortKey::ActiveRegionNum => a.active_region_num.cmp(&b.active_region_num),
    }
}

/// Returns `records` ordered by `config`, leaving the input untouched.
///
/// The sort is stable in both directions: records that compare equal keep
/// their relative input order.
#[must_use]
pub fn sorted_view(records: &[FlareRecord], config: SortConfig) -> Vec<FlareRecord> {
    let mut rows = records.to_vec();
    rows.sort_by(|a, b| {
        let ordering = compare(a, b, config.key);
        match config.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    rows
}

/// The listing as the user sees it.
#[derive(Debug, Clone, Default)]
pub struct ListingViewModel {
    records: Vec<FlareRecord>,
    config: SortConfig,
    rows: Vec<FlareRecord>,
}

impl ListingViewModel {
    #[must_use]
    pub fn new(config: SortConfig) -> Self {
        Self {
            records: Vec::new(),
            config,
            rows: Vec::new(),
        }
    }

    /// Replaces the records, keeping the current sort.
    pub fn refresh(&mut self, records: Vec<FlareRecord>) {
        log::debug!("Listing refreshed with {} records", records.len());
        self.records = records;
        self.rows = sorted_view(&self.records, self.config);
    }

    /// Applies a click on a column heading and returns the new config.
    pub fn request_sort(&mut self, key: SortKey) -> SortConfig {
        self.config = self.config.toggle(key);
        self.rows = sorted_view(&self.records, self.config);
        self.config
    }

    /// Records in display order.
    #[must_use]
    pub fn rows(&self) -> &[FlareRecord] {
        &self.rows
    }

    #[must_use]
    pub const fn sort_config(&self) -> SortConfig {
        self.config
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use solar_flares_flare_models::timestamp;
    use strum::IntoEnumIterator as _;

    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        timestamp::parse(s).unwrap()
    }

    fn flare(flr_id: &str, class_type: &str, begin: &str) -> FlareRecord {
        let begin_time = utc(begin);
        FlareRecord {
            id: 0,
            flr_id: flr_id.to_string(),
            begin_time,
            peak_time: begin_time,
            end_time: None,
            class_type: class_type.to_string(),
            source_location: None,
            active_region_num: None,
            linked_events: None,
        }
    }

    fn ids(rows: &[FlareRecord]) -> Vec<&str> {
        rows.iter().map(|r| r.flr_id.as_str()).collect()
    }

    fn sample() -> Vec<FlareRecord> {
        vec![
            flare("b", "M1.0", "2024-01-02T00:00:00Z"),
            flare("a", "X2.1", "2024-01-03T00:00:00Z"),
            flare("c", "C3.4", "2024-01-01T00:00:00Z"),
        ]
    }

    #[test]
    fn default_is_newest_first() {
        assert_eq!(
            SortConfig::default(),
            SortConfig::new(SortKey::BeginTime, SortDirection::Desc)
        );
        assert_eq!(
            ids(&sorted_view(&sample(), SortConfig::default())),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn toggle_flips_same_key_and_resets_new_key() {
        let config = SortConfig::new(SortKey::BeginTime, SortDirection::Desc);
        assert_eq!(
            config.toggle(SortKey::BeginTime).direction,
            SortDirection::Asc
        );
        assert_eq!(
            config.toggle(SortKey::ClassType),
            SortConfig::new(SortKey::ClassType, SortDirection::Asc)
        );
        assert_eq!(
            config.toggle(SortKey::FlrId).toggle(SortKey::FlrId).direction,
            SortDirection::Desc
        );
    }

    #[test]
    fn double_toggle_restores_order() {
        let records = sample();
        for key in SortKey::iter() {
            let config = SortConfig::new(key, SortDirection::Asc);
            let twice = config.toggle(key).toggle(key);
            assert_eq!(
                sorted_view(&records, twice),
                sorted_view(&records, config),
                "{key}"
            );
        }
    }

    #[test]
    fn sorting_is_idempotent() {
        let records = sample();
        for key in SortKey::iter() {
            for direction in [SortDirection::Asc, SortDirection::Desc] {
                let config = SortConfig::new(key, direction);
                let once = sorted_view(&records, config);
                assert_eq!(sorted_view(&once, config), once, "{config}");
            }
        }
    }

    #[test]
    fn timestamps_compare_as_instants() {
        let late = flare("late", "C1.0", "2024-01-01T06:00:00+05:00");
        let early = flare("early", "C1.0", "2024-01-01T02:00:00Z");

        // 06:00+05:00 is 01:00Z, so it precedes 02:00Z despite the larger
        // wall-clock text.
        let rows = sorted_view(
            &[early, late],
            SortConfig::new(SortKey::BeginTime, SortDirection::Asc),
        );
        assert_eq!(ids(&rows), vec!["late", "early"]);
        assert!(SortKey::BeginTime.is_timestamp());
        assert!(!SortKey::ClassType.is_timestamp());
    }

    #[test]
    fn equal_keys_keep_input_order_in_both_directions() {
        let records = vec![
            flare("first", "M1.0", "2024-01-01T00:00:00Z"),
            flare("second", "M1.0", "2024-01-02T00:00:00Z"),
            flare("third", "M1.0", "2024-01-03T00:00:00Z"),
        ];
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let rows = sorted_view(&records, SortConfig::new(SortKey::ClassType, direction));
            assert_eq!(ids(&rows), vec!["first", "second", "third"]);
        }
    }

    #[test]
    fn missing_optional_values_sort_first() {
        let mut with_end = flare("ended", "C1.0", "2024-01-01T00:00:00Z");
        with_end.end_time = Some(utc("2024-01-01T01:00:00Z"));
        let open = flare("open", "C1.0", "2024-01-01T00:00:00Z");

        let rows = sorted_view(
            &[with_end, open],
            SortConfig::new(SortKey::EndTime, SortDirection::Asc),
        );
        assert_eq!(ids(&rows), vec!["open", "ended"]);
    }

    #[test]
    fn sort_keys_use_field_names() {
        assert_eq!(SortKey::ActiveRegionNum.to_string(), "active_region_num");
        assert_eq!("flr_id".parse::<SortKey>().unwrap(), SortKey::FlrId);
    }

    #[test]
    fn view_model_keeps_sort_across_refreshes() {
        let mut view = ListingViewModel::default();
        assert!(view.is_empty());

        view.refresh(sample());
        assert_eq!(ids(view.rows()), vec!["a", "b", "c"]);

        assert_eq!(
            view.request_sort(SortKey::FlrId),
            SortConfig::new(SortKey::FlrId, SortDirection::Asc)
        );
        assert_eq!(ids(view.rows()), vec!["a", "b", "c"]);
        view.request_sort(SortKey::FlrId);
        assert_eq!(ids(view.rows()), vec!["c", "b", "a"]);

        view.refresh(vec![
            flare("z", "B1.0", "2024-02-01T00:00:00Z"),
            flare("y", "B1.0", "2024-02-02T00:00:00Z"),
        ]);
        assert_eq!(view.sort_config().key, SortKey::FlrId);
        assert_eq!(ids(view.rows()), vec!["z", "y"]);
        assert!(!view.is_empty());
    }
}

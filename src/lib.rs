use crate::utils::*;
use chrono::prelude::*;
use log::{debug, info};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
pub mod figure;
pub mod pie;
pub mod privacy_plot;
pub mod timeline;
pub mod utils;

// constants
pub const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
pub const LOG_EXTENSION: &str = "ndjson";
pub const TIMELINE_TITLE: &str = "Access Timelapse";
pub const CATEGORY_PIE_TITLE: &str = "Percentage of Accesses by Category";
pub const APP_PIE_TITLE: &str = "Percentage of Accesses by App Identifier";

/// One line of the exported privacy report, as read from json.
/// Only the fields needed for the plots are kept,
/// their presence is checked by `to_event`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessRecord {
    pub accessor: Option<Accessor>,
    pub category: Option<String>,
    #[serde(rename = "timeStamp")]
    pub time_stamp: Option<String>,
    /// 1-based line in the source file, 0 when not read from a file.
    #[serde(skip)]
    pub line: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Accessor {
    pub identifier: Option<String>,
}

/// A validated access: which app read which category, and when.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessEvent {
    pub app: String,
    pub category: String,
    pub time: DateTime<FixedOffset>,
}

impl AccessRecord {
    /// Records without an accessor are not accesses (e.g., network activity)
    /// and give None. With an accessor, every field must be there
    /// and the timestamp must parse.
    pub fn to_event(&self) -> Result<Option<AccessEvent>, AccessError> {
        let accessor = match &self.accessor {
            Some(a) => a,
            None => return Ok(None),
        };
        let app = accessor
            .identifier
            .clone()
            .ok_or(AccessError::MissingField {
                line: self.line,
                field: "accessor.identifier",
            })?;
        let category = self.category.clone().ok_or(AccessError::MissingField {
            line: self.line,
            field: "category",
        })?;
        let time_stamp = self.time_stamp.as_deref().ok_or(AccessError::MissingField {
            line: self.line,
            field: "timeStamp",
        })?;
        let time = parse_timestamp(time_stamp).map_err(|reason| AccessError::Format {
            line: self.line,
            value: time_stamp.to_owned(),
            reason,
        })?;
        Ok(Some(AccessEvent {
            app,
            category,
            time,
        }))
    }
}

/// Grouping key of the timestamps: (app identifier, category).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub app: String,
    pub category: String,
}

impl EventKey {
    pub fn new(app: &str, category: &str) -> EventKey {
        EventKey {
            app: app.to_owned(),
            category: category.to_owned(),
        }
    }
}

/// Timestamps grouped by key.
/// Keys iterate in order of first appearance,
/// timestamps in order of insertion, duplicates included.
#[derive(Debug, Clone, Default)]
pub struct EventSeries {
    index: HashMap<EventKey, usize>,
    series: Vec<(EventKey, Vec<DateTime<FixedOffset>>)>,
}

impl EventSeries {
    pub fn new() -> EventSeries {
        EventSeries::default()
    }

    /// Append the time to the series of the key, creating the series on first use.
    pub fn push(&mut self, key: EventKey, time: DateTime<FixedOffset>) {
        match self.index.get(&key) {
            Some(&i) => self.series[i].1.push(time),
            None => {
                self.index.insert(key.clone(), self.series.len());
                self.series.push((key, vec![time]));
            }
        }
    }

    pub fn get(&self, key: &EventKey) -> Option<&[DateTime<FixedOffset>]> {
        self.index.get(key).map(|&i| &self.series[i].1[..])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &[DateTime<FixedOffset>])> {
        self.series.iter().map(|(k, t)| (k, &t[..]))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Number of timestamps over all keys.
    pub fn event_count(&self) -> usize {
        self.series.iter().map(|(_, t)| t.len()).sum()
    }

    pub fn times(&self) -> impl Iterator<Item = &DateTime<FixedOffset>> {
        self.series.iter().flat_map(|(_, t)| t.iter())
    }
}

/// Occurrences per label (category or app identifier).
pub type Counts = BTreeMap<String, usize>;

/// The access log aggregated for plotting.
/// Built once from the records and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct AccessLog {
    pub events: EventSeries,
    pub category_counts: Counts,
    pub app_counts: Counts,
    /// Records without an accessor, left out of every aggregate.
    pub skipped: usize,
}

impl AccessLog {
    /// Read and aggregate a privacy report ndjson file.
    pub fn from_ndjson<P>(fin: P) -> Result<AccessLog, AccessError>
    where
        P: AsRef<Path>,
    {
        let records = read_ndjson(&fin)?;
        debug!(
            "read {} records from {}",
            records.len(),
            fin.as_ref().display()
        );
        AccessLog::from_records(&records)
    }

    /// Aggregate in one pass, in record order.
    /// Stop at the first record that has an accessor but cannot become an event.
    pub fn from_records(records: &[AccessRecord]) -> Result<AccessLog, AccessError> {
        let mut log = AccessLog::default();
        for record in records {
            let event = match record.to_event()? {
                Some(e) => e,
                None => {
                    log.skipped += 1;
                    continue;
                }
            };
            *log.category_counts
                .entry(event.category.clone())
                .or_insert(0) += 1;
            *log.app_counts.entry(event.app.clone()).or_insert(0) += 1;
            log.events
                .push(EventKey::new(&event.app, &event.category), event.time);
        }
        Ok(log)
    }

    /// Distinct categories, sorted; the index is the timeline row.
    pub fn categories(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(|(k, _)| k.category.as_str())
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .collect()
    }

    /// Distinct app identifiers, sorted; the index is the color rank.
    pub fn apps(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(|(k, _)| k.app.as_str())
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .collect()
    }

    /// Apps in order of their first series, each once.
    pub fn apps_by_first_appearance(&self) -> Vec<&str> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        self.events
            .iter()
            .map(|(k, _)| k.app.as_str())
            .filter(|a| seen.insert(*a))
            .collect()
    }

    /// Earliest and latest access over all series, in utc.
    pub fn time_bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), AccessError> {
        min_and_max(self.events.times())
            .map(|(min, max)| (min.with_timezone(&Utc), max.with_timezone(&Utc)))
            .ok_or(AccessError::EmptyData)
    }
}

impl fmt::Display for AccessLog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} accesses, {} categories, {} apps, {} records without accessor",
            self.events.event_count(),
            self.category_counts.len(),
            self.app_counts.len(),
            self.skipped
        )
    }
}

/// Load, aggregate, and plot the three figures next to the log file.
/// Return the paths of the written images:
/// timeline, accesses by category, accesses by app.
pub fn generate_report<P>(fin: P, name: &str) -> Result<Vec<PathBuf>, AccessError>
where
    P: AsRef<Path>,
{
    let fin = fin.as_ref();
    info!("> read records from {}", fin.display());
    let log = AccessLog::from_ndjson(fin)?;
    info!("> aggregated {}", log);
    for (category, n) in log.category_counts.iter() {
        debug!("category {}: {}", category, n);
    }
    for (app, n) in log.app_counts.iter() {
        debug!("app {}: {}", app, n);
    }

    let (timeline_title, category_title, app_title) = privacy_plot::figure_titles(name);
    let mut written: Vec<PathBuf> = Vec::with_capacity(3);

    let fout = privacy_plot::output_path(fin, &timeline_title);
    info!("> plot timeline to {}", fout.display());
    timeline::plot_timeline(&log, &timeline_title, &fout)?;
    written.push(fout);

    for (counts, title) in [
        (&log.category_counts, &category_title),
        (&log.app_counts, &app_title),
    ] {
        let fout = privacy_plot::output_path(fin, title);
        info!("> plot pie chart to {}", fout.display());
        pie::plot_pie(counts, title, &fout)?;
        written.push(fout);
    }
    Ok(written)
}

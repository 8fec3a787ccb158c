use super::AccessRecord;
use chrono::prelude::*;
use plotters::style::RGBColor;
use std::path::{Path, PathBuf};
use std::{error::Error, fmt, io};

/// Timestamp layout of the privacy report: `2022-05-01T10:00:00.123+02:00`.
/// `%.f` does not enforce the fractional part, see `parse_timestamp`.
pub const TIMESTAMP_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Characters that cannot be part of a file name on common filesystems.
pub const UNSAFE_FILENAME_CHARS: [char; 9] = ['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

/// The qualitative "tab10" table, cycled by rank.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const MAX_CONTENT_DISPLAY: usize = 80;

/// Read a newline-delimited json file into records, keeping the file order.
/// Blank lines are skipped, any other line must be a json object,
/// the first bad line stops the whole read.
pub fn read_ndjson<P>(fin: P) -> Result<Vec<AccessRecord>, AccessError>
where
    P: AsRef<Path>,
{
    let path = fin.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| AccessError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let mut records: Vec<AccessRecord> = Vec::new();
    for (i, l) in text.lines().enumerate() {
        let l = l.trim();
        if l.is_empty() {
            continue;
        }
        let mut record: AccessRecord =
            serde_json::from_str(l).map_err(|source| AccessError::Parse {
                line: i + 1,
                content: truncate(l, MAX_CONTENT_DISPLAY),
                source,
            })?;
        record.line = i + 1;
        records.push(record);
    }
    Ok(records)
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

/// Parse a report timestamp, requiring 1 to 6 digits of fractional seconds
/// and a numeric utc offset (`+hh:mm` or `+hhmm`) right after them.
pub fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, String> {
    if s.chars().any(char::is_whitespace) {
        return Err(String::from("unexpected whitespace"));
    }
    let fraction_digits = s
        .split_once('.')
        .map(|(_, rest)| rest.chars().take_while(|c| c.is_ascii_digit()).count())
        .unwrap_or(0);
    if !(1..=6).contains(&fraction_digits) {
        return Err(format!(
            "expected 1 to 6 fractional second digits, found {}",
            fraction_digits
        ));
    }
    DateTime::parse_from_str(s, TIMESTAMP_FMT).map_err(|e| e.to_string())
}

/// Minimum and maximum of an iterator, None when it is empty.
pub fn min_and_max<'a, I, T>(mut s: I) -> Option<(T, T)>
where
    I: Iterator<Item = &'a T>,
    T: 'a + std::cmp::PartialOrd + Clone,
{
    let (mut min, mut max) = match s.next() {
        Some(v) => (v, v),
        None => return None,
    };
    for es in s {
        if es > max {
            max = es
        } else if es < min {
            min = es
        }
    }
    Some((min.clone(), max.clone()))
}

/// Replace every run of filesystem-unsafe characters with a single underscore.
pub fn sanitize_filename(title: &str) -> String {
    let mut sanitized = String::with_capacity(title.len());
    let mut in_run = false;
    for c in title.chars() {
        if UNSAFE_FILENAME_CHARS.contains(&c) {
            if !in_run {
                sanitized.push('_');
            }
            in_run = true;
        } else {
            sanitized.push(c);
            in_run = false;
        }
    }
    sanitized
}

/// Color for the given rank, wrapping around the palette.
pub fn palette_color(rank: usize) -> RGBColor {
    PALETTE[rank % PALETTE.len()]
}

/// Everything that can stop the report.
#[derive(Debug)]
pub enum AccessError {
    FileAccess {
        path: PathBuf,
        source: io::Error,
    },
    Parse {
        line: usize,
        content: String,
        source: serde_json::Error,
    },
    MissingField {
        line: usize,
        field: &'static str,
    },
    Format {
        line: usize,
        value: String,
        reason: String,
    },
    EmptyData,
    EmptyMapping,
    Render {
        path: PathBuf,
        message: String,
    },
    Write {
        path: PathBuf,
        source: png::EncodingError,
    },
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AccessError::FileAccess { source, .. } => Some(source),
            AccessError::Parse { source, .. } => Some(source),
            AccessError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AccessError::FileAccess { path, source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            AccessError::Parse {
                line,
                content,
                source,
            } => write!(f, "invalid json at line {} ({}): {}", line, content, source),
            AccessError::MissingField { line, field } => {
                write!(f, "record at line {} has an accessor but no {}", line, field)
            }
            AccessError::Format {
                line,
                value,
                reason,
            } => write!(
                f,
                "invalid timeStamp {:?} at line {}: {}",
                value, line, reason
            ),
            AccessError::EmptyData => {
                write!(f, "no records with an accessor, cannot set the time axis")
            }
            AccessError::EmptyMapping => write!(f, "no counts to plot"),
            AccessError::Render { path, message } => {
                write!(f, "could not draw {}: {}", path.display(), message)
            }
            AccessError::Write { path, source } => {
                write!(f, "could not write {}: {}", path.display(), source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_with_colon_offset() {
        let dt = parse_timestamp("2022-05-01T10:00:00.123+02:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(dt.timestamp_subsec_millis(), 123);
        assert_eq!(
            dt.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2022, 5, 1, 8, 0, 0).unwrap() + chrono::Duration::milliseconds(123)
        );
    }

    #[test]
    fn timestamp_with_compact_offset_and_micros() {
        let dt = parse_timestamp("2022-05-01T10:00:00.000001-0700").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -7 * 3600);
        assert_eq!(dt.timestamp_subsec_micros(), 1);
    }

    #[test]
    fn timestamp_rejects_other_layouts() {
        assert!(parse_timestamp("2022-05-01T10:00:00+02:00").is_err());
        assert!(parse_timestamp("2022-05-01T10:00:00.1234567+02:00").is_err());
        assert!(parse_timestamp("2022-05-01 10:00:00.123+02:00").is_err());
        assert!(parse_timestamp("2022-05-01T10:00:00.123").is_err());
        assert!(parse_timestamp("2022-05-01T10:00:00.123 +02:00").is_err());
        assert!(parse_timestamp(" 2022-05-01T10:00:00.123+02:00").is_err());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn sanitize_every_unsafe_char() {
        let title = "a\\b/c:d\"e*f?g<h>i|j";
        assert_eq!(sanitize_filename(title), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("My:Report?"), "My_Report_");
    }

    #[test]
    fn sanitize_collapses_runs_and_keeps_the_rest() {
        assert_eq!(sanitize_filename("x<>y"), "x_y");
        assert_eq!(sanitize_filename("\\/:\"*?<>|"), "_");
        let plain = "Phone Access Timelapse (2022-05) #1";
        assert_eq!(sanitize_filename(plain), plain);
    }

    #[test]
    fn palette_wraps_around() {
        assert_eq!(palette_color(0), PALETTE[0]);
        assert_eq!(palette_color(9), PALETTE[9]);
        assert_eq!(palette_color(10), PALETTE[0]);
        assert_eq!(palette_color(23), PALETTE[3]);
    }

    #[test]
    fn min_and_max_of_values() {
        let v = [3, 1, 4, 1, 5, 9, 2, 6];
        assert_eq!(min_and_max(v.iter()), Some((1, 9)));
        let empty: [i32; 0] = [];
        assert_eq!(min_and_max(empty.iter()), None);
    }

    #[test]
    fn missing_file_is_file_access_error() {
        match read_ndjson("./test/does_not_exist.ndjson") {
            Err(AccessError::FileAccess { path, .. }) => {
                assert!(path.ends_with("does_not_exist.ndjson"))
            }
            other => panic!("expected FileAccess, got {:?}", other),
        }
    }

    #[test]
    fn bad_json_line_is_reported_with_line_number() {
        match read_ndjson("./test/bad_json.ndjson") {
            Err(AccessError::Parse { line, content, .. }) => {
                assert_eq!(line, 3);
                assert!(content.starts_with("{\"accessor\""));
            }
            other => panic!("expected Parse, got {:?}", other),
        }
    }

    #[test]
    fn long_content_is_truncated() {
        let s = "x".repeat(200);
        let t = truncate(&s, 80);
        assert_eq!(t.len(), 83);
        assert!(t.ends_with("..."));
        assert_eq!(truncate("short", 80), "short");
    }
}

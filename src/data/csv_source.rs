use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::source::BarSource;
use crate::engine::EngineError;
use crate::types::{validate_series, PriceBar};

/// Reads `timestamp,open,high,low,close,volume` files from one directory.
pub struct CsvBarSource {
    data_dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Only plain relative names are accepted; nothing may resolve outside `data_dir`.
    fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        let relative = Path::new(name);
        let plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(EngineError::data_load(name, "file name must be relative to the data directory"));
        }
        Ok(self.data_dir.join(relative))
    }
}

#[async_trait]
impl BarSource for CsvBarSource {
    async fn fetch_bars(&self, name: &str) -> Result<Vec<PriceBar>, EngineError> {
        let path = self.resolve(name)?;
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            let reason = format!("failed to read {}: {}", path.display(), e);
            if e.kind() == ErrorKind::NotFound {
                EngineError::source_missing(name, reason)
            } else {
                EngineError::data_load(name, reason)
            }
        })?;

        let bars = parse_bars(name, &content)?;
        debug!("Parsed {} bars from {}", bars.len(), path.display());
        Ok(bars)
    }
}

/// Parses a whole CSV body. The first row is a header and is not inspected.
pub fn parse_bars(name: &str, content: &str) -> Result<Vec<PriceBar>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for (row, result) in reader.records().enumerate() {
        let line = row + 2;
        let record = result
            .map_err(|e| EngineError::data_load(name, format!("CSV parse error: {}", e)))?;

        let field = |index: usize, column: &str| {
            record.get(index).filter(|s| !s.is_empty()).ok_or_else(|| {
                EngineError::data_load(name, format!("line {}: missing {} column", line, column))
            })
        };
        let number = |index: usize, column: &str| -> Result<f64, EngineError> {
            let raw = field(index, column)?;
            raw.parse::<f64>().map_err(|e| {
                EngineError::data_load(name, format!("line {}: invalid {} '{}': {}", line, column, raw, e))
            })
        };

        let raw_ts = field(0, "timestamp")?;
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
            EngineError::data_load(name, format!("line {}: invalid timestamp '{}'", line, raw_ts))
        })?;

        let bar = PriceBar::new(
            timestamp,
            number(1, "open")?,
            number(2, "high")?,
            number(3, "low")?,
            number(4, "close")?,
            number(5, "volume")?,
        );
        bar.check()
            .map_err(|reason| EngineError::data_load(name, format!("line {}: {}", line, reason)))?;
        bars.push(bar);
    }

    validate_series(&bars).map_err(|reason| EngineError::data_load(name, reason))?;
    Ok(bars)
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` (midnight UTC) or unix seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ts| ts.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = "date,open,high,low,close,volume\n\
        2024-01-01,99.0,101.0,98.0,100.0,1000\n\
        2024-01-02,100.0,103.0,99.5,102.0,1200\n\
        2024-01-03,102.0,102.5,100.0,101.0,900\n";

    fn setup(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_fetch_reads_bars_in_order() {
        let dir = setup(&[("sample.csv", SAMPLE)]);
        let source = CsvBarSource::new(dir.path());

        let bars = source.fetch_bars("sample.csv").await.unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].close, 100.0);
        assert_eq!(bars[1].high, 103.0);
        assert_eq!(bars[2].volume, 900.0);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[tokio::test]
    async fn test_missing_file_is_flagged() {
        let dir = setup(&[]);
        let source = CsvBarSource::new(dir.path());

        match source.fetch_bars("nope.csv").await {
            Err(EngineError::DataLoad { missing, .. }) => assert!(missing),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = setup(&[("sample.csv", SAMPLE)]);
        let source = CsvBarSource::new(dir.path());

        for name in ["../sample.csv", "/etc/passwd", "a/../../b.csv", ""] {
            match source.fetch_bars(name).await {
                Err(EngineError::DataLoad { missing, .. }) => assert!(!missing, "{}", name),
                other => panic!("{} gave {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_header_only_is_empty_error() {
        let err = parse_bars("empty.csv", "timestamp,open,high,low,close,volume\n").unwrap_err();
        assert!(matches!(err, EngineError::DataLoad { .. }));
    }

    #[test]
    fn test_non_numeric_field() {
        let body = "timestamp,open,high,low,close,volume\n2024-01-01,1,2,0.5,abc,10\n";
        let err = parse_bars("bad.csv", body).unwrap_err();
        assert!(err.to_string().contains("invalid close"));
    }

    #[test]
    fn test_non_positive_close() {
        let body = "timestamp,open,high,low,close,volume\n2024-01-01,1,2,0.5,0,10\n";
        assert!(parse_bars("zero.csv", body).is_err());
    }

    #[test]
    fn test_out_of_order_rows() {
        let body = "timestamp,open,high,low,close,volume\n\
            2024-01-02,1,2,0.5,1.5,10\n\
            2024-01-01,1,2,0.5,1.5,10\n";
        assert!(parse_bars("order.csv", body).is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let midnight = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(parse_timestamp("2024-03-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp(&midnight.timestamp().to_string()), Some(midnight));
        assert!(parse_timestamp("March 1st").is_none());
    }
}

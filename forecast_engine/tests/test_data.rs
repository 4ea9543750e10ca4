use chrono::{TimeZone, Utc};
use forecast_engine::data::TimeFormat;
use forecast_engine::{DataLoader, ForecastError, TimeSeries};
use std::io::Write;
use tempfile::NamedTempFile;

fn create_daily_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    writeln!(file, "date,price").unwrap();
    writeln!(file, "2023-01-01,100.0").unwrap();
    writeln!(file, "2023-01-02,102.0").unwrap();
    writeln!(file, "2023-01-03,101.0").unwrap();
    writeln!(file, "2023-01-04,103.0").unwrap();

    file
}

#[test]
fn test_load_from_path() {
    let file = create_daily_file();
    let df = DataLoader::from_path(file.path()).unwrap();
    assert_eq!(df.height(), 4);

    let series = TimeSeries::from_table(&df, "date", "price").unwrap();
    assert_eq!(series.len(), 4);
    assert_eq!(series.values(), &[100.0, 102.0, 101.0, 103.0]);
    assert_eq!(
        series.first().unwrap().0,
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let result = DataLoader::from_path("/nonexistent/table.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));
}

#[test]
fn test_header_only_table_is_rejected() {
    let result = DataLoader::read_csv(b"date,price\n");
    assert!(result.is_err());
}

#[test]
fn test_missing_value_is_rejected() {
    let csv = "date,price\n2023-01-01,1.0\n2023-01-02,\n2023-01-03,3.0\n";
    let result = DataLoader::load_series(csv.as_bytes(), "date", "price");
    assert!(matches!(result, Err(ForecastError::MalformedInput(_))));
}

#[test]
fn test_non_numeric_value_is_rejected() {
    let csv = "date,price\n2023-01-01,1.0\n2023-01-02,n/a\n2023-01-03,3.0\n";
    let result = DataLoader::load_series(csv.as_bytes(), "date", "price");
    assert!(matches!(result, Err(ForecastError::MalformedInput(_))));
}

#[test]
fn test_mixed_time_formats_are_rejected() {
    let csv = "date,price\n2023-01-01,1.0\n2023/01/02,2.0\n2023-01-03,3.0\n";
    let err = DataLoader::load_series(csv.as_bytes(), "date", "price").unwrap_err();
    assert!(matches!(err, ForecastError::MalformedInput(_)));
    assert!(err.to_string().contains("2023/01/02"));
}

#[test]
fn test_duplicate_timestamps_are_rejected() {
    let csv = "date,price\n2023-01-01,1.0\n2023-01-02,2.0\n2023-01-02,3.0\n";
    let result = DataLoader::load_series(csv.as_bytes(), "date", "price");
    assert!(matches!(result, Err(ForecastError::MalformedInput(_))));
}

#[test]
fn test_intraday_timestamps() {
    let csv = "ts,load\n2024-05-01 00:00:00,5\n2024-05-01 01:00:00,6\n2024-05-01 02:00:00,7\n";
    let series = DataLoader::load_series(csv.as_bytes(), "ts", "load").unwrap();
    assert_eq!(
        series.last().unwrap(),
        (Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap(), 7.0)
    );
}

#[test]
fn test_detect_rfc3339_normalises_offset() {
    let ts = TimeFormat::Rfc3339.parse("2024-01-31T12:00:00+02:00").unwrap();
    assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 31, 10, 0, 0).unwrap());
    assert_eq!(TimeFormat::detect("2024"), Some(TimeFormat::Year));
    assert_eq!(TimeFormat::detect("not a date"), None);
}

#[test]
fn test_series_new_rejects_non_finite() {
    let ts = vec![
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
    ];
    assert!(TimeSeries::new(ts.clone(), vec![1.0, f64::NAN]).is_err());
    assert!(TimeSeries::new(ts, vec![1.0]).is_err());
}

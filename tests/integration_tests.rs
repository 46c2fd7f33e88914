use aqi_engine::breakpoints::BreakpointTables;
use aqi_engine::engine::AqiEngine;
use aqi_engine::features::build_features;
use aqi_engine::output::write_records;
use aqi_engine::parser::{parse_readings, read_readings_file};
use aqi_engine::pipeline::process_batch;
use aqi_engine::pollutant::Pollutant;
use aqi_engine::summary::AqiSummary;
use chrono::Timelike;

const SAMPLE: &str = include_str!("fixtures/sample_readings.csv");

#[test]
fn test_full_pipeline() {
    let readings = parse_readings(SAMPLE.as_bytes()).expect("Failed to parse readings");
    assert_eq!(readings.len(), 6);

    let rows = process_batch(&AqiEngine::epa(), readings);

    // the 13:00 row repeats the 12:00 readings and is dropped
    let hours: Vec<_> = rows.iter().map(|r| r.timestamp.hour()).collect();
    assert_eq!(hours, vec![9, 10, 11, 12, 14]);

    let aqi: Vec<_> = rows.iter().map(|r| r.calculated_aqi).collect();
    assert_eq!(aqi, vec![Some(50.0), Some(67.33), None, Some(100.0), Some(50.0)]);

    let rates: Vec<_> = rows.iter().map(|r| r.aqi_change_rate).collect();
    assert_eq!(rates, vec![Some(0.0), Some(17.33), None, None, Some(-50.0)]);

    let dominant: Vec<_> = rows.iter().map(|r| r.dominant_pollutant).collect();
    assert_eq!(
        dominant,
        vec![
            Some(Pollutant::Co),
            Some(Pollutant::O3),
            None,
            Some(Pollutant::Pm2_5),
            Some(Pollutant::So2),
        ]
    );
}

#[test]
fn test_summary_over_fixture() {
    let readings = parse_readings(SAMPLE.as_bytes()).unwrap();
    let rows = process_batch(&AqiEngine::epa(), readings);
    let summary = AqiSummary::from_rows(&rows);

    assert_eq!(summary.rows, 5);
    assert_eq!(summary.defined, 4);
    assert_eq!(summary.undefined, 1);
    assert_eq!(summary.max, Some(100.0));
    assert_eq!(summary.min, Some(50.0));
}

#[test]
fn test_features_over_fixture() {
    let readings = parse_readings(SAMPLE.as_bytes()).unwrap();
    let rows = process_batch(&AqiEngine::epa(), readings);
    let features = build_features(&rows);

    assert_eq!(features.len(), rows.len());
    assert_eq!(features[0].hour_scaled, Some(0.0));
    assert_eq!(features[4].hour_scaled, Some(1.0));
    assert_eq!(features[2].calculated_aqi, None);
    for f in &features {
        for v in [f.co_scaled, f.no_log_scaled, f.so2_log_scaled, f.nh3_log_scaled]
            .into_iter()
            .flatten()
        {
            assert!((0.0..=1.0).contains(&v));
        }
    }
}

#[test]
fn test_processed_output_is_readable_again() {
    let readings = parse_readings(SAMPLE.as_bytes()).unwrap();
    let rows = process_batch(&AqiEngine::epa(), readings);

    let path = format!("{}/aqi_engine_it_processed.csv", std::env::temp_dir().display());
    write_records(&path, &rows, false).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let header = content.lines().next().unwrap();
    assert!(header.contains("calculated_aqi"));
    assert!(header.contains("aqi_change_rate"));

    // the processed file keeps the raw columns, so it parses as readings
    let reparsed = read_readings_file(&path).unwrap();
    assert_eq!(reparsed.len(), rows.len());
    assert_eq!(reparsed[1].get(Pollutant::O3), Some(60.0));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_custom_breakpoints() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/custom_breakpoints.json");
    let tables = BreakpointTables::from_json_file(path).expect("Failed to load tables");
    assert_eq!(tables.len(), 2);

    let readings = parse_readings(SAMPLE.as_bytes()).unwrap();
    let rows = process_batch(&AqiEngine::new(tables), readings);

    // 10:00 has pm2_5 10.0 in the second band and o3 60.0 above the table
    let ten = rows.iter().find(|r| r.timestamp.hour() == 10).unwrap();
    assert_eq!(ten.dominant_pollutant, Some(Pollutant::Pm2_5));
    // co is not in the custom tables
    assert_eq!(rows[0].calculated_aqi, None);
}

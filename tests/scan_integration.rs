//! End-to-end scans against scripted and simulated devices.
mod common;

use common::{RecordingStage, ScriptedSensor};
use rust_scan::config::Settings;
use rust_scan::data::{storage::write_report, CsvWriter, Heatmap};
use rust_scan::hardware::{SimSensor, SimStage};
use rust_scan::scan::{generate_scan_path, PeakRecord, ScanPoint, ScanRange};
use rust_scan::{ScanError, ScanRunner};
use std::time::Duration;

fn grid(steps: usize) -> ScanRange {
    ScanRange::new(0.0, 50.0, steps)
}

fn runner(
    stage: RecordingStage,
    sensor: ScriptedSensor,
) -> ScanRunner<RecordingStage, ScriptedSensor> {
    ScanRunner::new(stage, sensor).with_backoff(Duration::ZERO)
}

#[tokio::test]
async fn test_constant_signal_converges() {
    let mut runner = runner(RecordingStage::reliable(), ScriptedSensor::constant(2.5));
    let report = runner.perform_scan(&grid(3), &grid(3), 3, 3).await.unwrap();

    assert_eq!(report.rows.len(), 9);
    assert!(report
        .rows
        .iter()
        .all(|row| row.raw == Some(2.5) && row.filtered == Some(2.5)));
    assert_eq!(
        report.peak,
        Some(PeakRecord {
            value: 2.5,
            x: 0,
            y: 0
        })
    );
    assert_eq!(report.failed_attempts, 0);
}

#[tokio::test]
async fn test_rolling_average_over_path() {
    let sensor = ScriptedSensor::new(vec![
        Ok(Some(10.0)),
        Ok(Some(20.0)),
        Ok(Some(30.0)),
        Ok(Some(40.0)),
    ]);
    let mut runner = runner(RecordingStage::reliable(), sensor);
    let range = ScanRange::new(0.0, 10.0, 2);
    let report = runner.perform_scan(&range, &range, 3, 2).await.unwrap();

    let filtered: Vec<Option<f64>> = report.rows.iter().map(|r| r.filtered).collect();
    assert_eq!(filtered, vec![Some(10.0), Some(15.0), Some(25.0), Some(35.0)]);

    let points: Vec<ScanPoint> = report.rows.iter().map(|r| r.point()).collect();
    assert_eq!(
        points,
        vec![
            ScanPoint::new(0, 0),
            ScanPoint::new(10, 0),
            ScanPoint::new(10, 10),
            ScanPoint::new(0, 10),
        ]
    );
    assert_eq!(
        report.peak,
        Some(PeakRecord {
            value: 35.0,
            x: 0,
            y: 10
        })
    );
}

#[tokio::test]
async fn test_rows_and_moves_follow_path_order() {
    let mut runner = runner(RecordingStage::reliable(), ScriptedSensor::constant(1.0));
    let report = runner.perform_scan(&grid(3), &grid(4), 3, 3).await.unwrap();

    let path = generate_scan_path(&grid(3), &grid(4));
    let rows: Vec<ScanPoint> = report.rows.iter().map(|r| r.point()).collect();
    assert_eq!(rows, path);

    let (stage, sensor) = runner.into_devices();
    let expected_moves: Vec<(f64, f64)> = path.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    assert_eq!(stage.moves(), expected_moves);
    assert_eq!(sensor.calls(), path.len());
}

#[tokio::test]
async fn test_broken_sensor_yields_empty_rows() {
    let mut runner = runner(RecordingStage::reliable(), ScriptedSensor::broken());
    let report = runner.perform_scan(&grid(3), &grid(3), 3, 3).await.unwrap();

    assert_eq!(report.rows.len(), 9);
    assert!(report.rows.iter().all(|r| r.is_skipped() && r.raw.is_none()));
    assert_eq!(report.peak, None);
    assert_eq!(report.skipped_measurements, 9);
    assert_eq!(report.skipped_moves, 0);
    assert_eq!(report.failed_attempts, 27);

    let (_, sensor) = runner.into_devices();
    assert_eq!(sensor.calls(), 27);
}

#[tokio::test]
async fn test_unreachable_point_is_skipped_without_measuring() {
    let stage = RecordingStage::failing_when(|x, y, _| x == 25.0 && y == 0.0);
    let mut runner = runner(stage, ScriptedSensor::constant(4.0));
    let report = runner.perform_scan(&grid(3), &grid(3), 3, 2).await.unwrap();

    assert_eq!(report.rows.len(), 9);
    assert!(report.rows[1].is_skipped());
    assert_eq!(report.rows[1].point(), ScanPoint::new(25, 0));
    assert_eq!(report.skipped_moves, 1);
    assert_eq!(report.measured_points(), 8);

    let (stage, sensor) = runner.into_devices();
    assert_eq!(stage.moves().len(), 9 + 2);
    assert_eq!(sensor.calls(), 8);
}

#[tokio::test]
async fn test_skipped_point_does_not_disturb_filter() {
    let stage = RecordingStage::failing_when(|x, _, _| x == 10.0);
    let sensor = ScriptedSensor::new(vec![Ok(Some(10.0)), Ok(Some(30.0)), Ok(Some(50.0))]);
    let mut runner = runner(stage, sensor);
    let range = ScanRange::new(0.0, 10.0, 2);
    let report = runner.perform_scan(&range, &range, 2, 2).await.unwrap();

    // Path (0,0) (10,0) (10,10) (0,10); the x = 10 column is unreachable
    let filtered: Vec<Option<f64>> = report.rows.iter().map(|r| r.filtered).collect();
    assert_eq!(filtered, vec![Some(10.0), None, None, Some(20.0)]);
}

#[tokio::test]
async fn test_transient_faults_recover() {
    let stage = RecordingStage::failing_when(|_, _, attempt| attempt == 1);
    let mut runner = runner(stage, ScriptedSensor::constant(3.0));
    let report = runner.perform_scan(&grid(2), &grid(2), 2, 1).await.unwrap();

    assert_eq!(report.measured_points(), 4);
    assert_eq!(report.failed_attempts, 4);
}

#[tokio::test]
async fn test_invalid_parameters_rejected_before_scanning() {
    let mut runner = runner(RecordingStage::reliable(), ScriptedSensor::constant(1.0));

    let err = runner.perform_scan(&grid(3), &grid(3), 3, 0).await.unwrap_err();
    assert!(matches!(err, ScanError::Configuration(_)));
    let err = runner.perform_scan(&grid(0), &grid(3), 3, 3).await.unwrap_err();
    assert!(matches!(err, ScanError::Configuration(_)));
    let err = runner.perform_scan(&grid(3), &grid(3), 0, 3).await.unwrap_err();
    assert!(matches!(err, ScanError::Configuration(_)));

    let (stage, sensor) = runner.into_devices();
    assert!(stage.moves().is_empty());
    assert_eq!(sensor.calls(), 0);
}

#[tokio::test]
async fn test_heatmap_from_csv_matches_report() {
    let stage = RecordingStage::failing_when(|x, y, _| x == 50.0 && y == 25.0);
    let sensor = ScriptedSensor::new((1..=9).map(|v| Ok(Some(v as f64))).collect());
    let mut runner = runner(stage, sensor);
    let report = runner.perform_scan(&grid(3), &grid(3), 1, 1).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan_results.csv");
    let mut writer = CsvWriter::new(&path);
    write_report(&mut writer, &report, true).await.unwrap();

    let from_csv = Heatmap::from_csv(&path, 3, 3).unwrap();
    let from_rows = Heatmap::from_rows(&report.rows, 3, 3);
    assert_eq!(from_csv, from_rows);

    // (50, 25) is grid row 1, column 2
    assert_eq!(from_csv.get(1, 2), None);
    // (0, 25) is the last point of the reversed second row
    assert_eq!(from_csv.get(1, 0), report.rows[5].filtered);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_devices_without_faults() {
    let stage = SimStage::new(Duration::from_millis(100), 0.0, 42);
    let sensor = SimSensor::new(1.0, 0.0, 0.0, 43);
    let mut runner = ScanRunner::new(stage, sensor);

    let report = runner.perform_scan(&grid(3), &grid(3), 3, 3).await.unwrap();

    assert_eq!(report.measured_points(), 9);
    assert!(report.rows.iter().all(|r| r.filtered == Some(1.0)));
    assert_eq!(report.peak.map(|p| (p.x, p.y)), Some((0, 0)));

    let (stage, _) = runner.into_devices();
    assert_eq!(stage.position().await, (50.0, 50.0));
}

#[tokio::test(start_paused = true)]
async fn test_simulated_scan_from_config_is_reproducible() {
    let toml = r#"
        [application]
        name = "integration"
        log_level = "info"

        [scan]
        max_retries = 3
        rolling_window_size = 3
        retry_delay_ms = 1000
        x_range = { start = 0.0, end = 50.0, steps = 4 }
        y_range = { start = 0.0, end = 50.0, steps = 4 }

        [devices]
        seed = 7
        stage = { move_time_ms = 100, fail_rate = 0.3 }
        sensor = { base_signal = 1.0, noise_level = 0.2, fail_rate = 0.3 }

        [output]
        csv = "unused.csv"
    "#;
    let settings = Settings::from_toml_str(toml).unwrap();

    let mut reports = Vec::new();
    for _ in 0..2 {
        let devices = &settings.devices;
        let stage = SimStage::from_config(&devices.stage, devices.seed);
        let sensor = SimSensor::from_config(&devices.sensor, devices.seed + 1);
        let mut runner = ScanRunner::new(stage, sensor);
        reports.push(runner.run(&settings.scan).await.unwrap());
    }

    let report = &reports[0];
    assert_eq!(report.rows.len(), 16);
    let points: Vec<ScanPoint> = report.rows.iter().map(|r| r.point()).collect();
    assert_eq!(
        points,
        generate_scan_path(&settings.scan.x_range, &settings.scan.y_range)
    );
    assert_eq!(reports[0], reports[1]);
}

use isofitts_core::{Circle, Error, LogEvent, RunStatus, SessionLog, checkpoint_path};
use isofitts_metrics::{MetricsConfig, RunReport, analyze_dir, summarize_by_label, write_report};
use std::fs;

/// One trial moving 300 px toward an 80 px wide goal over two seconds.
fn fitts_log(run_id: &str) -> SessionLog {
    let goal = Circle::new(900.0, 375.0, 40.0);
    let mut log = SessionLog::new(run_id);
    for i in 0..=4 {
        log.push(LogEvent {
            trial: 0,
            goal,
            clock_secs: 10.0 + i as f64 * 0.5,
            cursor: Circle::new(600.0 + i as f64 * 75.0, 375.0, 7.0),
            label: 3,
            magnitude: None,
            direction: (75.0, 0.0),
        });
    }
    log.mark(RunStatus::Completed);
    log
}

#[test]
fn batch_reports_every_file_sorted_by_run_id() {
    let dir = tempfile::tempdir().unwrap();
    for id in [
        "fitts_svm_20260102_090000",
        "fitts_lda_20260101_090000",
        "fitts_lda_20260103_090000",
    ] {
        fitts_log(id).save(dir.path()).unwrap();
    }
    fs::write(dir.path().join("fitts_knn_20260101_000000.json"), "{ not json").unwrap();
    fs::write(dir.path().join("fitts_nb_20260101_000000.json.tmp"), "partial").unwrap();

    let reports = analyze_dir(dir.path(), &MetricsConfig::default()).unwrap();
    let ids: Vec<&str> = reports.iter().map(|r| r.run_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "fitts_knn_20260101_000000",
            "fitts_lda_20260101_090000",
            "fitts_lda_20260103_090000",
            "fitts_svm_20260102_090000",
        ]
    );

    let broken = &reports[0];
    assert!(broken.metrics.is_none());
    assert!(broken.error.is_some());
    assert_eq!(broken.label.as_deref(), Some("knn"));

    let expected = 4.75f64.log2() / 2.0;
    for report in &reports[1..] {
        let metrics = report.metrics.as_ref().unwrap();
        assert_eq!(metrics.trials.len(), 1);
        assert_eq!(metrics.overshoot_count, 0);
        assert!((metrics.mean_throughput.unwrap() - expected).abs() < 1e-9);
        assert!((metrics.mean_efficiency.unwrap() - 1.0).abs() < 1e-12);
    }

    let summary = summarize_by_label(&reports);
    let labels: Vec<(&str, usize)> = summary.iter().map(|s| (s.label.as_str(), s.runs)).collect();
    assert_eq!(labels, vec![("lda", 2), ("svm", 1)]);
}

#[test]
fn report_round_trips_and_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("results");
    fitts_log("fitts_lda_20260101_090000").save(&logs).unwrap();

    let config = MetricsConfig::default();
    let first = analyze_dir(&logs, &config).unwrap();
    let second = analyze_dir(&logs, &config).unwrap();

    let out_a = dir.path().join("reports/a.json");
    let out_b = dir.path().join("reports/b.json");
    write_report(&out_a, &first).unwrap();
    write_report(&out_b, &second).unwrap();
    assert_eq!(fs::read(&out_a).unwrap(), fs::read(&out_b).unwrap());

    let parsed: Vec<RunReport> = serde_json::from_slice(&fs::read(&out_a).unwrap()).unwrap();
    assert_eq!(parsed, first);
}

#[test]
fn empty_directory_gives_no_reports() {
    let dir = tempfile::tempdir().unwrap();
    assert!(analyze_dir(dir.path(), &MetricsConfig::default()).unwrap().is_empty());
}

#[test]
fn out_of_sequence_trial_numbers_become_an_error_report() {
    let dir = tempfile::tempdir().unwrap();
    fitts_log("fitts_lda_20260101_090000").save(dir.path()).unwrap();
    fitts_log("fitts_svm_20260101_090000").save(dir.path()).unwrap();
    fs::write(
        dir.path().join("fitts_knn_20260101_090000.json"),
        r#"{"trial_number":[0,1099511627776],"goal_circle":[[900,375,40],[900,375,40]],
           "global_clock":[0.0,0.5],"cursor_position":[[600,375,7],[700,375,7]],
           "class_label":[3,3],"current_direction":[[75,0],[75,0]]}"#,
    )
    .unwrap();

    let reports = analyze_dir(dir.path(), &MetricsConfig::default()).unwrap();
    assert_eq!(reports.len(), 3);

    let jumped = &reports[0];
    assert_eq!(jumped.run_id, "fitts_knn_20260101_090000");
    assert!(jumped.metrics.is_none());
    assert!(jumped.error.as_deref().unwrap().contains("trial_number"));
    assert!(reports[1..].iter().all(|r| r.is_ok()));
}

#[test]
fn renamed_log_reports_the_file_name_as_run_id() {
    let dir = tempfile::tempdir().unwrap();
    let saved = fitts_log("fitts_lda_20260101_090000").save(dir.path()).unwrap();
    let renamed = dir.path().join("fitts_svm_20260105_120000.json");
    fs::rename(&saved, &renamed).unwrap();

    let reports = analyze_dir(dir.path(), &MetricsConfig::default()).unwrap();
    let report = &reports[0];
    assert_eq!(report.run_id, "fitts_svm_20260105_120000");
    assert_eq!(report.label.as_deref(), Some("svm"));
    assert_eq!(report.metrics.as_ref().unwrap().run_id, report.run_id);
}

#[test]
fn report_is_staged_and_failures_are_persistence_errors() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("results");
    fitts_log("fitts_lda_20260101_090000").save(&logs).unwrap();
    let reports = analyze_dir(&logs, &MetricsConfig::default()).unwrap();

    let out = dir.path().join("report.json");
    write_report(&out, &reports).unwrap();
    assert!(out.exists());
    assert!(!checkpoint_path(&out).exists());

    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();
    let err = write_report(&blocker.join("report.json"), &reports).unwrap_err();
    assert!(matches!(err, Error::Persistence { .. }));
}

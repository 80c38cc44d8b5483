//! Integration tests for the drain step: chart files, the audit log, and
//! the empty-foreground failure mode.

use memstat::filter::FilterConfig;
use memstat::process::{MemoryKind, SyntheticProcess, SyntheticTable};
use memstat::sampler::{AggregationState, Sampler};
use memstat::{drain, report};

fn sampled_state(passes: usize, background: bool) -> AggregationState {
    let table = SyntheticTable::new(vec![
        SyntheticProcess::new(1, 0, "init", "root", 4096),
        SyntheticProcess::new(100, 1, "webserver", "www", 1 << 20),
    ]);
    let filter = FilterConfig::default();
    let sampler = Sampler::new(&table, &filter, background);
    let mut state = AggregationState::new();
    for _ in 0..passes {
        sampler.sample_once(&mut state);
    }
    state
}

#[test]
fn drain_writes_one_chart_per_memory_kind() {
    let tmp = tempfile::tempdir().unwrap();
    let state = sampled_state(3, false);

    let summary = drain(&state, tmp.path()).unwrap();

    assert_eq!(summary.charts.len(), MemoryKind::ALL.len());
    for kind in MemoryKind::ALL {
        let txt = tmp
            .path()
            .join("figures")
            .join(format!("{}_histogram.txt", kind.label()));
        let json = tmp
            .path()
            .join("figures")
            .join(format!("{}_histogram.json", kind.label()));
        assert!(txt.exists(), "missing chart for {}", kind.label());
        assert!(json.exists(), "missing json sidecar for {}", kind.label());
    }

    let chart = std::fs::read_to_string(&summary.charts[0]).unwrap();
    assert!(chart.contains("Histogram of Resident Set Size"));
}

#[test]
fn drain_log_contains_audit_and_tally() {
    let tmp = tempfile::tempdir().unwrap();
    let state = sampled_state(2, false);

    let summary = drain(&state, tmp.path()).unwrap();

    assert_eq!(
        summary.log_path,
        tmp.path().join("logs").join(report::LOG_FILE_NAME)
    );
    let log = std::fs::read_to_string(&summary.log_path).unwrap();
    assert_eq!(log.matches("Sample @").count(), 2);
    assert_eq!(log.matches("PID: ").count(), 4);
    assert!(log.contains("Peak holders:"));
    assert!(log.contains("webserver: 2"));
}

#[test]
fn drain_log_is_overwritten_not_appended() {
    let tmp = tempfile::tempdir().unwrap();

    let first = sampled_state(5, false);
    drain(&first, tmp.path()).unwrap();
    let second = sampled_state(1, false);
    let summary = drain(&second, tmp.path()).unwrap();

    let log = std::fs::read_to_string(&summary.log_path).unwrap();
    assert_eq!(log.matches("Sample @").count(), 1);
}

#[test]
fn drain_without_foreground_samples_fails_without_output() {
    let tmp = tempfile::tempdir().unwrap();

    // Every process is filtered out, so passes run but nothing is collected.
    let table = SyntheticTable::new(vec![SyntheticProcess::new(1, 0, "init", "root", 4096)]);
    let filter = FilterConfig {
        commands: vec!["no-such-command".into()],
        ..Default::default()
    };
    let sampler = Sampler::new(&table, &filter, false);
    let mut state = AggregationState::new();
    sampler.sample_once(&mut state);

    let err = drain(&state, tmp.path()).unwrap_err();
    assert!(err.to_string().contains("no foreground samples"));
    assert!(!tmp.path().join("figures").exists());
    assert!(!tmp.path().join("logs").exists());
}

#[test]
fn drain_with_background_reports_background_counts() {
    let tmp = tempfile::tempdir().unwrap();
    let state = sampled_state(2, true);

    drain(&state, tmp.path()).unwrap();

    let json = std::fs::read_to_string(
        tmp.path().join("figures").join("rss_histogram.json"),
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["background_counts"].is_array());
    assert_eq!(value["counts"].as_array().unwrap().len(), 49);
}

#[test]
fn zero_sum_kind_renders_an_empty_chart() {
    // Every synthetic entry has zero dirty bytes, so that kind's chart must
    // degrade gracefully rather than divide by log(0).
    let tmp = tempfile::tempdir().unwrap();
    let state = sampled_state(2, false);
    assert!(state.series(MemoryKind::Dirty).iter().all(|v| *v == 0));

    drain(&state, tmp.path()).unwrap();

    let chart = std::fs::read_to_string(
        tmp.path().join("figures").join("dirty_histogram.txt"),
    )
    .unwrap();
    assert!(chart.contains("Dirty Memory (Empty)"));
}

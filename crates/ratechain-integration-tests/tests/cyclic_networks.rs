//! Cross-crate tests for cyclic networks and dataset diagnostics.
//!
//! Datasets are written without a factories file, so every analysis runs
//! with `convert_rates` off and counts are parallel process runs.

use ratechain_core::cycle::find_cycles;
use ratechain_core::test_utils::assert_close;
use ratechain_data::schema::StackData;
use ratechain_data::{
    AnalysisConfig, DataLoadError, Report, analyze, load_dataset, run_analysis, write_report,
};
use std::fs;
use std::path::{Path, PathBuf};

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ratechain_cyclic_test_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_items(dir: &Path, ids: &[&str]) {
    let body: Vec<String> = ids.iter().map(|id| format!("(id: \"{id}\")")).collect();
    fs::write(dir.join("items.ron"), format!("[{}]", body.join(", "))).unwrap();
    fs::write(dir.join("groups.ron"), r#"["any"]"#).unwrap();
}

fn rate_config(item: &str, rate: f64) -> AnalysisConfig {
    let mut config = AnalysisConfig::new(vec![StackData::Short(item.to_string(), rate)]);
    config.convert_rates = false;
    config
}

// ============================================================================
// Self-cycle round trip
// ============================================================================

/// `C: a,b -> c`, `D: c,d -> 2d`, `E: d -> e`.
fn write_doubler(dir: &Path) {
    write_items(dir, &["a", "b", "c", "d", "e"]);
    fs::write(
        dir.join("processes.ron"),
        r#"[
            (id: "C", inputs: [("a", 1.0), ("b", 1.0)], outputs: [("c", 1.0)], group: "any"),
            (id: "D", inputs: [("c", 1.0), ("d", 1.0)], outputs: [("d", 2.0)], group: "any"),
            (id: "E", inputs: [("d", 1.0)], outputs: [("e", 1.0)], group: "any"),
        ]"#,
    )
    .unwrap();
}

#[test]
fn doubler_self_cycle_expands_to_member_counts() {
    let dir = make_test_dir("doubler");
    write_doubler(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let chain = dataset.chain();
    let cycles = find_cycles(&chain);
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 1);

    let solution = run_analysis(&dataset, &rate_config("e", 10.0)).unwrap();
    assert_close(solution.count("D"), 10.0);
    assert_close(solution.count("C"), 10.0);
    assert_close(solution.count("E"), 10.0);
    assert_close(solution.materials.total_positive("d"), 20.0);
    assert_close(solution.materials.total_negative("d"), -20.0);
    assert_close(solution.materials.total("a"), -10.0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn collapse_then_expand_restores_the_process_set() {
    let dir = make_test_dir("round_trip");
    write_doubler(&dir);
    let chain = load_dataset(&dir).unwrap().chain();

    let collapsed = chain.remove_cycles().unwrap();
    assert!(collapsed.is_acyclic());
    assert!(collapsed.has_proxies());
    assert!(!collapsed.contains("D"));

    let counts = collapsed
        .processes()
        .iter()
        .map(|p| (p.id.clone(), 1.0))
        .collect();
    let solution = ratechain_core::solution::Solution::from_counts(collapsed, counts)
        .unwrap()
        .expand_cycles()
        .unwrap();

    let mut ids: Vec<&str> = solution
        .chain
        .processes()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["C", "D", "E"]);
    assert_close(solution.count("D"), 1.0);

    let _ = fs::remove_dir_all(&dir);
}

// ============================================================================
// Nested loops
// ============================================================================

/// `D` doubles `d` and sits inside the larger loop `D -> F -> G -> D`.
fn write_nested(dir: &Path) {
    write_items(dir, &["c", "d", "g", "out"]);
    fs::write(
        dir.join("processes.ron"),
        r#"[
            (id: "D", inputs: [("c", 1.0), ("d", 1.0)], outputs: [("d", 2.0)], group: "any"),
            (id: "F", inputs: [("d", 1.0)], outputs: [("g", 1.0), ("out", 1.0)], group: "any"),
            (id: "G", inputs: [("g", 1.0)], outputs: [("c", 1.0)], group: "any"),
        ]"#,
    )
    .unwrap();
}

#[test]
fn nested_loops_expand_recursively() {
    let dir = make_test_dir("nested");
    write_nested(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let collapsed = dataset.chain().remove_cycles().unwrap();
    assert_eq!(collapsed.len(), 1);
    let outer = &collapsed.processes()[0];
    let members = &outer.as_proxy().unwrap().members;
    assert!(members.iter().any(|m| m.is_proxy()));

    let solution = run_analysis(&dataset, &rate_config("out", 4.0)).unwrap();
    assert!(!solution.chain.has_proxies());
    for id in ["D", "F", "G"] {
        assert_close(solution.count(id), 4.0);
    }
    assert_close(solution.materials.total("out"), 4.0);
    assert!(solution.materials.total("d").abs() < 1e-9);
    assert!(solution.imports().is_empty());

    let _ = fs::remove_dir_all(&dir);
}

// ============================================================================
// Diagnostics and reports
// ============================================================================

#[test]
fn unknown_item_in_processes_names_the_file() {
    let dir = make_test_dir("bad_item");
    write_items(&dir, &["a"]);
    fs::write(
        dir.join("processes.ron"),
        r#"[(id: "P", inputs: [("a", 1.0)], outputs: [("steel", 1.0)], group: "any")]"#,
    )
    .unwrap();

    match load_dataset(&dir) {
        Err(DataLoadError::UnresolvedRef {
            file,
            name,
            expected_kind,
        }) => {
            assert!(file.ends_with("processes.ron"));
            assert_eq!(name, "steel");
            assert_eq!(expected_kind, "item");
        }
        other => panic!("expected UnresolvedRef, got {other:?}"),
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unknown_target_names_the_analysis_file() {
    let dir = make_test_dir("bad_target");
    write_doubler(&dir);
    let config_path = dir.join("analysis.ron");
    fs::write(&config_path, r#"(targets: [("unobtainium", 1.0)], convert_rates: false)"#).unwrap();

    match analyze(&dir, &config_path) {
        Err(DataLoadError::UnresolvedRef { file, name, .. }) => {
            assert_eq!(file, config_path);
            assert_eq!(name, "unobtainium");
        }
        other => panic!("expected UnresolvedRef, got {other:?}"),
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn report_written_as_toml_reads_back() {
    let dir = make_test_dir("report");
    write_doubler(&dir);
    let dataset = load_dataset(&dir).unwrap();
    let solution = run_analysis(&dataset, &rate_config("e", 2.0)).unwrap();

    let path = dir.join("report.toml");
    write_report(&Report::from_solution(&solution), &path).unwrap();

    let table: toml::Table = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_close(table["counts"]["D"].as_float().unwrap(), 2.0);
    assert_close(table["imports"]["b"].as_float().unwrap(), 2.0);
    assert!(table.get("machines").is_none());

    let _ = fs::remove_dir_all(&dir);
}

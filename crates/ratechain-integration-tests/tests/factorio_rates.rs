//! Factorio-style integration tests for Ratechain.
//!
//! Each test writes a small dataset to disk, loads it through
//! `ratechain-data`, and checks the solved machine counts and material
//! flows against hand-computed values:
//!
//! - green circuits: a plain tree, solved by both solvers
//! - advanced oil processing: re-convergent byproducts through cracking
//! - kovarex enrichment: a self-loop collapsed into a proxy and expanded

use ratechain_core::error::ChainError;
use ratechain_core::test_utils::assert_close;
use ratechain_data::schema::StackData;
use ratechain_data::{
    AnalysisConfig, DataLoadError, Report, SolverKind, analyze, load_dataset, run_analysis,
};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Helpers
// ============================================================================

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "ratechain_factorio_test_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

fn targets(item: &str, rate: f64) -> Vec<StackData> {
    vec![StackData::Short(item.to_string(), rate)]
}

// ============================================================================
// Datasets
// ============================================================================

/// Plates, cables and circuits. Assemblers run at half speed.
fn write_green_circuits(dir: &Path) {
    fs::write(
        dir.join("items.ron"),
        r#"[
            (id: "iron_ore", group: Some("raw")),
            (id: "copper_ore", group: Some("raw")),
            (id: "iron_plate"),
            (id: "copper_plate"),
            (id: "copper_cable"),
            (id: "electronic_circuit"),
        ]"#,
    )
    .unwrap();
    fs::write(dir.join("groups.ron"), r#"["smelting", "crafting"]"#).unwrap();
    fs::write(
        dir.join("factories.ron"),
        r#"[
            (id: "stone_furnace", groups: ["smelting"]),
            (id: "assembler_1", groups: ["crafting"], duration_multiplier: 2.0),
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("processes.ron"),
        r#"[
            (id: "iron_plate", inputs: [("iron_ore", 1.0)], outputs: [("iron_plate", 1.0)], duration: 3.2, group: "smelting"),
            (id: "copper_plate", inputs: [("copper_ore", 1.0)], outputs: [("copper_plate", 1.0)], duration: 3.2, group: "smelting"),
            (id: "copper_cable", inputs: [("copper_plate", 1.0)], outputs: [("copper_cable", 2.0)], duration: 0.5, group: "crafting"),
            (id: "electronic_circuit", inputs: [("iron_plate", 1.0), ("copper_cable", 3.0)], outputs: [("electronic_circuit", 1.0)], duration: 0.5, group: "crafting"),
        ]"#,
    )
    .unwrap();
}

/// Advanced oil processing with both cracking steps. No factories file.
fn write_oil(dir: &Path) {
    fs::write(
        dir.join("items.json"),
        r#"[
            {"id": "crude_oil"}, {"id": "water"},
            {"id": "heavy_oil"}, {"id": "light_oil"}, {"id": "petroleum_gas"}
        ]"#,
    )
    .unwrap();
    fs::write(dir.join("groups.json"), r#"["refining", "chemistry"]"#).unwrap();
    fs::write(
        dir.join("processes.json"),
        r#"[
            {"id": "advanced_oil_processing",
             "inputs": [["crude_oil", 100], ["water", 50]],
             "outputs": [["heavy_oil", 25], ["light_oil", 45], ["petroleum_gas", 55]],
             "duration": 5, "group": "refining"},
            {"id": "heavy_oil_cracking",
             "inputs": [["heavy_oil", 40], ["water", 30]],
             "outputs": [["light_oil", 30]],
             "duration": 2, "group": "chemistry"},
            {"id": "light_oil_cracking",
             "inputs": [["light_oil", 30], ["water", 30]],
             "outputs": [["petroleum_gas", 20]],
             "duration": 2, "group": "chemistry"}
        ]"#,
    )
    .unwrap();
}

/// Centrifuging ore and the kovarex loop, in TOML.
fn write_kovarex(dir: &Path) {
    fs::write(
        dir.join("items.toml"),
        r#"
[[items]]
id = "uranium_ore"

[[items]]
id = "u235"

[[items]]
id = "u238"
"#,
    )
    .unwrap();
    fs::write(dir.join("groups.toml"), r#"groups = ["centrifuging"]"#).unwrap();
    fs::write(
        dir.join("factories.toml"),
        r#"
[[factories]]
id = "centrifuge"
groups = ["centrifuging"]
"#,
    )
    .unwrap();
    fs::write(
        dir.join("processes.toml"),
        r#"
[[processes]]
id = "uranium_processing"
inputs = [["uranium_ore", 10.0]]
outputs = [["u238", 1.0]]
duration = 12.0
group = "centrifuging"

[[processes]]
id = "kovarex_enrichment"
inputs = [["u235", 40.0], ["u238", 5.0]]
outputs = [["u235", 41.0], ["u238", 2.0]]
duration = 60.0
group = "centrifuging"
"#,
    )
    .unwrap();
}

// ============================================================================
// Green circuits
// ============================================================================

#[test]
fn green_circuits_machine_counts() {
    let dir = make_test_dir("green");
    write_green_circuits(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let solution = run_analysis(
        &dataset,
        &AnalysisConfig::new(targets("electronic_circuit", 1.0)),
    )
    .unwrap();

    assert_close(solution.count("electronic_circuit"), 1.0);
    assert_close(solution.count("copper_cable"), 1.5);
    assert_close(solution.count("copper_plate"), 4.8);
    assert_close(solution.count("iron_plate"), 3.2);

    let imports: Vec<(String, f64)> = solution
        .imports()
        .into_iter()
        .map(|s| (s.item.id().to_string(), s.quantity))
        .collect();
    assert_eq!(imports.len(), 2);
    assert_close(solution.materials.total("iron_ore"), -1.0);
    assert_close(solution.materials.total("copper_ore"), -1.5);

    // Cables are produced and consumed at the same rate.
    assert_close(solution.materials.total_positive("copper_cable"), 3.0);
    assert!(solution.materials.total("copper_cable").abs() < 1e-9);

    cleanup(&dir);
}

#[test]
fn green_circuits_walk_matches_balance() {
    let dir = make_test_dir("green_solvers");
    write_green_circuits(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let mut config = AnalysisConfig::new(targets("electronic_circuit", 7.5));
    let balanced = run_analysis(&dataset, &config).unwrap();
    config.solver = SolverKind::Walk;
    let walked = run_analysis(&dataset, &config).unwrap();

    assert_eq!(
        balanced.counts.keys().collect::<Vec<_>>(),
        walked.counts.keys().collect::<Vec<_>>()
    );
    for (id, count) in &balanced.counts {
        assert_close(walked.count(id), *count);
    }

    cleanup(&dir);
}

#[test]
fn imported_plates_trim_the_smelters() {
    let dir = make_test_dir("green_imports");
    write_green_circuits(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let mut config = AnalysisConfig::new(targets("electronic_circuit", 2.0));
    config.imports = vec!["iron_plate".into(), "copper_plate".into()];
    let solution = run_analysis(&dataset, &config).unwrap();

    assert!(!solution.counts.contains_key("iron_plate"));
    assert!(!solution.counts.contains_key("copper_plate"));
    assert_close(solution.materials.total("copper_plate"), -3.0);
    assert_close(solution.materials.total("iron_plate"), -2.0);

    cleanup(&dir);
}

// ============================================================================
// Advanced oil processing
// ============================================================================

#[test]
fn oil_cracking_balances_byproducts() {
    let dir = make_test_dir("oil");
    write_oil(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let mut config = AnalysisConfig::new(targets("petroleum_gas", 10.0));
    config.convert_rates = false;
    let solution = run_analysis(&dataset, &config).unwrap();

    // Runs per second a, h, l satisfy 25a = 40h, 45a + 30h = 30l and
    // 55a + 20l = 10, so a = 4/39.
    let a = 4.0 / 39.0;
    assert_close(solution.count("advanced_oil_processing"), a * 5.0);
    assert_close(solution.count("heavy_oil_cracking"), 0.625 * a * 2.0);
    assert_close(solution.count("light_oil_cracking"), 2.125 * a * 2.0);

    assert!(solution.materials.total("heavy_oil").abs() < 1e-9);
    assert!(solution.materials.total("light_oil").abs() < 1e-9);
    assert_close(solution.materials.total("petroleum_gas"), 10.0);
    assert_close(solution.materials.total("crude_oil"), -100.0 * a);

    cleanup(&dir);
}

#[test]
fn oil_walk_needs_a_priority() {
    let dir = make_test_dir("oil_walk");
    write_oil(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let mut config = AnalysisConfig::new(targets("petroleum_gas", 10.0));
    config.convert_rates = false;
    config.solver = SolverKind::Walk;

    let err = run_analysis(&dataset, &config).unwrap_err();
    assert!(matches!(
        err,
        DataLoadError::Chain(ChainError::AmbiguousProduction { .. })
    ));

    // With cracking disabled there is a single producer per item.
    config.disabled = vec!["heavy_oil_cracking".into(), "light_oil_cracking".into()];
    let solution = run_analysis(&dataset, &config).unwrap();
    assert_close(solution.count("advanced_oil_processing"), 10.0 / 55.0 * 5.0);
    assert!(solution.materials.total("heavy_oil") > 0.0);

    cleanup(&dir);
}

#[test]
fn oil_byproducts_without_exports_are_unsatisfiable() {
    let dir = make_test_dir("oil_strict");
    write_oil(&dir);
    let dataset = load_dataset(&dir).unwrap();

    // Without cracking, heavy and light oil can only leave as exports.
    let mut config = AnalysisConfig::new(targets("petroleum_gas", 10.0));
    config.convert_rates = false;
    config.disabled = vec!["heavy_oil_cracking".into(), "light_oil_cracking".into()];
    let solution = run_analysis(&dataset, &config).unwrap();
    assert_close(solution.materials.total("heavy_oil"), 25.0 * 10.0 / 55.0);

    config.implicit_exports = false;
    config.exports = vec!["heavy_oil".into()];
    let err = run_analysis(&dataset, &config).unwrap_err();
    assert!(matches!(
        err,
        DataLoadError::Chain(ChainError::Unsatisfiable { .. })
    ));

    config.exports.push("light_oil".into());
    let solution = run_analysis(&dataset, &config).unwrap();
    assert_close(solution.materials.total("light_oil"), 45.0 * 10.0 / 55.0);

    cleanup(&dir);
}

// ============================================================================
// Kovarex enrichment
// ============================================================================

#[test]
fn kovarex_loop_collapses_and_expands() {
    let dir = make_test_dir("kovarex");
    write_kovarex(&dir);
    fs::write(dir.join("analysis.json"), r#"{"targets": [["u235", 1.0]]}"#).unwrap();

    let solution = analyze(&dir, &dir.join("analysis.json")).unwrap();

    assert!(!solution.chain.has_proxies());
    // One run per minute per centrifuge nets one u235 and costs three u238.
    assert_close(solution.count("kovarex_enrichment"), 60.0);
    assert_close(solution.count("uranium_processing"), 36.0);
    assert_close(solution.materials.total("u235"), 1.0);
    assert!(solution.materials.total("u238").abs() < 1e-9);
    assert_close(solution.materials.total("uranium_ore"), -30.0);
    assert_close(solution.materials.total_positive("u235"), 41.0);

    cleanup(&dir);
}

#[test]
fn kovarex_loop_with_both_solvers() {
    let dir = make_test_dir("kovarex_solvers");
    write_kovarex(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let mut config = AnalysisConfig::new(targets("u235", 0.5));
    let balanced = run_analysis(&dataset, &config).unwrap();
    config.solver = SolverKind::Walk;
    let walked = run_analysis(&dataset, &config).unwrap();
    for id in ["kovarex_enrichment", "uranium_processing"] {
        assert_close(walked.count(id), balanced.count(id));
    }

    // Balance handles the loop directly; the walk refuses a cyclic chain.
    config.collapse_cycles = false;
    let err = run_analysis(&dataset, &config).unwrap_err();
    assert!(matches!(
        err,
        DataLoadError::Chain(ChainError::MissingPrecondition { pass: "rate walk", .. })
    ));
    config.solver = SolverKind::Balance;
    let direct = run_analysis(&dataset, &config).unwrap();
    assert_close(direct.count("kovarex_enrichment"), balanced.count("kovarex_enrichment"));

    cleanup(&dir);
}

#[test]
fn kovarex_report_lists_machines() {
    let dir = make_test_dir("kovarex_report");
    write_kovarex(&dir);
    let dataset = load_dataset(&dir).unwrap();

    let solution = run_analysis(&dataset, &AnalysisConfig::new(targets("u235", 1.0))).unwrap();
    let report = Report::from_solution(&solution);
    assert_eq!(report.machines["kovarex_enrichment"].factory, "centrifuge");
    assert_close(report.machines["uranium_processing"].count, 36.0);
    assert_close(report.imports["uranium_ore"], 30.0);
    assert_close(report.items["u235"].produced, 41.0);
    assert_close(report.items["u235"].consumed, 40.0);

    cleanup(&dir);
}

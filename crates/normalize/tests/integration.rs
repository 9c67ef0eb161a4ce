use std::path::PathBuf;

use acctbook_normalize::config::NormalizeConfig;
use acctbook_normalize::model::{AccountRow, AssignmentTable, NormalizeResult, Outcome};
use acctbook_normalize::{load_csv_table, normalize, normalize_assignments, write_csv_table};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config() -> NormalizeConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("book.normalize.toml")).unwrap();
    NormalizeConfig::from_toml(&toml).unwrap()
}

fn load_fixture(config: &NormalizeConfig) -> AssignmentTable {
    let input = config.input.as_deref().unwrap();
    let csv_path = fixtures_dir().join(input);
    let csv_data = std::fs::read_to_string(&csv_path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", csv_path.display()));
    load_csv_table(&csv_data, &config.columns, &config.null_markers).unwrap()
}

fn load_and_run() -> NormalizeResult {
    let config = fixture_config();
    let table = load_fixture(&config);
    normalize(&table, &config).unwrap()
}

fn outcome<'a>(result: &'a NormalizeResult, id: &str) -> &'a Outcome {
    &result
        .rows
        .iter()
        .find(|r| r.account_id == id)
        .unwrap_or_else(|| panic!("no row {id}"))
        .outcome
}

// -------------------------------------------------------------------------
// Fixture book
// -------------------------------------------------------------------------

#[test]
fn fixture_consolidates_both_families() {
    let result = load_and_run();

    assert_eq!(result.meta.config_name, "Fixture book");
    assert_eq!(result.meta.max_accounts_per_csm, 4);
    assert_eq!(result.summary.total_accounts, 12);
    assert_eq!(result.summary.owners, 3);
    assert_eq!(result.summary.families, 2);
    assert_eq!(result.summary.families_consolidated_before, 0);
    assert_eq!(result.summary.families_consolidated_after, 2);
    assert_eq!(result.summary.unassigned, 0);

    for id in ["ACC-001", "ACC-002", "ACC-005", "ACC-010"] {
        assert_eq!(result.table.owner_of(id), Some("Blake"), "{id}");
    }
    for id in ["ACC-004", "ACC-007"] {
        assert_eq!(result.table.owner_of(id), Some("Avery"), "{id}");
    }
}

#[test]
fn fixture_outcomes() {
    let result = load_and_run();

    assert_eq!(outcome(&result, "ACC-001"), &Outcome::Moved { from: "Avery".into() });
    assert_eq!(outcome(&result, "ACC-004"), &Outcome::Moved { from: "Casey".into() });
    assert_eq!(outcome(&result, "ACC-010"), &Outcome::Placed);
    assert_eq!(outcome(&result, "ACC-012"), &Outcome::Placed);
    assert_eq!(
        outcome(&result, "ACC-006"),
        &Outcome::Reassigned { evicted_from: "Blake".into() }
    );
    assert_eq!(
        outcome(&result, "ACC-011"),
        &Outcome::Reassigned { evicted_from: "Blake".into() }
    );
    // Singleton family and untouched loose accounts keep their owner.
    assert_eq!(outcome(&result, "ACC-008"), &Outcome::Unchanged);
    assert_eq!(outcome(&result, "ACC-003"), &Outcome::Unchanged);

    let s = &result.summary;
    assert_eq!((s.unchanged, s.moved, s.placed, s.reassigned), (6, 2, 2, 2));
    assert_eq!(s.evicted, 2);

    let loads: Vec<(&str, usize, usize)> = s
        .owner_loads
        .iter()
        .map(|l| (l.owner.as_str(), l.before, l.after))
        .collect();
    assert_eq!(loads, vec![("Avery", 4, 4), ("Blake", 4, 4), ("Casey", 2, 4)]);
}

#[test]
fn fixture_output_matches_expected_csv() {
    let result = load_and_run();
    let out = write_csv_table(&result.table).unwrap();
    let expected = std::fs::read_to_string(fixtures_dir().join("expected-normalized.csv")).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn fixture_is_a_fixed_point() {
    let config = fixture_config();
    let first = normalize(&load_fixture(&config), &config).unwrap();
    let second = normalize(&first.table, &config).unwrap();
    assert_eq!(second.table, first.table);
    assert_eq!(second.summary.unchanged, 12);
}

#[test]
fn fixture_with_lower_ceiling_exhausts_capacity() {
    let mut config = fixture_config();
    config.max_accounts_per_csm = 3;
    let result = normalize(&load_fixture(&config), &config).unwrap();

    assert_eq!(result.summary.unassigned, 3);
    assert_eq!(result.unassigned_ids().len(), 3);
    for load in &result.summary.owner_loads {
        assert_eq!(load.after, 3, "{}", load.owner);
    }
}

#[test]
fn report_json_shape() {
    let result = load_and_run();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["meta"]["max_accounts_per_csm"], 4);
    assert_eq!(json["summary"]["families_consolidated_after"], 2);
    assert!(json.get("table").is_none(), "table is not part of the report");

    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[0]["account_id"], "ACC-001");
    assert_eq!(rows[0]["outcome"]["kind"], "moved");
    assert_eq!(rows[0]["outcome"]["from"], "Avery");
    assert_eq!(rows[2]["outcome"]["kind"], "unchanged");
    assert!(rows[2].get("parent_account_id").is_none());
}

// -------------------------------------------------------------------------
// Worked examples
// -------------------------------------------------------------------------

#[test]
fn upstream_over_capacity_example() {
    let table = AssignmentTable::from_accounts(vec![
        AccountRow::new("A1", Some("P1"), Some("X")),
        AccountRow::new("A2", Some("P1"), Some("Y")),
        AccountRow::new("A3", Some("P1"), Some("X")),
        AccountRow::new("B1", None, Some("X")),
    ]);
    let result = normalize_assignments(&table, 2).unwrap();

    assert_eq!(result.table.owner_of("A1"), Some("X"));
    assert_eq!(result.table.owner_of("A3"), Some("X"));
    assert_eq!(result.table.owner_of("A2"), Some("Y"));
    assert_eq!(result.table.owner_of("B1"), Some("Y"));
    assert!(result.is_complete());
}

#[test]
fn single_owner_exhaustion_example() {
    let table = AssignmentTable::from_accounts(
        (1..=5)
            .map(|i| AccountRow::new(&format!("acct-{i}"), None, Some("Only")))
            .collect(),
    );
    let result = normalize_assignments(&table, 3).unwrap();

    assert_eq!(result.table.load_of("Only"), 3);
    assert_eq!(result.summary.unassigned, 2);
    assert_eq!(
        result.rows.iter().filter(|r| r.owner.is_none()).count(),
        2
    );
}

#[test]
fn family_bigger_than_ceiling_fills_best_owner_first() {
    let table = AssignmentTable::from_accounts(vec![
        AccountRow::new("f1", Some("BIG"), Some("X")),
        AccountRow::new("f2", Some("BIG"), Some("Y")),
        AccountRow::new("f3", Some("BIG"), Some("Y")),
        AccountRow::new("f4", Some("BIG"), Some("Z")),
    ]);
    let result = normalize_assignments(&table, 3).unwrap();

    // Y holds the most members, so it fills to the ceiling first.
    assert_eq!(result.table.load_of("Y"), 3);
    assert_eq!(result.table.owner_of("f1"), Some("Y"));
    // f4 has nowhere better to go: Y is full and X now holds none of BIG.
    assert_eq!(result.table.owner_of("f4"), Some("Z"));
    assert_eq!(result.table.load_of("X"), 0);
    assert_eq!(result.summary.families_consolidated_after, 0);
}

#[test]
fn interleaved_families_use_spare_owner() {
    let table = AssignmentTable::from_accounts(vec![
        AccountRow::new("a1", Some("PA"), Some("X")),
        AccountRow::new("b1", Some("PB"), Some("X")),
        AccountRow::new("a2", Some("PA"), Some("Y")),
        AccountRow::new("b2", Some("PB"), Some("Y")),
    ]);
    let config = NormalizeConfig {
        roster: vec!["Z".into()],
        ..NormalizeConfig::with_ceiling(2)
    };
    let result = normalize(&table, &config).unwrap();

    assert_eq!(result.summary.families_consolidated_before, 0);
    assert_eq!(result.summary.families_consolidated_after, 2);
    let loads: Vec<(&str, usize)> = result
        .summary
        .owner_loads
        .iter()
        .map(|l| (l.owner.as_str(), l.after))
        .collect();
    assert_eq!(loads, vec![("X", 2), ("Y", 0), ("Z", 2)]);
}

use std::fs;

use rstest::rstest;
use tally_application::{LedgerConfig, LedgerService, RecordPolicy};
use tally_domain::{Money, SettlementPlanner};
use tally_infrastructure::{InMemoryExpenseStore, JsonFileExpenseStore};

const LEDGER: &str = r#"[
    {"id": 1, "amount": "900", "description": "Cabin", "paid_by": "alice",
     "split_with": ["Alice", "bob", "carol"], "category": "Travel"},
    {"id": 2, "amount": 500, "description": "Dinner", "paid_by": "Bob ",
     "split_with": ["alice", "BOB"], "split_type": "exact",
     "split_details": {"alice": 200, "bob": "300"}, "category": "Food"},
    {"id": 3, "amount": "oops", "description": "Typo", "paid_by": "carol",
     "split_with": ["alice"]}
]"#;

#[rstest]
#[case::strict(RecordPolicy::Strict)]
#[case::skip_invalid(RecordPolicy::SkipInvalid)]
fn settles_a_json_ledger_end_to_end(#[case] record_policy: RecordPolicy) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("expenses.json");
    fs::write(&path, LEDGER).expect("write ledger");

    let store = JsonFileExpenseStore::new(&path);
    let planner = SettlementPlanner::default();
    let config = LedgerConfig {
        record_policy,
        ..LedgerConfig::default()
    };
    let service = LedgerService::new(&store, &store, &planner, config);

    if record_policy == RecordPolicy::Strict {
        let err = service.balances().expect_err("row 3 is invalid");
        assert_eq!(err.to_string(), "expense 3 (row 2): 'oops' is not a positive amount");
        return;
    }

    let snapshot = service.snapshot().expect("snapshot");
    let balances: Vec<(&str, Money)> = snapshot
        .people
        .iter()
        .map(|person| (person.name.as_str(), person.balance))
        .collect();
    assert_eq!(
        balances,
        vec![
            ("Alice", Money::from_i64(400)),
            ("Bob", Money::from_i64(-100)),
            ("Carol", Money::from_i64(-300)),
        ]
    );
    assert_eq!(snapshot.stats.total_expenses, 2);
    assert_eq!(snapshot.stats.total_amount, Money::from_i64(1400));
    assert_eq!(snapshot.skipped.len(), 1);

    for settlement in &snapshot.settlements {
        service
            .settle(&settlement.from, &settlement.to, settlement.amount)
            .expect("settle");
    }

    let reopened = JsonFileExpenseStore::new(&path);
    let service = LedgerService::new(&reopened, &reopened, &planner, config);
    assert!(service.settlements().expect("settlements").is_empty());
    let settled: Vec<String> = service
        .settled_transactions()
        .expect("settled")
        .into_iter()
        .map(|row| row.description)
        .collect();
    assert_eq!(
        settled,
        vec!["Settlement: Carol paid Alice", "Settlement: Bob paid Alice"]
    );
}

#[test]
fn in_memory_store_serves_the_same_service() {
    let store = InMemoryExpenseStore::new();
    let planner = SettlementPlanner::default();
    let service = LedgerService::new(&store, &store, &planner, LedgerConfig::default());

    service
        .settle("Dana", "Eli", Money::new(1250, 2))
        .expect("settle");

    let people = service.balances().expect("balances");
    let balances: Vec<(&str, Money)> = people
        .iter()
        .map(|person| (person.name.as_str(), person.balance))
        .collect();
    assert_eq!(
        balances,
        vec![("Dana", Money::new(1250, 2)), ("Eli", Money::new(-1250, 2))]
    );
}

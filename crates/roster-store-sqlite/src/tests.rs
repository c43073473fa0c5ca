//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeMap;

use roster_core::{
  CellValue, NewLedgerRow, PersonIdentity, RateRecord, ReferenceInfo,
  store::{RosterStore, Upsert},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person(id: &str, first: &str, last: &str) -> PersonIdentity {
  PersonIdentity::new(id, first, last).unwrap()
}

fn ledger_row(label: &str, hours: i64) -> NewLedgerRow {
  let mut payload = BTreeMap::new();
  payload.insert("TOTAL\n MH".to_owned(), CellValue::Int(hours));
  payload.insert("(Week / \nMonth)".to_owned(), CellValue::Text("2025-03-01".into()));
  payload.insert("Remarks".to_owned(), CellValue::Absent);
  NewLedgerRow { person_label: label.to_owned(), payload }
}

// ─── Persons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_person_inserts_then_updates() {
  let s = store().await;

  let outcome = s.upsert_person(person("1", "Ada", "Lovelace")).await.unwrap();
  assert_eq!(outcome, Upsert::Inserted);

  let outcome = s.upsert_person(person("1", "Ada", "King")).await.unwrap();
  assert_eq!(outcome, Upsert::Updated);

  let fetched = s.get_person("1".into()).await.unwrap().unwrap();
  assert_eq!(fetched.last_name, "King");
  assert!(fetched.active);
  assert_eq!(s.list_persons().await.unwrap().len(), 1);
}

#[tokio::test]
async fn get_person_missing_returns_none() {
  let s = store().await;
  assert!(s.get_person("nope".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn deactivate_then_reactivate() {
  let s = store().await;
  s.upsert_person(person("1", "Ada", "Lovelace")).await.unwrap();

  assert!(s.deactivate_person("1".into()).await.unwrap());
  assert!(!s.deactivate_person("1".into()).await.unwrap(), "already inactive");
  assert!(!s.get_person("1".into()).await.unwrap().unwrap().active);

  s.upsert_person(person("1", "Ada", "Lovelace")).await.unwrap();
  assert!(s.get_person("1".into()).await.unwrap().unwrap().active);
}

// ─── Reference info ──────────────────────────────────────────────────────────

#[tokio::test]
async fn reference_info_upsert_overwrites_every_field() {
  let s = store().await;
  let mut info = ReferenceInfo {
    external_id: "7".into(),
    company: Some("Acme".into()),
    projects: Some("Filyos; Sakarya".into()),
    ..Default::default()
  };
  assert_eq!(s.upsert_reference_info(info.clone()).await.unwrap(), Upsert::Inserted);

  info.company = None;
  info.title = Some("Engineer".into());
  assert_eq!(s.upsert_reference_info(info.clone()).await.unwrap(), Upsert::Updated);

  let fetched = s.get_reference_info("7".into()).await.unwrap().unwrap();
  assert_eq!(fetched, info);
  assert_eq!(s.list_reference_info().await.unwrap().len(), 1);
}

// ─── Rates ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rates_are_unique_per_person_and_period() {
  let s = store().await;
  let r2024 = RateRecord::new("7", "2024", 50.0, "USD").unwrap();
  let r2025 = RateRecord::new("7", "2025", 60.0, "EUR").unwrap();

  assert_eq!(s.upsert_rate(r2024.clone()).await.unwrap(), Upsert::Inserted);
  assert_eq!(s.upsert_rate(r2025).await.unwrap(), Upsert::Inserted);

  let mut changed = r2024;
  changed.rate_value = 55.0;
  assert_eq!(s.upsert_rate(changed).await.unwrap(), Upsert::Updated);

  let rates = s.list_rates(Some("7".into())).await.unwrap();
  assert_eq!(rates.len(), 2);
  assert_eq!(rates[0].period, "2024");
  assert_eq!(rates[0].rate_value, 55.0);

  let fetched = s.get_rate("7".into(), "2025".into()).await.unwrap().unwrap();
  assert_eq!(fetched.currency, "EUR");
  assert!(s.list_rates(Some("8".into())).await.unwrap().is_empty());
}

// ─── Ledger rows ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn ledger_rows_round_trip_in_insertion_order() {
  let s = store().await;
  for (i, label) in ["Zed", "Ada", "Mia"].into_iter().enumerate() {
    s.insert_ledger_row(ledger_row(label, i as i64)).await.unwrap();
  }

  let rows = s.list_ledger_rows().await.unwrap();
  let labels: Vec<_> = rows.iter().map(|r| r.person_label.as_str()).collect();
  assert_eq!(labels, vec!["Zed", "Ada", "Mia"]);
  assert_eq!(rows[2].get("TOTAL\n MH"), &CellValue::Int(2));
  assert_eq!(rows[2].get("Remarks"), &CellValue::Absent);
  assert_eq!(rows[2].get("(Week / \nMonth)"), &CellValue::Text("2025-03-01".into()));
}

#[tokio::test]
async fn delete_all_ledger_rows_reports_count() {
  let s = store().await;
  s.insert_ledger_row(ledger_row("Ada", 1)).await.unwrap();
  s.insert_ledger_row(ledger_row("Mia", 2)).await.unwrap();

  assert_eq!(s.delete_all_ledger_rows().await.unwrap(), 2);
  assert!(s.list_ledger_rows().await.unwrap().is_empty());
}

// ─── Transactions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn rollback_discards_writes() {
  let s = store().await;
  s.upsert_person(person("1", "Ada", "Lovelace")).await.unwrap();

  s.begin().await.unwrap();
  s.upsert_person(person("2", "Grace", "Hopper")).await.unwrap();
  s.delete_all_ledger_rows().await.unwrap();
  s.rollback().await.unwrap();

  assert_eq!(s.list_persons().await.unwrap().len(), 1);
}

#[tokio::test]
async fn commit_keeps_writes() {
  let s = store().await;
  s.begin().await.unwrap();
  s.upsert_person(person("2", "Grace", "Hopper")).await.unwrap();
  s.commit().await.unwrap();

  assert!(s.get_person("2".into()).await.unwrap().is_some());
}

#[tokio::test]
async fn nested_begin_is_an_error() {
  let s = store().await;
  s.begin().await.unwrap();
  assert!(s.begin().await.is_err());
  s.rollback().await.unwrap();
}

// ─── Counts ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn counts_cover_every_entity() {
  let s = store().await;
  s.upsert_person(person("1", "Ada", "Lovelace")).await.unwrap();
  s.upsert_person(person("2", "Grace", "Hopper")).await.unwrap();
  s.deactivate_person("2".into()).await.unwrap();
  s.upsert_rate(RateRecord::new("1", "2024", 50.0, "USD").unwrap()).await.unwrap();
  s.insert_ledger_row(ledger_row("Ada", 1)).await.unwrap();

  let c = s.counts().await.unwrap();
  assert_eq!(c.persons, 2);
  assert_eq!(c.active_persons, 1);
  assert_eq!(c.rates, 1);
  assert_eq!(c.ledger_rows, 1);
  assert_eq!(c.reference_infos, 0);
}

//! Full pass-repair-pass cycles between a truth store and a replica.

use rowtruth_core::{TableId, TruthStore};
use rowtruth_storage::InMemoryPayloadStore;
use rowtruth_sync::{ScopeFilter, SyncAction, Synchronizer, TruthChecksumSource};
use rowtruth_testkit::{append_insert_rows, one_of_each_type, InMemoryReplica};
use std::collections::BTreeMap;
use std::sync::Arc;

fn truth_tokens(store: &TruthStore) -> BTreeMap<u64, String> {
    store
        .change_etags_snapshot()
        .into_iter()
        .map(|(id, etag)| (id.as_u64(), etag.as_str().to_string()))
        .collect()
}

fn seeded_store() -> Arc<TruthStore> {
    let store = Arc::new(TruthStore::new(Arc::new(InMemoryPayloadStore::new())));
    let columns = one_of_each_type();
    append_insert_rows(&store, TableId::new(1), &columns, 3);
    append_insert_rows(&store, TableId::new(1), &columns, 2);
    append_insert_rows(&store, TableId::new(2), &columns, 1);
    store
}

#[test]
fn drifted_replica_converges_after_one_repair() {
    let store = seeded_store();
    let tokens = truth_tokens(&store);
    assert_eq!(tokens.len(), 3);

    // Build a replica with all three kinds of drift: one object missing,
    // one stale, one that truth no longer has.
    let mut seeded: Vec<(u64, String)> = tokens.clone().into_iter().collect();
    let (missing_id, _) = seeded.remove(0);
    let stale_id = seeded[0].0;
    seeded[0].1 = "stale-token".to_string();
    let phantom_id = tokens.keys().max().unwrap() + 100;
    seeded.push((phantom_id, "phantom".to_string()));

    let replica = Arc::new(InMemoryReplica::with_objects(seeded));
    let truth_leg = Arc::new(TruthChecksumSource::new(Arc::clone(&store)));
    let synchronizer = Synchronizer::new(truth_leg, replica.clone());

    let report = synchronizer.run_pass(&ScopeFilter::all()).unwrap();
    assert_eq!(
        report.actions,
        vec![
            SyncAction::Create(missing_id),
            SyncAction::Update(stale_id),
            SyncAction::Delete(phantom_id),
        ]
    );

    replica.apply(&report.actions, &tokens);

    // A second pass under a fresh salt finds nothing left to repair.
    let report = synchronizer.run_pass(&ScopeFilter::all()).unwrap();
    assert!(report.actions.is_empty());
}

#[test]
fn in_sync_replica_needs_nothing() {
    let store = seeded_store();
    let replica = Arc::new(InMemoryReplica::with_objects(truth_tokens(&store)));
    let truth_leg = Arc::new(TruthChecksumSource::new(store));
    let synchronizer = Synchronizer::new(truth_leg, replica);

    let report = synchronizer.run_pass(&ScopeFilter::all()).unwrap();
    assert!(report.actions.is_empty());
}

#[test]
fn backfill_drift_is_detected_and_repaired() {
    let store = seeded_store();
    let replica = Arc::new(InMemoryReplica::with_objects(truth_tokens(&store)));
    let truth_leg = Arc::new(TruthChecksumSource::new(Arc::clone(&store)));
    let synchronizer = Synchronizer::new(truth_leg, replica.clone());

    // Mutate one record after the replica materialized: its etag changes.
    let touched = store.change_etags_snapshot()[1].0;
    store.backfill_file_refs(&[touched], false);

    let report = synchronizer.run_pass(&ScopeFilter::all()).unwrap();
    assert_eq!(report.actions, vec![SyncAction::Update(touched.as_u64())]);

    replica.apply(&report.actions, &truth_tokens(&store));
    let report = synchronizer.run_pass(&ScopeFilter::all()).unwrap();
    assert!(report.actions.is_empty());
}

#[test]
fn table_teardown_shows_up_as_deletes() {
    let store = seeded_store();
    let replica = Arc::new(InMemoryReplica::with_objects(truth_tokens(&store)));
    let truth_leg = Arc::new(TruthChecksumSource::new(Arc::clone(&store)));
    let synchronizer = Synchronizer::new(truth_leg, replica.clone());

    store.delete_all_for_table(TableId::new(1)).unwrap();

    let report = synchronizer.run_pass(&ScopeFilter::all()).unwrap();
    // Both of table 1's changes must be deleted; table 2's survives.
    assert_eq!(report.actions.len(), 2);
    assert!(report
        .actions
        .iter()
        .all(|a| matches!(a, SyncAction::Delete(_))));

    replica.apply(&report.actions, &truth_tokens(&store));
    assert_eq!(replica.len(), 1);
}

#[test]
fn filter_scopes_a_pass_to_a_shard() {
    let store = seeded_store();
    let tokens = truth_tokens(&store);
    // Replica is completely empty; scope the pass to a single object.
    let replica = Arc::new(InMemoryReplica::new());
    let truth_leg = Arc::new(TruthChecksumSource::new(store));
    let synchronizer = Synchronizer::new(truth_leg, replica.clone());

    let only = *tokens.keys().next().unwrap();
    let report = synchronizer.run_pass(&ScopeFilter::of([only])).unwrap();
    assert_eq!(report.actions, vec![SyncAction::Create(only)]);
}

//! Governance behaviour of the entry store, end to end through the public API.

use std::sync::Arc;

use chrono::Duration;

use zeropoint::{
    Clock, ConfidenceLevel, EntryId, InMemoryBackend, LedgerAction, ManualClock, MemoryKind, SearchQuery,
    StoreConfig, WriteOutcome, WriteRequest, ZeroPoint,
};

fn store() -> (ZeroPoint, ManualClock) {
    let clock = ManualClock::starting_now();
    let store = ZeroPoint::open_with_clock(
        Arc::new(InMemoryBackend::new()),
        StoreConfig::default(),
        Arc::new(clock.clone()),
    )
    .unwrap();
    (store, clock)
}

fn claim(content: &str, confidence: ConfidenceLevel, evidence: u32) -> WriteRequest {
    WriteRequest::new(content, MemoryKind::Fact)
        .source("field report")
        .author("RESEARCHER")
        .confidence(confidence)
        .evidence(evidence)
}

fn written(store: &ZeroPoint, request: WriteRequest) -> EntryId {
    store.write(request).unwrap().entry_id().cloned().unwrap()
}

#[test]
fn test_single_source_high_and_medium_are_capped() {
    let (store, _) = store();
    for requested in [ConfidenceLevel::High, ConfidenceLevel::Medium] {
        let outcome = store.write(claim(&format!("{requested} claim"), requested, 1)).unwrap();
        let WriteOutcome::Accepted { entry_id, effective_confidence, .. } = outcome else {
            panic!("expected acceptance");
        };
        assert_eq!(effective_confidence, ConfidenceLevel::Low);

        let entry = store.get(&entry_id).unwrap().unwrap();
        assert_eq!(entry.provenance.confidence, ConfidenceLevel::Low);
        assert!(entry
            .provenance
            .limitations
            .as_deref()
            .unwrap()
            .contains("AUTO-CAPPED"));
    }
}

#[test]
fn test_missing_provenance_rejects_without_adding() {
    let (store, _) = store();
    store.write(claim("existing", ConfidenceLevel::Low, 2)).unwrap();
    let before = store.len().unwrap();

    let outcome = store
        .write(
            WriteRequest::new("x", MemoryKind::Fact)
                .source("")
                .author("a")
                .confidence(ConfidenceLevel::High)
                .evidence(5),
        )
        .unwrap();
    let rejection = outcome.rejection().unwrap();
    assert!(rejection.reason.to_lowercase().contains("provenance"));
    assert_eq!(store.len().unwrap(), before);

    let no_author = store.write(claim("y", ConfidenceLevel::Low, 2).author("")).unwrap();
    assert!(!no_author.is_accepted());
    assert_eq!(store.len().unwrap(), before);
}

#[test]
fn test_consecutive_reads_increment_read_count() {
    let (store, clock) = store();
    let id = written(&store, claim("read me", ConfidenceLevel::Medium, 2));

    let first = store.read(&id, "READER-A").unwrap().unwrap();
    clock.advance(Duration::seconds(5));
    let second = store.read(&id, "READER-B").unwrap().unwrap();

    assert_eq!(first.reads.read_count, 1);
    assert_eq!(second.reads.read_count, 2);
    assert!(second.reads.last_read_at > first.reads.last_read_at);
    assert_eq!(second.reads.last_read_by.as_deref(), Some("READER-B"));
    assert_eq!(first.content, second.content);
    assert_eq!(second.version, 1);
}

#[test]
fn test_staleness_is_flagged_by_the_first_read_after_the_window() {
    let (store, clock) = store();
    let id = written(&store, claim("aging", ConfidenceLevel::Medium, 2));

    clock.advance(Duration::days(7));
    assert!(!store.read(&id, "READER").unwrap().unwrap().governance.flagged_stale);

    clock.advance(Duration::seconds(1));
    assert!(!store.get(&id).unwrap().unwrap().governance.flagged_stale);
    assert!(store.read(&id, "READER").unwrap().unwrap().governance.flagged_stale);
    assert_eq!(store.stats().unwrap().stale, 1);
}

#[test]
fn test_search_orders_by_tier_then_recency() {
    let (store, clock) = store();
    let old_high = written(&store, claim("old high", ConfidenceLevel::High, 3).tags(["ops"]));
    clock.advance(Duration::minutes(1));
    let low = written(&store, claim("low", ConfidenceLevel::Low, 2).tags(["ops"]));
    clock.advance(Duration::minutes(1));
    let newer_low = written(&store, claim("newer low", ConfidenceLevel::Low, 2).tags(["ops"]));
    clock.advance(Duration::minutes(1));
    let medium = written(&store, claim("medium", ConfidenceLevel::Medium, 2).tags(["ops"]));
    written(&store, claim("elsewhere", ConfidenceLevel::High, 3).tags(["finance"]));

    let hits = store.search(&SearchQuery::new().tags(["ops"]), "PLANNER").unwrap();
    let ids: Vec<_> = hits.iter().map(|e| e.entry_id.clone()).collect();
    assert_eq!(ids, vec![old_high, medium, newer_low, low]);

    for pair in hits.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.confidence() > b.confidence() || (a.confidence() == b.confidence() && a.updated_at >= b.updated_at));
    }
}

#[test]
fn test_search_filters_combine_and_empty_results_are_logged() {
    let (store, _) = store();
    written(&store, claim("fact", ConfidenceLevel::Medium, 2).tags(["a"]));
    written(
        &store,
        WriteRequest::new("skill", MemoryKind::Skill)
            .tags(["a"])
            .source("s")
            .author("A")
            .confidence(ConfidenceLevel::High)
            .evidence(2),
    );

    let skills = store
        .search(&SearchQuery::new().tags(["a"]).kind(MemoryKind::Skill), "PLANNER")
        .unwrap();
    assert_eq!(skills.len(), 1);

    let none = store
        .search(&SearchQuery::new().min_confidence(ConfidenceLevel::High).kind(MemoryKind::Fact), "PLANNER")
        .unwrap();
    assert!(none.is_empty());

    let searches: Vec<_> = store
        .ledger()
        .unwrap()
        .into_iter()
        .filter(|row| row.action == LedgerAction::Search)
        .collect();
    assert_eq!(searches.len(), 2);
    assert_eq!(searches[1].entry_id, "MULTI");
    assert!(searches[1].detail.contains("results=0"));
}

#[test]
fn test_review_is_metadata_only() {
    let (store, clock) = store();
    let id = written(&store, claim("reviewed claim", ConfidenceLevel::Medium, 2));
    let before = store.get(&id).unwrap().unwrap();
    clock.advance(Duration::hours(2));

    assert!(store.mark_reviewed(&id, "HUMAN").unwrap());
    let after = store.get(&id).unwrap().unwrap();
    assert_eq!(after.content, before.content);
    assert_eq!(after.version, before.version);
    assert_eq!(after.updated_at, clock.now());
    assert!(after.governance.reviewed);
}

#[test]
fn test_every_operation_leaves_a_ledger_row() {
    let (store, _) = store();
    let id = written(&store, claim("audited", ConfidenceLevel::Medium, 2));
    store.read(&id, "READER").unwrap();
    store.read(&EntryId::new("ZP-000000000000"), "READER").unwrap();
    store.search(&SearchQuery::new(), "PLANNER").unwrap();
    store.mark_reviewed(&id, "HUMAN").unwrap();

    let actions: Vec<_> = store.ledger().unwrap().into_iter().map(|row| row.action).collect();
    assert_eq!(
        actions,
        vec![
            LedgerAction::Write,
            LedgerAction::Read,
            LedgerAction::ReadMiss,
            LedgerAction::Search,
            LedgerAction::Review,
        ]
    );
}

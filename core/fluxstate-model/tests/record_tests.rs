use fluxstate_model::{Fields, PageRequest, Record, RemoteRecord, can_load_more};
use fluxstate_types::{LocalId, OwnerId, RemoteId};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    title: String,
}

impl Fields for Note {
    const COLLECTION: &'static str = "notes";
}

fn local_note(title: &str) -> Record<Note> {
    Record {
        local_id: LocalId::new(1).unwrap(),
        owner_id: OwnerId::new(10),
        remote_id: None,
        is_local_only: true,
        is_locally_modified: false,
        fields: Note {
            title: title.to_string(),
        },
    }
}

// ── Record ───────────────────────────────────────────────────────

#[test]
fn local_only_record_is_not_synced() {
    let note = local_note("draft");
    assert!(!note.is_synced());
    assert_eq!(note.natural_key(), None);
}

#[test]
fn edit_changes_fields_only() {
    let mut note = local_note("before");
    note.edit(|f| f.title = "after".into());
    assert_eq!(note.fields.title, "after");
    assert!(!note.is_locally_modified);
    assert!(note.is_local_only);
}

#[test]
fn record_serializes_bookkeeping_and_fields() {
    let note = local_note("json");
    let value = serde_json::to_value(&note).unwrap();
    assert_eq!(value["local_id"], 1);
    assert_eq!(value["owner_id"], 10);
    assert!(value["remote_id"].is_null());
    assert_eq!(value["fields"]["title"], "json");

    let back: Record<Note> = serde_json::from_value(value).unwrap();
    assert_eq!(back, note);
}

// ── RemoteRecord ─────────────────────────────────────────────────

#[test]
fn remote_record_into_record_is_synced_and_clean() {
    let remote = RemoteRecord::new(
        RemoteId::new(500).unwrap(),
        Note {
            title: "server".into(),
        },
    );
    let record = remote.into_record(LocalId::new(3).unwrap(), OwnerId::new(10));

    assert_eq!(record.remote_id, Some(RemoteId::new(500).unwrap()));
    assert!(!record.is_local_only);
    assert!(!record.is_locally_modified);
    assert!(record.is_synced());
}

#[test]
fn keyed_remote_record_has_no_remote_id() {
    let remote = RemoteRecord::keyed(Note { title: "k".into() });
    assert_eq!(remote.remote_id, None);
}

// ── Paging ───────────────────────────────────────────────────────

#[test]
fn page_numbers_are_one_based() {
    assert_eq!(PageRequest::first(20).number(), 1);
    assert_eq!(PageRequest::after(20, 20).number(), 2);
    assert_eq!(PageRequest::after(45, 20).number(), 3);
}

#[test]
fn full_page_can_load_more() {
    assert!(can_load_more(20, 20));
    assert!(!can_load_more(19, 20));
    assert!(!can_load_more(0, 0));
}

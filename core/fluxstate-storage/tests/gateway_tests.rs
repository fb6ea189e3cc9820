use fluxstate_storage::{
    OrderBy, PersistenceGateway, Predicate, Row, SqliteGateway, StorageError, UpsertKey, WriteOp,
};
use fluxstate_types::{OwnerId, RemoteId};
use pretty_assertions::assert_eq;
use serde_json::json;

const SITE: OwnerId = OwnerId::new(7);

fn remote(raw: u64) -> RemoteId {
    RemoteId::new(raw).unwrap()
}

fn row(collection: &str, remote_id: Option<u64>, data: serde_json::Value) -> Row {
    Row {
        local_id: None,
        collection: collection.into(),
        owner_id: SITE,
        remote_id: remote_id.map(remote),
        natural_key: None,
        is_local_only: remote_id.is_none(),
        is_locally_modified: false,
        data,
    }
}

fn keyed(collection: &str, key: &str, data: serde_json::Value) -> Row {
    Row {
        natural_key: Some(key.into()),
        is_local_only: false,
        ..row(collection, None, data)
    }
}

fn titles(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|r| r.data["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

// ── Insert / select ─────────────────────────────────────────────

#[test]
fn insert_assigns_increasing_local_ids() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let a = gw.insert(&row("posts", None, json!({"title": "a"}))).unwrap();
    let b = gw.insert(&row("posts", None, json!({"title": "b"}))).unwrap();
    assert!(b > a);
}

#[test]
fn local_ids_are_not_reused_after_delete() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let a = gw.insert(&row("posts", None, json!({"title": "a"}))).unwrap();
    gw.delete_where(&Predicate::collection("posts").local_id(a))
        .unwrap();
    let b = gw.insert(&row("posts", None, json!({"title": "b"}))).unwrap();
    assert!(b > a);
}

#[test]
fn select_returns_stored_row() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let id = gw
        .insert(&row("posts", Some(42), json!({"title": "hello", "is_page": false})))
        .unwrap();

    let rows = gw
        .select_where(&Predicate::collection("posts"), &OrderBy::default())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].local_id, Some(id));
    assert_eq!(rows[0].remote_id, Some(remote(42)));
    assert_eq!(rows[0].owner_id, SITE);
    assert_eq!(rows[0].data["title"], "hello");
}

#[test]
fn local_only_row_with_remote_id_is_rejected() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let mut bad = row("posts", Some(1), json!({}));
    bad.is_local_only = true;
    assert!(matches!(gw.insert(&bad), Err(StorageError::InvalidData(_))));
}

#[test]
fn collections_are_isolated() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.insert(&row("posts", None, json!({"title": "p"}))).unwrap();
    gw.insert(&row("pages", None, json!({"title": "q"}))).unwrap();
    assert_eq!(gw.count_where(&Predicate::collection("posts")).unwrap(), 1);
    assert_eq!(gw.count_where(&Predicate::collection("other")).unwrap(), 0);
}

// ── Predicates and ordering ─────────────────────────────────────

#[test]
fn field_eq_filters_on_json_fields() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.insert(&row("posts", Some(1), json!({"title": "post", "is_page": false})))
        .unwrap();
    gw.insert(&row("posts", Some(2), json!({"title": "page", "is_page": true})))
        .unwrap();
    gw.insert(&row("posts", Some(3), json!({"title": "untyped", "is_page": null})))
        .unwrap();

    let posts = Predicate::collection("posts").field_eq("is_page", false);
    let pages = Predicate::collection("posts").field_eq("is_page", true);
    let nulls = Predicate::collection("posts").field_eq("is_page", serde_json::Value::Null);
    assert_eq!(gw.count_where(&posts).unwrap(), 1);
    assert_eq!(gw.count_where(&pages).unwrap(), 1);
    assert_eq!(gw.count_where(&nulls).unwrap(), 1);
}

#[test]
fn flags_and_owner_filter() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let mut modified = row("posts", Some(5), json!({}));
    modified.is_locally_modified = true;
    gw.insert(&modified).unwrap();
    gw.insert(&row("posts", None, json!({}))).unwrap();
    let mut elsewhere = row("posts", None, json!({}));
    elsewhere.owner_id = OwnerId::new(8);
    gw.insert(&elsewhere).unwrap();

    let base = Predicate::collection("posts").owner(SITE);
    assert_eq!(gw.count_where(&base.clone()).unwrap(), 2);
    assert_eq!(gw.count_where(&base.clone().local_only(true)).unwrap(), 1);
    assert_eq!(gw.count_where(&base.locally_modified(true)).unwrap(), 1);
}

#[test]
fn order_by_field_breaks_ties_by_local_id() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.insert(&row("posts", None, json!({"title": "b", "rank": 1})))
        .unwrap();
    gw.insert(&row("posts", None, json!({"title": "a", "rank": 2})))
        .unwrap();
    gw.insert(&row("posts", None, json!({"title": "c", "rank": 1})))
        .unwrap();

    let all = Predicate::collection("posts");
    let asc = gw.select_where(&all, &OrderBy::asc("rank")).unwrap();
    assert_eq!(titles(&asc), vec!["b", "c", "a"]);

    let desc = gw.select_where(&all, &OrderBy::desc("title")).unwrap();
    assert_eq!(titles(&desc), vec!["c", "b", "a"]);
}

#[test]
fn invalid_field_name_is_rejected() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let bad = Predicate::collection("posts").field_eq("title') OR 1=1 --", "x");
    assert!(matches!(
        gw.count_where(&bad),
        Err(StorageError::InvalidData(_))
    ));
}

// ── Upserts ─────────────────────────────────────────────────────

#[test]
fn upsert_by_remote_id_updates_in_place() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let first = gw
        .upsert_by_remote_id(&row("posts", Some(9), json!({"title": "v1"})))
        .unwrap();
    let second = gw
        .upsert_by_remote_id(&row("posts", Some(9), json!({"title": "v2"})))
        .unwrap();

    assert_eq!(first, second);
    let rows = gw
        .select_where(&Predicate::collection("posts"), &OrderBy::default())
        .unwrap();
    assert_eq!(titles(&rows), vec!["v2"]);
}

#[test]
fn upsert_by_remote_id_is_scoped_to_owner() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.upsert_by_remote_id(&row("posts", Some(9), json!({}))).unwrap();
    let mut other = row("posts", Some(9), json!({}));
    other.owner_id = OwnerId::new(99);
    gw.upsert_by_remote_id(&other).unwrap();
    assert_eq!(gw.count_where(&Predicate::collection("posts")).unwrap(), 2);
}

#[test]
fn upsert_by_remote_id_requires_remote_id() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let result = gw.upsert_by_remote_id(&row("posts", None, json!({})));
    assert!(matches!(result, Err(StorageError::InvalidData(_))));
}

#[test]
fn upsert_by_local_id_overwrites_bookkeeping() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let id = gw.insert(&row("posts", None, json!({"title": "draft"}))).unwrap();

    let mut synced = row("posts", Some(77), json!({"title": "published"}));
    synced.local_id = Some(id);
    assert_eq!(gw.upsert_by_local_id(&synced).unwrap(), id);

    let stored = &gw
        .select_where(&Predicate::collection("posts").local_id(id), &OrderBy::default())
        .unwrap()[0];
    assert_eq!(stored.remote_id, Some(remote(77)));
    assert!(!stored.is_local_only);
    assert_eq!(stored.data["title"], "published");
}

#[test]
fn upsert_by_local_id_reinserts_missing_row_under_same_id() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let id = gw.insert(&row("posts", None, json!({}))).unwrap();
    gw.delete_where(&Predicate::collection("posts")).unwrap();

    let mut again = row("posts", None, json!({"title": "back"}));
    again.local_id = Some(id);
    assert_eq!(gw.upsert(&again, UpsertKey::LocalId).unwrap(), id);
}

#[test]
fn upsert_by_natural_key() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let a = gw
        .upsert_by_natural_key(&keyed("plugins", "akismet", json!({"title": "old"})))
        .unwrap();
    let b = gw
        .upsert_by_natural_key(&keyed("plugins", "akismet", json!({"title": "new"})))
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(gw.count_where(&Predicate::collection("plugins")).unwrap(), 1);
}

#[test]
fn upsert_batch_is_atomic() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    let rows = vec![
        row("posts", Some(1), json!({"title": "one"})),
        row("posts", None, json!({"title": "no id"})),
    ];
    assert!(gw.upsert_batch(&rows, UpsertKey::RemoteId).is_err());
    assert_eq!(gw.count_where(&Predicate::collection("posts")).unwrap(), 0);
}

// ── Replace ─────────────────────────────────────────────────────

#[test]
fn replace_where_swaps_matching_rows_only() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.insert(&keyed("plugins", "a", json!({"title": "a"}))).unwrap();
    gw.insert(&keyed("plugins", "b", json!({"title": "b"}))).unwrap();
    let mut other_site = keyed("plugins", "a", json!({"title": "other"}));
    other_site.owner_id = OwnerId::new(8);
    gw.insert(&other_site).unwrap();

    let fresh = vec![
        keyed("plugins", "b", json!({"title": "b2"})),
        keyed("plugins", "c", json!({"title": "c"})),
    ];
    let scope = Predicate::collection("plugins").owner(SITE);
    assert_eq!(gw.replace_where(&scope, &fresh).unwrap(), 2);

    let rows = gw.select_where(&scope, &OrderBy::asc("title")).unwrap();
    assert_eq!(titles(&rows), vec!["b2", "c"]);
    assert_eq!(gw.count_where(&Predicate::collection("plugins")).unwrap(), 3);
}

#[test]
fn failed_replace_leaves_previous_rows() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.insert(&keyed("plugins", "a", json!({"title": "a"}))).unwrap();

    let invalid = vec![
        keyed("plugins", "x", json!({})),
        Row {
            is_local_only: true,
            ..row("plugins", Some(9), json!({}))
        },
    ];
    let scope = Predicate::collection("plugins").owner(SITE);
    assert!(gw.replace_where(&scope, &invalid).is_err());

    let rows = gw.select_where(&scope, &OrderBy::default()).unwrap();
    assert_eq!(titles(&rows), vec!["a"]);
}

#[test]
fn replace_with_repeated_keys_keeps_last() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.insert(&keyed("plugins", "old", json!({"title": "old"}))).unwrap();

    let repeated = vec![
        keyed("plugins", "x", json!({"title": "first"})),
        row("plugins", Some(4), json!({"title": "four"})),
        keyed("plugins", "x", json!({"title": "second"})),
        row("plugins", Some(4), json!({"title": "four again"})),
    ];
    let scope = Predicate::collection("plugins").owner(SITE);
    assert_eq!(gw.replace_where(&scope, &repeated).unwrap(), 2);

    let rows = gw.select_where(&scope, &OrderBy::asc("title")).unwrap();
    assert_eq!(titles(&rows), vec!["four again", "second"]);
}

// ── Multi-op writes ─────────────────────────────────────────────

#[test]
fn write_all_reports_rows_per_op() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.insert(&row("posts", Some(1), json!({"title": "gone"}))).unwrap();
    gw.insert(&keyed("tags", "a", json!({"title": "a"}))).unwrap();

    let touched = gw
        .write_all(&[
            WriteOp::Delete(Predicate::collection("posts")),
            WriteOp::Upsert {
                rows: vec![
                    row("posts", Some(2), json!({"title": "two"})),
                    row("posts", Some(3), json!({"title": "three"})),
                ],
                key: UpsertKey::RemoteId,
            },
            WriteOp::Replace {
                predicate: Predicate::collection("tags"),
                rows: vec![keyed("tags", "b", json!({"title": "b"}))],
            },
        ])
        .unwrap();

    assert_eq!(touched, vec![1, 2, 1]);
    let posts = gw
        .select_where(&Predicate::collection("posts"), &OrderBy::default())
        .unwrap();
    assert_eq!(titles(&posts), vec!["two", "three"]);
    let tags = gw
        .select_where(&Predicate::collection("tags"), &OrderBy::default())
        .unwrap();
    assert_eq!(titles(&tags), vec!["b"]);
}

#[test]
fn failed_op_rolls_back_earlier_ops_in_other_collections() {
    let gw = SqliteGateway::open_in_memory().unwrap();
    gw.insert(&keyed("listing", "kept", json!({"title": "kept"}))).unwrap();

    let result = gw.write_all(&[
        WriteOp::Upsert {
            rows: vec![keyed("catalogue", "p-1", json!({"title": "p-1"}))],
            key: UpsertKey::NaturalKey,
        },
        WriteOp::Replace {
            predicate: Predicate::collection("listing"),
            rows: vec![Row {
                is_local_only: true,
                ..row("listing", Some(1), json!({}))
            }],
        },
    ]);

    assert!(matches!(result, Err(StorageError::InvalidData(_))));
    assert_eq!(gw.count_where(&Predicate::collection("catalogue")).unwrap(), 0);
    let listing = gw
        .select_where(&Predicate::collection("listing"), &OrderBy::default())
        .unwrap();
    assert_eq!(titles(&listing), vec!["kept"]);
}

// ── On disk ─────────────────────────────────────────────────────

#[test]
fn rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");

    let id = {
        let gw = SqliteGateway::open(&path).unwrap();
        gw.insert(&row("posts", Some(3), json!({"title": "kept"})))
            .unwrap()
    };

    let gw = SqliteGateway::open(&path).unwrap();
    let rows = gw
        .select_where(&Predicate::collection("posts"), &OrderBy::default())
        .unwrap();
    assert_eq!(rows[0].local_id, Some(id));
    assert_eq!(titles(&rows), vec!["kept"]);

    let next = gw.insert(&row("posts", None, json!({}))).unwrap();
    assert!(next > id);
}

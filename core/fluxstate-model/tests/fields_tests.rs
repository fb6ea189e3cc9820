use fluxstate_model::Fields;
use serde::{Deserialize, Serialize};

// ── Default implementations ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Plain {
    value: u32,
}

impl Fields for Plain {
    const COLLECTION: &'static str = "plain";
}

#[test]
fn default_natural_key_is_none() {
    assert_eq!(Plain { value: 1 }.natural_key(), None);
}

#[test]
fn default_keep_unechoed_keeps_server_copy() {
    let mut server = Plain { value: 2 };
    server.keep_unechoed(&Plain { value: 1 });
    assert_eq!(server.value, 2);
}

// ── Custom implementations ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Article {
    slug: String,
    created: Option<String>,
}

impl Fields for Article {
    const COLLECTION: &'static str = "articles";

    fn natural_key(&self) -> Option<String> {
        Some(self.slug.clone())
    }

    fn keep_unechoed(&mut self, local: &Self) {
        if self.created.is_none() {
            self.created = local.created.clone();
        }
    }
}

#[test]
fn custom_natural_key() {
    let a = Article {
        slug: "hello-world".into(),
        created: None,
    };
    assert_eq!(a.natural_key().as_deref(), Some("hello-world"));
    assert_eq!(Article::COLLECTION, "articles");
}

#[test]
fn keep_unechoed_fills_missing_value_from_local() {
    let local = Article {
        slug: "a".into(),
        created: Some("2024-01-01".into()),
    };
    let mut server = Article {
        slug: "a".into(),
        created: None,
    };
    server.keep_unechoed(&local);
    assert_eq!(server.created.as_deref(), Some("2024-01-01"));
}

#[test]
fn keep_unechoed_prefers_echoed_value() {
    let local = Article {
        slug: "a".into(),
        created: Some("2024-01-01".into()),
    };
    let mut server = Article {
        slug: "a".into(),
        created: Some("2024-02-02".into()),
    };
    server.keep_unechoed(&local);
    assert_eq!(server.created.as_deref(), Some("2024-02-02"));
}

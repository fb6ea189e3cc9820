use chrono::{DateTime, SubsecRound, Utc};
use fluxstate_model::{Fields, Record};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A post or page as stored locally.
pub type Post = Record<PostFields>;

/// Publication status. `Trash` is terminal: a trashed post is only ever
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Publish,
    Private,
    Pending,
    Trash,
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Publish => "publish",
            Self::Private => "private",
            Self::Pending => "pending",
            Self::Trash => "trash",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub is_page: bool,
    pub featured_image_id: Option<u64>,
    #[serde(default)]
    pub category_ids: Vec<u64>,
    /// Set locally at creation. Some servers do not echo it back on push.
    /// Stored as epoch milliseconds so it orders numerically.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub date_created: Option<DateTime<Utc>>,
}

impl PostFields {
    /// An empty draft created now.
    pub fn draft(is_page: bool) -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            status: PostStatus::Draft,
            is_page,
            featured_image_id: None,
            category_ids: Vec::new(),
            date_created: Some(Utc::now().trunc_subsecs(3)),
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.status == PostStatus::Trash
    }
}

impl Fields for PostFields {
    const COLLECTION: &'static str = "posts";

    fn keep_unechoed(&mut self, local: &Self) {
        if self.date_created.is_none() {
            self.date_created = local.date_created;
        }
    }
}

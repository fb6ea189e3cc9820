use serde::{Deserialize, Serialize};

/// A page request handed to a remote client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of items to skip.
    pub offset: usize,
    /// Maximum number of items the server should return.
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn after(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// One-based page number, for servers that page by number.
    pub fn number(&self) -> usize {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }
}

/// A full page means the server may have more.
pub fn can_load_more(returned: usize, page_size: usize) -> bool {
    page_size > 0 && returned == page_size
}

//! Paginated result wrapper.

use serde::{Deserialize, Serialize};

/// One page of a paginated sequence, together with the metadata paginated
/// views infer their key qualifiers from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub per_page: u32,
    pub current_page: u32,
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, per_page: u32, current_page: u32) -> Self {
        Self {
            items,
            per_page,
            current_page,
            total: None,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Last page number, when the total is known. Pages are 1-based.
    pub fn last_page(&self) -> Option<u64> {
        let total = self.total?;
        if self.per_page == 0 {
            return None;
        }
        Some(total.div_ceil(u64::from(self.per_page)).max(1))
    }
}

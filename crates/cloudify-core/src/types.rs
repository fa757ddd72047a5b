//! Envelopes shared by collection endpoints.

use serde::{Deserialize, Serialize};

/// Paged collection returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResponse<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Pagination metadata.
    #[serde(default)]
    pub metadata: ListMetadata,
}

impl<T> ListResponse<T> {
    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the items on this page.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for ListResponse<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Metadata attached to a list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListMetadata {
    /// Pagination details.
    #[serde(default)]
    pub pagination: Pagination,
}

/// Pagination details of a list response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    /// Total number of matching items on the manager.
    #[serde(default)]
    pub total: u64,
    /// Page size requested.
    #[serde(default)]
    pub size: u64,
    /// Offset of the first item on this page.
    #[serde(default)]
    pub offset: u64,
}

impl Pagination {
    /// Returns true if items remain past this page.
    #[must_use]
    pub const fn has_more(&self, page_len: usize) -> bool {
        self.offset.saturating_add(page_len as u64) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_response_deserializes_metadata() {
        let page: ListResponse<serde_json::Value> = serde_json::from_value(json!({
            "items": [{"id": "a"}, {"id": "b"}],
            "metadata": {"pagination": {"total": 5, "size": 2, "offset": 0}}
        }))
        .unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page.metadata.pagination.total, 5);
        assert!(page.metadata.pagination.has_more(page.len()));
    }

    #[test]
    fn list_response_tolerates_missing_metadata() {
        let page: ListResponse<serde_json::Value> =
            serde_json::from_value(json!({"items": []})).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.metadata, ListMetadata::default());
        assert!(!page.metadata.pagination.has_more(0));
    }

    #[test]
    fn has_more_saturates_on_huge_offset() {
        let pagination = Pagination {
            total: u64::MAX,
            size: 10,
            offset: u64::MAX - 1,
        };
        assert!(!pagination.has_more(10));

        let pagination = Pagination {
            total: 30,
            size: 10,
            offset: 10,
        };
        assert!(pagination.has_more(10));
        assert!(!pagination.has_more(20));
    }
}

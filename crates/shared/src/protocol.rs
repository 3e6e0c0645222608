use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Query-string state of a list view: page, free-text search and status
/// filter. Any change to any field starts a fresh load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            search: None,
            status: None,
        }
    }
}

impl ListQuery {
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Blank search text is treated as no search.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        let trimmed = search.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
        // a new search always restarts from the first page
        self.page = 1;
        self
    }

    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status.filter(|status| !status.trim().is_empty());
        self.page = 1;
        self
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        pairs
    }
}

/// Paginated list envelope returned by the REST backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn first_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_search_resets_to_first_page() {
        let query = ListQuery::default().with_page(4).with_search("  paracetamol ");

        assert_eq!(query.page, 1);
        assert_eq!(query.search.as_deref(), Some("paracetamol"));
    }

    #[test]
    fn blank_filters_are_dropped_from_query_string() {
        let query = ListQuery::default()
            .with_search("   ")
            .with_status(Some(String::new()))
            .with_page(2);

        assert_eq!(
            query.to_query_pairs(),
            vec![("page", "2".to_string()), ("limit", "10".to_string())]
        );
    }

    #[test]
    fn page_envelope_fills_missing_fields() {
        let page: Page<serde_json::Value> =
            serde_json::from_str(r#"{"items":[{"id":1}],"total":23,"limit":10}"#).expect("page");

        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages(), 3);
    }
}

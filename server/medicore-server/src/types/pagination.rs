//! Pagination parameters shared by every list endpoint.

use crate::error::{PaginationInfo, ResponseMetadata};
use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};

/// Standard pagination query parameters.
///
/// These are always `#[serde(flatten)]`-ed into per-resource filter structs;
/// flattening routes query values through serde's string-buffering path, so
/// the numeric fields parse from strings explicitly.
#[derive(Debug, Deserialize, IntoParams, ToSchema, Clone)]
pub struct PaginationParams {
    #[param(example = 1, minimum = 1)]
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub page: Option<u32>,

    #[param(example = 20, minimum = 1, maximum = 100)]
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub page_size: Option<u32>,
}

fn de_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl PaginationParams {
    /// Page number, defaulting to 1 and never below it.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, defaulting to 20 and clamped to 1..=100.
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        i64::from((self.page() - 1) * self.page_size())
    }

    pub fn total_pages(&self, total_count: i64) -> u32 {
        if total_count <= 0 {
            return 1;
        }
        ((total_count as f64) / f64::from(self.page_size())).ceil() as u32
    }

    /// Response metadata describing this page of a `total_count`-row result.
    pub fn to_metadata(&self, total_count: i64) -> ResponseMetadata {
        let total_pages = self.total_pages(total_count);
        ResponseMetadata {
            pagination: Some(PaginationInfo {
                page: self.page() as i32,
                page_size: self.page_size() as i32,
                total_pages: total_pages as i32,
                has_next: self.page() < total_pages,
                has_previous: self.page() > 1,
            }),
            total_count: Some(total_count),
        }
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: Some(1),
            page_size: Some(20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = PaginationParams {
            page: None,
            page_size: None,
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 20);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn offset_reflects_page() {
        let params = PaginationParams {
            page: Some(3),
            page_size: Some(10),
        };
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let params = PaginationParams {
            page: Some(0),
            page_size: Some(500),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 100);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams {
            page: Some(1),
            page_size: Some(20),
        };
        assert_eq!(params.total_pages(0), 1);
        assert_eq!(params.total_pages(20), 1);
        assert_eq!(params.total_pages(21), 2);
        assert_eq!(params.total_pages(100), 5);
    }

    #[test]
    fn metadata_flags_neighbouring_pages() {
        let params = PaginationParams {
            page: Some(2),
            page_size: Some(20),
        };
        let metadata = params.to_metadata(100);
        let pagination = metadata.pagination.unwrap();
        assert_eq!(pagination.total_pages, 5);
        assert!(pagination.has_next);
        assert!(pagination.has_previous);
        assert_eq!(metadata.total_count, Some(100));
    }

    #[test]
    fn metadata_on_single_page() {
        let params = PaginationParams {
            page: Some(1),
            page_size: Some(20),
        };
        let pagination = params.to_metadata(5).pagination.unwrap();
        assert!(!pagination.has_next);
        assert!(!pagination.has_previous);
    }

    #[test]
    fn parses_from_flattened_string_values() {
        #[derive(serde::Deserialize)]
        struct Outer {
            search: Option<String>,
            #[serde(flatten)]
            pagination: PaginationParams,
        }

        let outer: Outer =
            serde_urlencoded::from_str("search=smith&page=2&page_size=50").unwrap();
        assert_eq!(outer.search.as_deref(), Some("smith"));
        assert_eq!(outer.pagination.page(), 2);
        assert_eq!(outer.pagination.page_size(), 50);

        let outer: Outer = serde_urlencoded::from_str("").unwrap();
        assert_eq!(outer.pagination.page(), 1);
        assert_eq!(outer.pagination.page_size(), 20);
    }
}

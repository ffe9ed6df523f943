//! Pagination descriptor for search requests.
//!
//! A [`PageRequest`] is built from raw page parameters by
//! [`PageRequest::of`]. No clamping happens here: out-of-range values are
//! carried as given and rejected by the search engine through
//! [`PageRequest::bounds`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ServiceError;

pub const DEFAULT_PAGE_NUMBER: i64 = 0;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

#[derive(Debug, Error)]
#[error("invalid sort direction '{0}': expected ASC or DESC")]
pub struct ParseSortDirectionError(String);

impl FromStr for SortDirection {
    type Err = ParseSortDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASC" | "asc" => Ok(SortDirection::Asc),
            "DESC" | "desc" => Ok(SortDirection::Desc),
            other => Err(ParseSortDirectionError(other.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// Sort field and direction. Only exists when a sort field was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

/// Canonical pagination descriptor.
///
/// When `sort` is `None`, result ordering is engine-defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_number: i64,
    pub page_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::unsorted(DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE)
    }
}

/// Validated slice boundaries of a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    /// Build a page request from raw parameters.
    ///
    /// A present, non-empty `sort_field` yields a sorted request carrying
    /// `direction`. Otherwise the request is unsorted and `direction` is
    /// dropped.
    pub fn of(
        page_number: i64,
        page_size: i64,
        sort_field: Option<&str>,
        direction: SortDirection,
    ) -> Self {
        match sort_field.filter(|f| !f.is_empty()) {
            Some(field) => Self::sorted(page_number, page_size, field, direction),
            None => Self::unsorted(page_number, page_size),
        }
    }

    pub fn unsorted(page_number: i64, page_size: i64) -> Self {
        Self {
            page_number,
            page_size,
            sort: None,
        }
    }

    pub fn sorted(
        page_number: i64,
        page_size: i64,
        field: impl Into<String>,
        direction: SortDirection,
    ) -> Self {
        Self {
            page_number,
            page_size,
            sort: Some(SortOrder {
                field: field.into(),
                direction,
            }),
        }
    }

    /// Check the page parameters and compute the slice to return.
    ///
    /// Fails with [`ServiceError::InvalidRequest`] on a negative page
    /// number, a non-positive page size, a page size above `max_page_size`,
    /// or an offset that does not fit in memory.
    pub fn bounds(&self, max_page_size: i64) -> Result<PageBounds, ServiceError> {
        if self.page_number < 0 {
            return Err(ServiceError::InvalidRequest(format!(
                "page number must be >= 0, got {}",
                self.page_number
            )));
        }
        if self.page_size <= 0 {
            return Err(ServiceError::InvalidRequest(format!(
                "page size must be > 0, got {}",
                self.page_size
            )));
        }
        if self.page_size > max_page_size {
            return Err(ServiceError::InvalidRequest(format!(
                "page size must be <= {}, got {}",
                max_page_size, self.page_size
            )));
        }
        let offset = self
            .page_number
            .checked_mul(self.page_size)
            .and_then(|o| usize::try_from(o).ok())
            .ok_or_else(|| {
                ServiceError::InvalidRequest(format!(
                    "page {} of size {} is out of range",
                    self.page_number, self.page_size
                ))
            })?;
        Ok(PageBounds {
            offset,
            limit: self.page_size as usize,
        })
    }
}

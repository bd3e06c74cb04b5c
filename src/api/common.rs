//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use serde::{Deserialize, Serialize};

use crate::models::ListParams;

// ============================================================================
// Pagination Defaults
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for reader APIs
pub fn default_page_size() -> u32 {
    10
}

/// Default page size for admin APIs
pub fn default_per_page() -> u32 {
    20
}

// ============================================================================
// Pagination Query Types
// ============================================================================

/// Reader pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.page_size)
    }
}

/// Admin pagination query parameters
#[derive(Debug, Deserialize)]
pub struct AdminPaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl AdminPaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

// ============================================================================
// Shared bodies
// ============================================================================

/// Request body naming several records
#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<i64>,
}

/// Number of records a bulk operation touched
#[derive(Debug, Serialize)]
pub struct AffectedResponse {
    pub affected: u64,
}

/// Generic success flag
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

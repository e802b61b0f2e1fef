//! User directory: the login allow-list

use std::collections::HashSet;
use std::sync::Arc;

use cwa_common::sheets::{SheetResult, Spreadsheet};

/// Identifiers allowed to log in
pub type AllowList = HashSet<String>;

/// Reads the allow-list worksheet (column 1, no header)
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn Spreadsheet>,
    sheet_name: String,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn Spreadsheet>, sheet_name: impl Into<String>) -> Self {
        Self {
            store,
            sheet_name: sheet_name.into(),
        }
    }

    /// Fetch every identifier in column 1 of the allow-list sheet
    ///
    /// No retry: a failure here is fatal for the request that needed it.
    pub async fn fetch_allowed_users(&self) -> SheetResult<AllowList> {
        let worksheet = self.store.worksheet(&self.sheet_name).await?;
        let values = self.store.col_values(&worksheet, 1).await?;
        let allowed: AllowList = values.into_iter().filter(|v| !v.is_empty()).collect();

        tracing::info!(sheet = %self.sheet_name, users = allowed.len(), "Fetched allow-list");
        Ok(allowed)
    }
}

/// Trimmed login candidate, or `None` if nothing was entered
pub fn normalize_candidate(candidate: &str) -> Option<&str> {
    let trimmed = candidate.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Exact membership of the trimmed candidate; no case folding
pub fn authenticate(candidate: &str, allowed: &AllowList) -> bool {
    normalize_candidate(candidate).is_some_and(|id| allowed.contains(id))
}

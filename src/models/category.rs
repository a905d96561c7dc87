//! Category model
//!
//! Categories are a flat-or-nested label set that transactions may point at.
//! The ledger only needs them to exist; hierarchy management lives elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::CategoryId;

/// A transaction category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Parent category, if this is a subcategory
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

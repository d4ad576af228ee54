//! List-page view model: search, category filters, sort and paging over a
//! fully loaded entity collection.

pub mod filter;
pub mod pager;
pub mod record;
pub mod sort;
pub mod state;

pub use filter::{Bucket, FacetDef, FacetRule, FilterState};
pub use record::{FieldValue, Record};
pub use sort::{SortDirection, SortKey, SortKind, SortSpec};
pub use state::{render, ViewEffect, ViewPage, ViewSchema, ViewState};

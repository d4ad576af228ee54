use super::filter::{self, FacetDef, FacetOptions, FilterState, NumericRange};
use super::pager::{self, PageWindow};
use super::record::Record;
use super::sort::{self, SortDirection, SortKey, SortSpec};
use serde::Serialize;

/// Static shape of one list page: what can be searched, filtered and sorted.
#[derive(Debug, Clone)]
pub struct ViewSchema {
    pub search_fields: Vec<&'static str>,
    pub facets: Vec<FacetDef>,
    pub sort_keys: Vec<SortKey>,
    pub default_sort: &'static str,
    pub page_size: usize,
}

impl ViewSchema {
    pub fn facet(&self, key: &str) -> Option<&FacetDef> {
        self.facets.iter().find(|f| f.key == key)
    }
}

/// Side effects a shell must perform after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewEffect {
    ScrollToTop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub search: String,
    pub filters: FilterState,
    pub sort: SortSpec,
    pub page: usize,
    pub page_size: usize,
}

impl ViewState {
    pub fn new(schema: &ViewSchema) -> Self {
        Self {
            search: String::new(),
            filters: FilterState::default(),
            sort: SortSpec::asc(schema.default_sort),
            page: 1,
            page_size: schema.page_size.max(1),
        }
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
        self.page = 1;
    }

    pub fn set_filter(&mut self, category: &str, values: Vec<String>) {
        let mut deduped: Vec<String> = Vec::with_capacity(values.len());
        for v in values {
            if !deduped.contains(&v) {
                deduped.push(v);
            }
        }
        if deduped.is_empty() {
            self.filters.selected.remove(category);
        } else {
            self.filters.selected.insert(category.to_string(), deduped);
        }
        self.page = 1;
    }

    pub fn toggle_filter(&mut self, category: &str, value: &str) {
        let mut current = self.filters.selected_for(category).to_vec();
        if let Some(pos) = current.iter().position(|v| v == value) {
            current.remove(pos);
        } else {
            current.push(value.to_string());
        }
        self.set_filter(category, current);
    }

    pub fn set_range(&mut self, category: &str, min: Option<f64>, max: Option<f64>) {
        let range = NumericRange { min, max };
        if range.is_open() {
            self.filters.ranges.remove(category);
        } else {
            self.filters.ranges.insert(category.to_string(), range);
        }
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterState::default();
        self.page = 1;
    }

    /// Same field without a direction flips it; a new field starts ascending.
    /// Sorting keeps the current page.
    pub fn set_sort(&mut self, field: &str, direction: Option<SortDirection>) {
        match direction {
            Some(d) => {
                self.sort = SortSpec {
                    field: field.to_string(),
                    direction: d,
                }
            }
            None if self.sort.field == field => self.sort.direction = self.sort.direction.flipped(),
            None => self.sort = SortSpec::asc(field),
        }
    }

    pub fn set_page(&mut self, page: usize) -> Vec<ViewEffect> {
        self.page = page.max(1);
        vec![ViewEffect::ScrollToTop]
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPage {
    pub items: Vec<serde_json::Value>,
    pub total_items: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
    pub empty: bool,
    pub active_filters: usize,
    pub facets: Vec<FacetOptions>,
    pub search: String,
    pub sort: SortSpec,
    pub filters: FilterState,
}

/// Records surviving search and filters, in sorted order.
pub fn ordered<'a>(records: &'a [Record], schema: &ViewSchema, state: &ViewState) -> Vec<&'a Record> {
    let mut rows = filter::apply(
        records,
        &schema.search_fields,
        &state.search,
        &schema.facets,
        &state.filters,
    );
    sort::sort_records(&mut rows, &schema.sort_keys, &state.sort);
    rows
}

/// collection → search → category filters → sort → page slice.
pub fn render(records: &[Record], schema: &ViewSchema, state: &ViewState) -> ViewPage {
    let rows = ordered(records, schema, state);
    let (page_rows, window): (&[&Record], PageWindow) = pager::slice(&rows, state.page, state.page_size);
    let facets = schema
        .facets
        .iter()
        .map(|f| filter::facet_options(records, f))
        .collect();
    ViewPage {
        items: page_rows.iter().map(|r| r.to_json()).collect(),
        total_items: window.total_items,
        total_pages: window.total_pages,
        page: window.page,
        page_size: window.page_size,
        empty: window.is_empty(),
        active_filters: state.filters.active_count(),
        facets,
        search: state.search.clone(),
        sort: state.sort.clone(),
        filters: state.filters.clone(),
    }
}

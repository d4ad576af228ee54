#[path = "../src/view/mod.rs"]
mod view;

use view::{render, Bucket, FacetDef, FacetRule, Record, SortDirection, SortKey, SortKind, ViewEffect, ViewSchema, ViewState};

const FACULTY: &[Bucket] = &[
    Bucket::new("none", "No Faculty", Some(0.0), Some(0.0)),
    Bucket::new("1-5", "1-5 Faculty", Some(1.0), Some(5.0)),
    Bucket::new("6-10", "6-10 Faculty", Some(6.0), Some(10.0)),
    Bucket::new("10+", "10+ Faculty", Some(11.0), None),
];

fn schema(page_size: usize) -> ViewSchema {
    ViewSchema {
        search_fields: vec!["name", "code"],
        facets: vec![
            FacetDef {
                key: "status",
                label: "Status",
                rule: FacetRule::Values {
                    field: "status",
                    fallback: Some("active"),
                },
            },
            FacetDef {
                key: "hod_assigned",
                label: "HOD",
                rule: FacetRule::Presence {
                    field: "hod",
                    absent: &["Not Assigned"],
                    yes_label: "HOD Assigned",
                    no_label: "No HOD",
                },
            },
            FacetDef {
                key: "faculty_range",
                label: "Faculty",
                rule: FacetRule::Buckets {
                    field: "faculty_count",
                    buckets: FACULTY,
                },
            },
        ],
        sort_keys: vec![
            SortKey {
                key: "name",
                label: "Name",
                field: "name",
                kind: SortKind::Text,
            },
            SortKey {
                key: "facultyCount",
                label: "Faculty",
                field: "faculty_count",
                kind: SortKind::Number,
            },
            SortKey {
                key: "createdAt",
                label: "Created",
                field: "created_at",
                kind: SortKind::Date,
            },
        ],
        default_sort: "name",
        page_size,
    }
}

/// 101 departments: every third inactive, every fourth without a head.
fn departments() -> Vec<Record> {
    (0..101)
        .map(|i| {
            let mut r = Record::new(format!("d{:03}", i))
                .with("name", format!("Department {:03}", i))
                .with("code", format!("D{:03}", i))
                .with("faculty_count", (i % 14) as i64)
                .with("created_at", format!("2024-01-{:02}", (i % 28) + 1));
            if i % 3 == 0 {
                r = r.with("status", "inactive");
            }
            if i % 4 != 0 {
                r = r.with("hod", format!("Dr. {}", i));
            }
            r
        })
        .collect()
}

fn option_count(page: &view::ViewPage, facet: &str, value: &str) -> usize {
    page.facets
        .iter()
        .find(|f| f.key == facet)
        .and_then(|f| f.options.iter().find(|o| o.value == value))
        .map(|o| o.count)
        .unwrap_or(0)
}

#[test]
fn paging_windows_a_hundred_and_one_rows() {
    let rows = departments();
    let schema = schema(25);
    let mut state = ViewState::new(&schema);

    let first = render(&rows, &schema, &state);
    assert_eq!(first.total_items, 101);
    assert_eq!(first.total_pages, 5);
    assert_eq!(first.items.len(), 25);
    assert_eq!(first.items[0]["name"], "Department 000");

    assert_eq!(state.set_page(5), vec![ViewEffect::ScrollToTop]);
    let last = render(&rows, &schema, &state);
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0]["id"], "d100");

    state.set_page(6);
    let past = render(&rows, &schema, &state);
    assert!(past.items.is_empty());
    assert!(past.empty);
}

#[test]
fn filters_reset_page_but_sort_does_not() {
    let rows = departments();
    let schema = schema(10);
    let mut state = ViewState::new(&schema);

    state.set_page(3);
    state.set_sort("facultyCount", None);
    assert_eq!(state.page, 3);
    state.set_sort("facultyCount", None);
    assert_eq!(state.sort.direction, SortDirection::Desc);
    assert_eq!(state.page, 3);

    state.toggle_filter("status", "inactive");
    assert_eq!(state.page, 1);
    let page = render(&rows, &schema, &state);
    assert_eq!(page.total_items, 34);
    let top: Vec<f64> = page
        .items
        .iter()
        .map(|i| i["faculty_count"].as_f64().unwrap_or(-1.0))
        .collect();
    assert!(top.windows(2).all(|w| w[0] >= w[1]));

    state.set_page(2);
    state.set_search("department 00");
    assert_eq!(state.page, 1);
    state.set_page(2);
    state.clear_filters();
    assert_eq!(state.page, 1);
}

#[test]
fn categories_and_together_values_or_within() {
    let rows = departments();
    let schema = schema(200);
    let mut state = ViewState::new(&schema);

    state.set_filter("status", vec!["active".into(), "inactive".into()]);
    assert_eq!(render(&rows, &schema, &state).total_items, 101);

    state.set_filter("hod_assigned", vec!["no".into()]);
    let no_hod = render(&rows, &schema, &state);
    assert_eq!(no_hod.total_items, 26);

    state.set_filter("status", vec!["inactive".into()]);
    let both = render(&rows, &schema, &state);
    // i % 12 == 0 for 0..=96
    assert_eq!(both.total_items, 9);
    assert!(both
        .items
        .iter()
        .all(|i| i["status"] == "inactive" && i.get("hod").is_none()));
}

#[test]
fn facet_counts_ignore_active_filters_and_search() {
    let rows = departments();
    let schema = schema(25);
    let mut state = ViewState::new(&schema);

    let before = render(&rows, &schema, &state);
    assert_eq!(option_count(&before, "status", "active"), 67);
    assert_eq!(option_count(&before, "status", "inactive"), 34);
    assert_eq!(option_count(&before, "faculty_range", "none"), 8);

    state.set_search("Department 05");
    state.toggle_filter("faculty_range", "10+");
    let after = render(&rows, &schema, &state);
    assert!(after.total_items < before.total_items);
    assert_eq!(option_count(&after, "status", "active"), 67);
    assert_eq!(option_count(&after, "faculty_range", "none"), 8);
    assert_eq!(after.active_filters, 1);
}

#[test]
fn bucket_edges_are_inclusive() {
    let rows = vec![
        Record::new("a").with("name", "A").with("faculty_count", 5i64),
        Record::new("b").with("name", "B").with("faculty_count", 6i64),
        Record::new("c").with("name", "C").with("faculty_count", 10i64),
        Record::new("d").with("name", "D").with("faculty_count", 11i64),
    ];
    let schema = schema(25);
    let mut state = ViewState::new(&schema);
    state.set_filter("faculty_range", vec!["6-10".into()]);
    let page = render(&rows, &schema, &state);
    let ids: Vec<_> = page.items.iter().map(|i| i["id"].as_str().unwrap_or("")).collect();
    assert_eq!(ids, vec!["b", "c"]);
}

#[test]
fn missing_dates_sort_first_ascending() {
    let rows = vec![
        Record::new("new").with("name", "N").with("created_at", "2025-03-01T10:00:00Z"),
        Record::new("none").with("name", "X"),
        Record::new("old").with("name", "O").with("created_at", "2023-11-20"),
    ];
    let schema = schema(25);
    let mut state = ViewState::new(&schema);
    state.set_sort("createdAt", Some(SortDirection::Asc));
    let page = render(&rows, &schema, &state);
    let ids: Vec<_> = page.items.iter().map(|i| i["id"].as_str().unwrap_or("")).collect();
    assert_eq!(ids, vec!["none", "old", "new"]);
}

//! End-to-end tests for view composition.

use std::cmp::Ordering;
use std::sync::Arc;
use std::thread;

use horizon_lattice_table::selection;
use horizon_lattice_table::{
    Column, ColumnFilter, ColumnSet, ExpansionState, FilterState, PageBy, PaginationState, RawRows,
    RowNode, Selection, SelectionStatus, SortDirection, SortKey, SortState, TableConfig,
    TableController, TableError, TableState, TableWarning, WarningContext, build_view, compose_view,
    normalize,
};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    key: String,
    name: String,
    n: Option<i64>,
}

fn item(key: &str, name: &str, n: i64) -> Item {
    Item {
        key: key.to_string(),
        name: name.to_string(),
        n: Some(n),
    }
}

fn blank(key: &str, name: &str) -> Item {
    Item {
        n: None,
        ..item(key, name, 0)
    }
}

fn key_of(item: &Item) -> String {
    item.key.clone()
}

fn columns() -> ColumnSet<Item> {
    ColumnSet::new(vec![
        Column::new("name", |i: &Item| i.name.as_str().into()).title("Name"),
        Column::new("n", |i: &Item| i.n.into()).title("N"),
    ])
    .unwrap()
}

fn keys(view: &horizon_lattice_table::ViewSnapshot<Item>) -> Vec<String> {
    view.visible_entries().iter().map(|e| e.key().to_string()).collect()
}

fn sample_tree() -> RawRows<Item> {
    RawRows::Nested(vec![RowNode::with_children(
        item("R", "Root", 1),
        vec![
            RowNode::with_children(item("A", "Alpha", 2), vec![RowNode::leaf(item("A1", "A1", 3))]),
            RowNode::leaf(item("B", "Beta", 4)),
        ],
    )])
}

#[test]
fn test_flat_dataset_in_input_order() {
    let rows = RawRows::Flat((1..=5).map(|i| item(&format!("r{i}"), "row", i)).collect());
    let view =
        build_view(rows, key_of, &columns(), &TableState::default(), &TableConfig::default())
            .unwrap();

    assert_eq!(keys(&view), vec!["r1", "r2", "r3", "r4", "r5"]);
    assert_eq!(view.total_count(), 5);
    assert_eq!(view.page_count(), 1);
    assert!(view.visible_entries().iter().all(|e| e.depth() == 0 && e.parent_key().is_none()));
}

#[test]
fn test_search_keeps_ancestor_chain() {
    let state = TableState {
        filter: FilterState::new().with_search("a1"),
        ..TableState::default()
    };
    let view =
        build_view(sample_tree(), key_of, &columns(), &state, &TableConfig::default()).unwrap();

    assert_eq!(keys(&view), vec!["R", "A", "A1"]);
    assert_eq!(view.matched_count(), 3);
}

#[test]
fn test_selection_status_propagates() {
    let model = normalize(sample_tree(), key_of).unwrap();

    let selected = selection::toggle("A1", &Selection::new(), &model);
    let status = selection::compute_status(&model, &selected);
    assert_eq!(status["A"], SelectionStatus::Checked);
    assert_eq!(status["R"], SelectionStatus::Indeterminate);

    let selected = selection::toggle("B", &selected, &model);
    let status = selection::compute_status(&model, &selected);
    assert_eq!(status["R"], SelectionStatus::Checked);

    let selected = selection::toggle("R", &selected, &model);
    assert!(selected.is_empty());
}

#[test]
fn test_sort_direction_keeps_tie_order() {
    let rows = || {
        RawRows::Flat(vec![
            item("x", "x", 3),
            item("y", "y", 1),
            item("z", "z", 2),
            item("w", "w", 1),
        ])
    };
    let asc = TableState {
        sort: SortState::by("n", SortDirection::Asc),
        ..TableState::default()
    };
    let view = build_view(rows(), key_of, &columns(), &asc, &TableConfig::default()).unwrap();
    assert_eq!(keys(&view), vec!["y", "w", "z", "x"]);

    let desc = TableState {
        sort: SortState::by("n", SortDirection::Desc),
        ..TableState::default()
    };
    let view = build_view(rows(), key_of, &columns(), &desc, &TableConfig::default()).unwrap();
    assert_eq!(keys(&view), vec!["x", "z", "y", "w"]);
}

#[test]
fn test_missing_values_sort_last() {
    let rows = || RawRows::Flat(vec![blank("a", "a"), item("b", "b", 2), item("c", "c", 1)]);
    for direction in [SortDirection::Asc, SortDirection::Desc] {
        let state = TableState {
            sort: SortState::by("n", direction),
            ..TableState::default()
        };
        let view = build_view(rows(), key_of, &columns(), &state, &TableConfig::default()).unwrap();
        assert_eq!(keys(&view).last().map(String::as_str), Some("a"));
    }
}

#[test]
fn test_secondary_sort_key() {
    let rows = RawRows::Flat(vec![item("1", "b", 1), item("2", "a", 2), item("3", "a", 1)]);
    let state = TableState {
        sort: SortState::by("name", SortDirection::Asc).then(SortKey::descending("n")),
        ..TableState::default()
    };
    let view = build_view(rows, key_of, &columns(), &state, &TableConfig::default()).unwrap();
    assert_eq!(keys(&view), vec!["2", "3", "1"]);
}

#[test]
fn test_twenty_three_rows_three_pages() {
    let rows = RawRows::Flat((0..23).map(|i| item(&i.to_string(), "row", i)).collect());
    let model = normalize(rows, key_of).unwrap();
    let state = TableState {
        pagination: PaginationState::new(2, 10),
        ..TableState::default()
    };
    let view = compose_view(&model, &columns(), &state, &TableConfig::default());

    assert_eq!(view.page_count(), 3);
    assert_eq!(view.visible_entries().len(), 3);
    assert!(!view.page().has_next());
}

#[test]
fn test_key_under_two_parents_is_duplicate() {
    let rows = RawRows::Nested(vec![
        RowNode::with_children(item("p", "p", 1), vec![RowNode::leaf(item("x", "x", 1))]),
        RowNode::with_children(item("q", "q", 1), vec![RowNode::leaf(item("x", "x", 2))]),
    ]);
    let err =
        build_view(rows, key_of, &columns(), &TableState::default(), &TableConfig::default())
            .unwrap_err();
    assert!(matches!(err, TableError::DuplicateKey { ref key } if key == "x"));
    assert!(err.is_structural());
}

#[test]
fn test_linked_rows_with_cycle() {
    let rows = vec![item("a", "a", 1), item("b", "b", 1)];
    let parents = |i: &Item| Some(if i.key == "a" { "b".to_string() } else { "a".to_string() });
    let err = normalize(RawRows::linked(rows, parents), key_of).unwrap_err();
    assert!(matches!(err, TableError::Cycle { .. }));
}

#[test]
fn test_linked_rows_build_tree() {
    let rows = vec![item("child", "c", 1), item("root", "r", 1)];
    let parents = |i: &Item| (i.key == "child").then(|| "root".to_string());
    let view = build_view(
        RawRows::linked(rows, parents),
        key_of,
        &columns(),
        &TableState::default(),
        &TableConfig::default(),
    )
    .unwrap();
    assert_eq!(keys(&view), vec!["root", "child"]);
    assert_eq!(view.visible_entries()[1].depth(), 1);
}

#[test]
fn test_stale_column_references_warn() {
    let state = TableState {
        filter: FilterState::new().with_column_filter("removed", ColumnFilter::NotEmpty),
        sort: SortState::by("removed", SortDirection::Asc),
        ..TableState::default()
    };
    let view =
        build_view(sample_tree(), key_of, &columns(), &state, &TableConfig::default()).unwrap();

    assert_eq!(view.total_filtered_count(), 4);
    assert_eq!(
        view.warnings(),
        &[
            TableWarning::InvalidColumn {
                key: "removed".into(),
                context: WarningContext::Filter,
            },
            TableWarning::InvalidColumn {
                key: "removed".into(),
                context: WarningContext::Sort,
            },
        ]
    );
}

#[test]
fn test_column_range_filter() {
    let rows = RawRows::Flat((1..=10).map(|i| item(&i.to_string(), "row", i)).collect());
    let state = TableState {
        filter: FilterState::new().with_column_filter("n", ColumnFilter::between(3, 5)),
        ..TableState::default()
    };
    let view = build_view(rows, key_of, &columns(), &state, &TableConfig::default()).unwrap();
    assert_eq!(keys(&view), vec!["3", "4", "5"]);
}

#[test]
fn test_collapse_before_pagination() {
    let config = TableConfig::default().with_page_by(PageBy::Rows);
    let state = TableState {
        expansion: ExpansionState::all_expanded().set_expanded("A", false),
        pagination: PaginationState::new(0, 3),
        ..TableState::default()
    };
    let view = build_view(sample_tree(), key_of, &columns(), &state, &config).unwrap();

    assert_eq!(keys(&view), vec!["R", "A", "B"]);
    assert_eq!(view.total_filtered_count(), 3);
    assert_eq!(view.page_count(), 1);
    assert!(view.is_expanded("R"));
    assert!(!view.is_expanded("A"));
}

#[test]
fn test_controller_session() {
    let table =
        TableController::new(sample_tree(), key_of, columns(), TableConfig::default()).unwrap();

    table.toggle_row("A");
    let view = table.cycle_sort("name");
    assert_eq!(view.status_of("R"), SelectionStatus::Indeterminate);
    assert_eq!(keys(&view), vec!["R", "A", "A1", "B"]);

    let view = table.cycle_sort("name");
    assert_eq!(keys(&view), vec!["R", "B", "A", "A1"]);

    let saved = table.state().to_json().unwrap();
    let view = table.clear_selection();
    assert_eq!(view.header_status(), SelectionStatus::Unchecked);

    let view = table.restore(TableState::from_json(&saved).unwrap());
    assert_eq!(view.status_of("A"), SelectionStatus::Checked);
}

#[test]
fn test_snapshots_shared_across_threads() {
    let table = Arc::new(
        TableController::new(
            RawRows::Flat((0..50).map(|i| item(&i.to_string(), "row", i)).collect()),
            key_of,
            columns(),
            TableConfig::default(),
        )
        .unwrap(),
    );
    let before = table.snapshot();

    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            for _ in 0..4 {
                table.next_page();
            }
        })
    };
    writer.join().unwrap();

    assert_eq!(before.page().page_index, 0);
    assert_eq!(table.snapshot().page().page_index, 4);
}

#[test]
fn test_custom_comparator_ties_keep_input_order() {
    // "p" and "q" are declared equal by the comparator even though their
    // values differ.
    let columns = ColumnSet::new(vec![Column::new("n", |i: &Item| i.n.into()).comparator(
        |a: &Item, b: &Item| {
            let marked = |i: &Item| i.key == "p" || i.key == "q";
            if marked(a) && marked(b) {
                Ordering::Equal
            } else {
                a.n.cmp(&b.n)
            }
        },
    )])
    .unwrap();
    let rows = || {
        RawRows::Flat(vec![
            item("q", "q", 5),
            item("a", "a", 9),
            item("p", "p", 4),
            item("b", "b", 1),
        ])
    };

    for direction in [SortDirection::Asc, SortDirection::Desc] {
        let state = TableState {
            sort: SortState::by("n", direction),
            ..TableState::default()
        };
        let first = build_view(rows(), key_of, &columns, &state, &TableConfig::default()).unwrap();
        let again = build_view(rows(), key_of, &columns, &state, &TableConfig::default()).unwrap();
        assert_eq!(keys(&first), keys(&again));

        let order = keys(&first);
        let pos = |k: &str| order.iter().position(|o| o == k).unwrap();
        assert!(pos("q") < pos("p"), "{direction:?}: {order:?}");
    }
}

#[test]
fn test_tree_sibling_ties_keep_input_order() {
    let rows = || {
        RawRows::Nested(vec![
            RowNode::with_children(
                item("P", "parent", 2),
                vec![
                    RowNode::leaf(item("c1", "child", 7)),
                    RowNode::leaf(item("c2", "child", 3)),
                    RowNode::leaf(item("c3", "child", 7)),
                    RowNode::leaf(item("c4", "child", 3)),
                ],
            ),
            RowNode::leaf(item("Q", "other", 2)),
        ])
    };

    let asc = TableState {
        sort: SortState::by("n", SortDirection::Asc),
        ..TableState::default()
    };
    let view = build_view(rows(), key_of, &columns(), &asc, &TableConfig::default()).unwrap();
    assert_eq!(keys(&view), vec!["P", "c2", "c4", "c1", "c3", "Q"]);

    let desc = TableState {
        sort: SortState::by("n", SortDirection::Desc),
        ..TableState::default()
    };
    let view = build_view(rows(), key_of, &columns(), &desc, &TableConfig::default()).unwrap();
    assert_eq!(keys(&view), vec!["P", "c1", "c3", "c2", "c4", "Q"]);
}

#[derive(Debug)]
struct Reading {
    id: usize,
    value: f64,
}

#[test]
fn test_nan_cells_sort_last_without_breaking_order() {
    let rows: Vec<Reading> = (0..200)
        .map(|id| Reading {
            id,
            value: if id % 7 == 0 { f64::NAN } else { ((id * 37) % 101) as f64 },
        })
        .collect();
    let model = normalize(RawRows::Flat(rows), |r: &Reading| r.id.to_string()).unwrap();
    let columns = ColumnSet::new(vec![Column::new("v", |r: &Reading| r.value.into())]).unwrap();

    for direction in [SortDirection::Asc, SortDirection::Desc] {
        let state = TableState {
            sort: SortState::by("v", direction),
            pagination: PaginationState::new(0, 200),
            ..TableState::default()
        };
        let view = compose_view(&model, &columns, &state, &TableConfig::default());
        let values: Vec<f64> = view.visible_entries().iter().map(|e| e.record().value).collect();

        let present = values.iter().take_while(|v| !v.is_nan()).count();
        assert_eq!(present, 200 - 29);
        assert!(values[present..].iter().all(|v| v.is_nan()));

        let ordered = values[..present].windows(2).all(|w| match direction {
            SortDirection::Asc => w[0] <= w[1],
            SortDirection::Desc => w[0] >= w[1],
        });
        assert!(ordered, "{direction:?}: {values:?}");
    }
}

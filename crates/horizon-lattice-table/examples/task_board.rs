//! Task board example.
//!
//! Drives a tree table through a short session: search, sort, selection,
//! paging, and saving the state as JSON.
//!
//! Run with:
//! RUST_LOG=horizon_lattice_table=debug cargo run -p horizon-lattice-table --example task_board

use horizon_lattice_table::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Task {
    id: &'static str,
    title: &'static str,
    owner: Option<&'static str>,
    estimate: i64,
}

fn task(id: &'static str, title: &'static str, owner: Option<&'static str>, estimate: i64) -> Task {
    Task {
        id,
        title,
        owner,
        estimate,
    }
}

fn print_view(label: &str, view: &ViewSnapshot<Task>) {
    println!(
        "-- {label} (page {}/{}, {} rows)",
        view.page().page_index + 1,
        view.page_count(),
        view.total_filtered_count()
    );
    for entry in view.visible_entries() {
        let status = match view.status_of(entry.key()) {
            SelectionStatus::Checked => "[x]",
            SelectionStatus::Indeterminate => "[-]",
            SelectionStatus::Unchecked => "[ ]",
        };
        let task = entry.record();
        println!(
            "{status} {:indent$}{} ({}h, {})",
            "",
            task.title,
            task.estimate,
            task.owner.unwrap_or("unassigned"),
            indent = entry.depth() * 2
        );
    }
    for warning in view.warnings() {
        println!("warning: {warning}");
    }
    println!();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rows = RawRows::Nested(vec![
        RowNode::with_children(
            task("api", "Public API", Some("dana"), 13),
            vec![
                RowNode::leaf(task("api-auth", "Token auth", Some("dana"), 5)),
                RowNode::leaf(task("api-docs", "Reference docs", None, 3)),
                RowNode::leaf(task("api-rate", "Rate limiting", Some("lee"), 5)),
            ],
        ),
        RowNode::with_children(
            task("web", "Web client", Some("sam"), 8),
            vec![
                RowNode::leaf(task("web-login", "Login page", Some("sam"), 3)),
                RowNode::leaf(task("web-board", "Board view", None, 5)),
            ],
        ),
        RowNode::leaf(task("ops", "Deploy pipeline", Some("lee"), 2)),
    ]);

    let columns = ColumnSet::new(vec![
        Column::new("title", |t: &Task| t.title.into()).title("Title"),
        Column::new("owner", |t: &Task| t.owner.into()).title("Owner"),
        Column::new("estimate", |t: &Task| t.estimate.into())
            .title("Estimate")
            .filterable(false),
    ])
    .expect("column keys are unique");

    let config = TableConfig::from_toml_str(
        r#"
        page_by = "roots"
        default_page_size = 2
        "#,
    )
    .expect("valid config");

    let table = TableController::new(rows, |t: &Task| t.id.to_string(), columns, config)
        .expect("task ids are unique");

    print_view("initial", &table.snapshot());
    print_view("search 'lee'", &table.set_search("lee"));
    table.clear_filters();
    print_view("sorted by estimate", &table.sort_by("estimate", SortDirection::Desc));
    print_view("toggled 'api-docs'", &table.toggle_row("api-docs"));
    print_view("collapsed 'api'", &table.set_expanded("api", false));
    print_view("next page", &table.next_page());
    print_view("unknown sort column", &table.sort_by("priority", SortDirection::Asc));

    let saved = table.state().to_json().expect("state serializes");
    println!("saved state: {saved}");
}

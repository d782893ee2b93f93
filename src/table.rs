//! Tables.
//!
//! A table keeps its rows in insertion order. Filters, the sort column and column visibility
//! only change what is rendered, so every change to them re-renders the whole table.

use crate::component::Kind;
use crate::composite::parse_index;
use crate::events::EventKind;
use crate::id::ComponentId;
use crate::instruction::dispatch_literal;
use crate::markup::Element;
use crate::redraw::{self, Arrangement, Mutation, Strategy};
use crate::tree::ComponentTree;
use core::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

const ROW_PREFIX: &str = "#row ";
const SORT_PREFIX: &str = "#sort ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn name(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// Rows of cell components under a header of named columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub(crate) columns: Vec<String>,
    pub(crate) visible: Vec<bool>,
    /// One slot per column; empty slots render as empty cells.
    pub(crate) rows: Vec<Vec<Option<ComponentId>>>,
    pub(crate) sort: Option<(usize, SortOrder)>,
    /// Lowercased text a cell of the column must contain for its row to be shown.
    pub(crate) filters: BTreeMap<usize, String>,
    /// Index into `rows`.
    pub(crate) selected: Option<usize>,
}

impl Table {
    pub(crate) fn new(columns: Vec<String>) -> Table {
        Table {
            visible: vec![true; columns.len()],
            columns,
            rows: Vec::new(),
            sort: None,
            filters: BTreeMap::new(),
            selected: None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<ComponentId>>] {
        &self.rows
    }

    pub fn is_column_visible(&self, column: usize) -> bool {
        self.visible.get(column).copied().unwrap_or(false)
    }

    pub fn sort(&self) -> Option<(usize, SortOrder)> {
        self.sort
    }

    pub fn filter(&self, column: usize) -> Option<&str> {
        self.filters.get(&column).map(String::as_str)
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Cell components in row-major order, including rows that are filtered out.
    pub fn cells(&self) -> Vec<ComponentId> {
        self.rows.iter().flatten().flatten().copied().collect()
    }

    fn visible_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|column| self.visible[*column])
            .collect()
    }

    fn cell(&self, row: usize, column: usize) -> Option<ComponentId> {
        self.rows.get(row)?.get(column).copied().flatten()
    }
}

/// Text a cell is filtered and sorted by.
fn cell_text(tree: &ComponentTree, cell: Option<ComponentId>) -> String {
    let cell = match cell {
        Some(cell) => cell,
        None => return String::new(),
    };
    if let Some(text) = tree.text(cell) {
        return text.to_string();
    }
    if let Some(number) = tree.number(cell) {
        return number.to_string();
    }
    tree.is_checked(cell)
        .map(|checked| checked.to_string())
        .unwrap_or_default()
}

/// Numbers compare numerically, anything else by text.
fn compare_cells(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Indices of the rows that pass the filters, in display order.
fn shown_rows(tree: &ComponentTree, table: &Table) -> Vec<usize> {
    let mut shown: Vec<usize> = (0..table.rows.len())
        .filter(|row| {
            table.filters.iter().all(|(column, needle)| {
                cell_text(tree, table.cell(*row, *column))
                    .to_lowercase()
                    .contains(needle.as_str())
            })
        })
        .collect();

    if let Some((column, order)) = table.sort {
        let keys: Vec<String> = (0..table.rows.len())
            .map(|row| cell_text(tree, table.cell(row, column)))
            .collect();
        shown.sort_by(|a, b| {
            let ordering = compare_cells(&keys[*a], &keys[*b]);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }
    shown
}

/// Tells the user that rows are filtered out or columns are hidden.
fn status(table: &Table, shown: usize, visible: usize) -> Option<String> {
    let mut parts = Vec::new();
    let total = table.rows.len();
    if shown != total {
        let noun = if total == 1 { "row" } else { "rows" };
        parts.push(format!("Showing {} out of {} {}", shown, total, noun));
    }
    match table.columns.len() - visible {
        0 => {}
        1 => parts.push("a column is hidden".to_string()),
        hidden => parts.push(format!("{} columns are hidden", hidden)),
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

pub(crate) fn render(tree: &ComponentTree, id: ComponentId, table: &Table) -> Element {
    let columns = table.visible_columns();
    let shown = shown_rows(tree, table);

    let header = columns.iter().map(|column| {
        let sort = dispatch_literal(id, &format!("{}{}", SORT_PREFIX, column));
        let mut cell = Element::new("th")
            .class("perch-sortable")
            .attr("onclick", sort)
            .text(table.columns[*column].as_str());
        if let Some((sorted, order)) = table.sort {
            if sorted == *column {
                cell = cell.class(format!("perch-sort-{}", order.name()));
            }
        }
        cell
    });

    let rows = shown.iter().enumerate().map(|(position, row)| {
        let select = dispatch_literal(id, &format!("{}{}", ROW_PREFIX, position));
        let cells = columns.iter().map(|column| {
            Element::new("td").children(
                table
                    .cell(*row, *column)
                    .and_then(|cell| tree.render_element(cell)),
            )
        });
        let mut element = Element::new("tr").attr("onclick", select).children(cells);
        if table.selected == Some(*row) {
            element = element.class("perch-selected");
        }
        element
    });

    let mut element = Element::new("table").class("perch-table");
    if let Some(status) = status(table, shown.len(), columns.len()) {
        element = element.child(
            Element::new("caption")
                .class("perch-table-status")
                .text(status),
        );
    }
    element
        .child(Element::new("thead").child(Element::new("tr").children(header)))
        .child(Element::new("tbody").children(rows))
}

impl ComponentTree {
    /// Creates a table with the given column names.
    pub fn table<I, S>(&mut self, columns: I) -> ComponentId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.insert(Kind::Table(Table::new(columns)))
    }

    fn table_ref(&self, id: ComponentId) -> Option<&Table> {
        match self.kind(id)? {
            Kind::Table(table) => Some(table),
            _ => None,
        }
    }

    fn table_mut(&mut self, id: ComponentId) -> Option<&mut Table> {
        match self.kind_mut(id)? {
            Kind::Table(table) => Some(table),
            _ => None,
        }
    }

    pub(crate) fn redraw_table(&self, table: ComponentId, mutation: Mutation) {
        if redraw::strategy(Arrangement::Table, mutation) == Strategy::Replace {
            self.redraw(table);
        }
    }

    /// Rows of a table in insertion order. Empty for anything else.
    pub fn table_rows(&self, table: ComponentId) -> &[Vec<Option<ComponentId>>] {
        match self.table_ref(table) {
            Some(t) => &t.rows,
            None => &[],
        }
    }

    /// Rows that pass the filters, in display order.
    pub fn shown_rows(&self, table: ComponentId) -> Vec<usize> {
        self.table_ref(table)
            .map(|t| shown_rows(self, t))
            .unwrap_or_default()
    }

    pub fn add_row(&mut self, table: ComponentId, cells: &[ComponentId]) {
        let len = self.table_rows(table).len();
        self.insert_row(table, len, cells);
    }

    /// Inserts a row at `index`, clamped to the number of rows.
    ///
    /// The row gets one slot per column. Missing cells leave their slot empty; extra cells and
    /// cells that cannot be adopted are skipped.
    pub fn insert_row(&mut self, table: ComponentId, index: usize, cells: &[ComponentId]) {
        let width = match self.table_ref(table) {
            Some(t) => t.columns.len(),
            None => {
                debug!(%table, "cannot add a row to a non-table");
                return;
            }
        };

        let mut row = Vec::with_capacity(width);
        for &cell in cells.iter().take(width) {
            let adopted = self.can_adopt(table, cell);
            if adopted {
                self.set_owner(cell, Some(table));
            }
            row.push(Some(cell).filter(|_| adopted));
        }
        row.resize(width, None);

        match self.table_mut(table) {
            Some(t) => {
                let index = index.min(t.rows.len());
                t.rows.insert(index, row.clone());
                if let Some(selected) = &mut t.selected {
                    if *selected >= index {
                        *selected += 1;
                    }
                }
            }
            None => return,
        }

        if let Some(attachment) = self.attachment(table) {
            for cell in row.into_iter().flatten() {
                self.init(cell, attachment.master, &attachment.session);
            }
        }
        self.redraw_table(table, Mutation::Insert);
    }

    /// Removes the row at `index`. Its cells are detached but stay alive.
    pub fn remove_row(&mut self, table: ComponentId, index: usize) {
        let (row, deselected) = match self.table_mut(table) {
            Some(t) if index < t.rows.len() => {
                let row = t.rows.remove(index);
                let deselected = t.selected == Some(index);
                t.selected = match t.selected {
                    Some(selected) if selected == index => None,
                    Some(selected) if selected > index => Some(selected - 1),
                    other => other,
                };
                (row, deselected)
            }
            _ => return,
        };

        for cell in row.into_iter().flatten() {
            self.set_owner(cell, None);
            self.detach(cell);
        }
        self.redraw_table(table, Mutation::Remove);
        if deselected {
            self.fire(table, EventKind::Selection, "");
        }
    }

    pub fn set_column_visible(&mut self, table: ComponentId, column: usize, visible: bool) {
        match self.table_mut(table).and_then(|t| t.visible.get_mut(column)) {
            Some(shown) if *shown != visible => *shown = visible,
            _ => return,
        }
        self.redraw_table(table, Mutation::ChildVisibility);
    }

    /// Visible column indices, in order.
    pub fn visible_columns(&self, table: ComponentId) -> Vec<usize> {
        self.table_ref(table)
            .map(Table::visible_columns)
            .unwrap_or_default()
    }

    /// Sorts by a column, or stops sorting. Fires [`EventKind::Order`] with
    /// `"<column> <ascending|descending>"`, or an empty value when sorting stops.
    pub fn set_sort(&mut self, table: ComponentId, sort: Option<(usize, SortOrder)>) {
        match self.table_mut(table) {
            Some(t) if t.sort != sort && sort.map_or(true, |(c, _)| c < t.columns.len()) => {
                t.sort = sort;
            }
            _ => return,
        }
        self.redraw_table(table, Mutation::Reorder);
        let value = sort
            .map(|(column, order)| format!("{} {}", column, order.name()))
            .unwrap_or_default();
        self.fire(table, EventKind::Order, &value);
    }

    /// Sorts ascending by a column, or descending if it already is sorted ascending by it.
    pub fn sort_by_column(&mut self, table: ComponentId, column: usize) {
        let order = match self.table_ref(table).and_then(|t| t.sort) {
            Some((sorted, SortOrder::Ascending)) if sorted == column => SortOrder::Descending,
            _ => SortOrder::Ascending,
        };
        self.set_sort(table, Some((column, order)));
    }

    pub fn sort_order(&self, table: ComponentId) -> Option<(usize, SortOrder)> {
        self.table_ref(table)?.sort
    }

    /// Only shows rows whose cell in `column` contains `text`, ignoring case. An empty text
    /// removes the filter. A selected row that is filtered out is deselected.
    pub fn set_filter(&mut self, table: ComponentId, column: usize, text: &str) {
        let text = text.to_lowercase();
        match self.table_mut(table) {
            Some(t) if column < t.columns.len() => {
                let changed = if text.is_empty() {
                    t.filters.remove(&column).is_some()
                } else {
                    t.filters.insert(column, text.clone()) != Some(text)
                };
                if !changed {
                    return;
                }
            }
            _ => return,
        }

        let hidden = match self.table_ref(table) {
            Some(t) => t
                .selected
                .map_or(false, |selected| !shown_rows(self, t).contains(&selected)),
            None => return,
        };
        if hidden {
            if let Some(t) = self.table_mut(table) {
                t.selected = None;
            }
        }
        self.redraw_table(table, Mutation::ChildVisibility);
        if hidden {
            self.fire(table, EventKind::Selection, "");
        }
    }

    /// Selects a row by its index in [`ComponentTree::table_rows`] and fires
    /// [`EventKind::Selection`] with the index, or an empty value when deselecting.
    pub fn set_selected_row(&mut self, table: ComponentId, row: Option<usize>) {
        match self.table_mut(table) {
            Some(t) if t.selected != row && row.map_or(true, |r| r < t.rows.len()) => {
                t.selected = row;
            }
            _ => return,
        }
        self.redraw_table(table, Mutation::Selection);
        let value = row.map(|r| r.to_string()).unwrap_or_default();
        self.fire(table, EventKind::Selection, &value);
    }

    pub fn selected_row(&self, table: ComponentId) -> Option<usize> {
        self.table_ref(table)?.selected
    }

    /// Empties the slot of a cell that is being disposed.
    pub(crate) fn release_cell(&mut self, table: ComponentId, cell: ComponentId) {
        if let Some(t) = self.table_mut(table) {
            for slot in t.rows.iter_mut().flatten() {
                if *slot == Some(cell) {
                    *slot = None;
                }
            }
        }
        self.redraw_table(table, Mutation::Remove);
    }

    /// Client payloads: `#row <position>` with a position among the shown rows, and
    /// `#sort <column>`.
    pub(crate) fn receive_table(&mut self, table: ComponentId, payload: &str) {
        let (shown, columns) = match self.table_ref(table) {
            Some(t) => (shown_rows(self, t), t.columns.len()),
            None => return,
        };
        if let Some(position) = parse_index(payload, ROW_PREFIX, shown.len()) {
            self.set_selected_row(table, Some(shown[position]));
        } else if let Some(column) = parse_index(payload, SORT_PREFIX, columns) {
            self.sort_by_column(table, column);
        } else {
            debug!(%table, payload, "ignoring table payload");
        }
    }
}

#[cfg(test)]
fn people(tree: &mut ComponentTree) -> (ComponentId, Vec<ComponentId>) {
    let table = tree.table(vec!["Name", "Age"]);
    let mut names = Vec::new();
    for (name, age) in &[("Carol", 41.0), ("alice", 9.0), ("Bob", 30.0)] {
        let label = tree.label(*name);
        let number = tree.number_field(*age, 0.0, 120.0, 1.0);
        tree.add_row(table, &[label, number]);
        names.push(label);
    }
    (table, names)
}

#[test]
fn sorting_is_numeric_where_it_can_be() {
    let mut tree = ComponentTree::new();
    let (table, _) = people(&mut tree);
    assert_eq!(tree.shown_rows(table), vec![0, 1, 2]);

    tree.sort_by_column(table, 1);
    assert_eq!(tree.sort_order(table), Some((1, SortOrder::Ascending)));
    assert_eq!(tree.shown_rows(table), vec![1, 2, 0]);
    tree.sort_by_column(table, 1);
    assert_eq!(tree.shown_rows(table), vec![0, 2, 1]);

    tree.sort_by_column(table, 0);
    assert_eq!(tree.sort_order(table), Some((0, SortOrder::Ascending)));
    assert_eq!(tree.shown_rows(table), vec![2, 0, 1]);
    assert!(tree.render(table).contains("perch-sort-ascending"));

    tree.set_sort(table, None);
    assert_eq!(tree.shown_rows(table), vec![0, 1, 2]);
    tree.sort_by_column(table, 7);
    assert_eq!(tree.sort_order(table), None);
}

#[test]
fn filters_and_hidden_columns_are_reported() {
    let mut tree = ComponentTree::new();
    let (table, _) = people(&mut tree);

    tree.set_filter(table, 0, "O");
    assert_eq!(tree.shown_rows(table), vec![0, 2]);
    tree.set_column_visible(table, 1, false);
    assert_eq!(tree.visible_columns(table), vec![0]);

    let markup = tree.render(table);
    assert!(markup.contains("Showing 2 out of 3 rows; a column is hidden"));
    assert!(markup.contains("<th class=\"perch-sortable\""));
    assert!(!markup.contains(">Age<"));
    assert!(!markup.contains("alice"));
    assert_eq!(markup.matches("<td>").count(), 2);

    tree.set_filter(table, 0, "");
    tree.set_column_visible(table, 1, true);
    assert!(!tree.render(table).contains("perch-table-status"));
}

#[test]
fn selection_follows_its_row() {
    let mut tree = ComponentTree::new();
    let (table, names) = people(&mut tree);
    let selections = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log = std::sync::Arc::clone(&selections);
    tree.on(table, EventKind::Selection, move |_, value| {
        log.lock().push(value.to_string())
    });

    tree.set_selected_row(table, Some(2));
    tree.set_selected_row(table, Some(2));
    tree.set_selected_row(table, Some(9));
    tree.remove_row(table, 0);
    assert_eq!(tree.selected_row(table), Some(1));
    assert_eq!(tree.owner(names[0]), None);
    assert!(tree.contains(names[0]));

    let late = tree.label("Dave");
    tree.insert_row(table, 0, &[late]);
    assert_eq!(tree.selected_row(table), Some(2));
    assert_eq!(tree.table_rows(table)[0], vec![Some(late), None]);

    tree.set_filter(table, 0, "dave");
    assert_eq!(tree.selected_row(table), None);
    assert_eq!(*selections.lock(), vec!["2".to_string(), String::new()]);
}

#[test]
fn disposing_a_cell_empties_its_slot() {
    let mut tree = ComponentTree::new();
    let (table, names) = people(&mut tree);
    let stray = tree.label("stray");
    tree.add_row(table, &[names[0], stray, names[1]]);
    assert_eq!(tree.table_rows(table)[3], vec![None, Some(stray)]);
    assert_eq!(tree.owner(names[1]), Some(table));

    tree.dispose(names[1]);
    assert_eq!(tree.table_rows(table)[1][0], None);
    assert!(!tree.get(table).unwrap().kind().internal_slots().contains(&names[1]));

    tree.dispose(table);
    assert!(!tree.contains(stray));
    assert!(!tree.contains(names[0]));
}

//! Redraw policy.
//!
//! Decides, per mutation, whether the client is patched in place or the affected container or
//! table is re-rendered and replaced as a whole.

use crate::container::Layout;

/// How a mutation reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A targeted instruction addressing existing nodes or child positions.
    Patch,
    /// Re-render the container and replace its root node.
    Replace,
}

/// What a mutation happens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    /// A container with the given layout.
    Container(Layout),
    /// A table. Its rows are filtered, sorted and cut down to the visible columns on render.
    Table,
}

impl From<Layout> for Arrangement {
    fn from(layout: Layout) -> Self {
        Arrangement::Container(layout)
    }
}

/// Kinds of mutations a container or table can undergo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Children inserted at a position.
    Insert,
    /// Children removed by position.
    Remove,
    /// Children reordered or replaced wholesale.
    Reorder,
    /// A child was shown or hidden.
    ChildVisibility,
    /// The selected child changed.
    Selection,
    /// A property of the container itself changed.
    Property,
}

/// Picks a strategy for a mutation of a container or table.
///
/// Only position-stable layouts, where every child occupies exactly one slot in order, are
/// patched structurally. Tables replace on everything but their own properties.
pub fn strategy(arrangement: impl Into<Arrangement>, mutation: Mutation) -> Strategy {
    let layout = match arrangement.into() {
        Arrangement::Container(layout) => layout,
        Arrangement::Table if mutation == Mutation::Property => return Strategy::Patch,
        Arrangement::Table => return Strategy::Replace,
    };
    match mutation {
        Mutation::Property => Strategy::Patch,
        Mutation::Insert | Mutation::Remove if layout.is_position_stable() => Strategy::Patch,
        Mutation::ChildVisibility if !layout.filters_hidden() => Strategy::Patch,
        Mutation::Insert
        | Mutation::Remove
        | Mutation::ChildVisibility
        | Mutation::Reorder
        | Mutation::Selection => Strategy::Replace,
    }
}

#[test]
fn linear_layouts_patch_structure() {
    for layout in &[Layout::Column, Layout::Row] {
        assert_eq!(strategy(*layout, Mutation::Insert), Strategy::Patch);
        assert_eq!(strategy(*layout, Mutation::Remove), Strategy::Patch);
        assert_eq!(strategy(*layout, Mutation::ChildVisibility), Strategy::Patch);
        assert_eq!(strategy(*layout, Mutation::Reorder), Strategy::Replace);
    }
}

#[test]
fn derived_layouts_replace() {
    let grid = Layout::Grid { columns: 3 };
    assert_eq!(strategy(grid, Mutation::Insert), Strategy::Replace);
    assert_eq!(strategy(grid, Mutation::Remove), Strategy::Replace);
    assert_eq!(strategy(grid, Mutation::ChildVisibility), Strategy::Replace);

    let cards = Layout::Cards { selected: Some(0) };
    assert_eq!(strategy(cards, Mutation::Insert), Strategy::Replace);
    assert_eq!(strategy(cards, Mutation::Selection), Strategy::Replace);
    assert_eq!(strategy(cards, Mutation::ChildVisibility), Strategy::Patch);
}

#[test]
fn tables_replace_on_structure() {
    for mutation in &[
        Mutation::Insert,
        Mutation::Remove,
        Mutation::Reorder,
        Mutation::ChildVisibility,
        Mutation::Selection,
    ] {
        assert_eq!(strategy(Arrangement::Table, *mutation), Strategy::Replace);
    }
    assert_eq!(strategy(Arrangement::Table, Mutation::Property), Strategy::Patch);
}

#[test]
fn property_changes_always_patch() {
    for layout in &[
        Layout::Column,
        Layout::Row,
        Layout::Grid { columns: 2 },
        Layout::Cards { selected: None },
    ] {
        assert_eq!(strategy(*layout, Mutation::Property), Strategy::Patch);
    }
}

use perch::{ComponentId, ComponentTree, QueueChannel, Session, Settings};
use std::sync::Arc;

fn mounted(tree: &mut ComponentTree, root: ComponentId) -> QueueChannel {
    let channel = QueueChannel::new();
    let session = Session::new(Arc::new(channel.clone()), Settings::default());
    assert!(tree.mount(root, session));
    channel
}

#[test]
fn append_patches_only_the_new_child() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let sibling = tree.label("existing sibling");
    tree.push(root, &[sibling]);
    let channel = mounted(&mut tree, root);

    let added = tree.label("new child");
    tree.push(root, &[added]);
    assert!(tree.is_attached(added));

    let sent = channel.drain();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with(&format!("perch.insert(\"{}\", 1, ", root)));
    assert!(sent[0].contains("new child"));
    assert!(!sent[0].contains("existing sibling"));
    assert!(!sent.iter().any(|s| s.starts_with("perch.replace(")));
}

#[test]
fn remove_patches_slot_positions() {
    let mut tree = ComponentTree::new();
    let root = tree.row();
    let labels: Vec<_> = (0..4).map(|i| tree.label(format!("item {}", i))).collect();
    tree.push(root, &labels);
    let channel = mounted(&mut tree, root);

    tree.remove(root, &[labels[1], labels[3]]);
    assert_eq!(
        channel.drain(),
        vec![format!("perch.removeSlots(\"{}\", [3, 1]);", root)]
    );
    assert!(!tree.is_attached(labels[1]));

    // not a child anymore
    tree.remove(root, &[labels[1]]);
    assert!(channel.drain().is_empty());
}

#[test]
fn derived_layouts_are_replaced() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let grid = tree.grid(2);
    let cell = tree.label("cell");
    tree.push(grid, &[cell]);
    tree.push(root, &[grid]);
    let channel = mounted(&mut tree, root);

    let more = tree.label("more");
    tree.push(grid, &[more]);
    let sent = channel.drain();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with(&format!("perch.replace(\"{}\", ", grid)));

    tree.set_visible(cell, false);
    let sent = channel.drain();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with(&format!("perch.replace(\"{}\", ", grid)));
    assert!(!sent[0].contains(">cell\\u003c"));
}

#[test]
fn leaf_changes_patch_one_node() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let label = tree.label("before");
    let field = tree.text_field("");
    let check = tree.check_box("ok", false);
    tree.push(root, &[label, field, check]);
    let channel = mounted(&mut tree, root);

    tree.set_text(label, "after");
    tree.set_text(label, "after");
    tree.set_text(field, "typed");
    tree.set_checked(check, true);
    tree.set_visible(label, false);

    assert_eq!(
        channel.drain(),
        vec![
            format!("perch.text(\"{}\", \"after\");", label),
            format!("perch.value(\"{}\", \"typed\");", field),
            format!("perch.checked(\"{}\", true);", check),
            format!("perch.style(\"{}\", \"visibility\", \"hidden\");", label),
        ]
    );
}

#[test]
fn reordering_redraws() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let (a, b) = (tree.label("a"), tree.label("b"));
    tree.push(root, &[a, b]);
    let channel = mounted(&mut tree, root);

    tree.set_children(root, &[b, a]);
    let sent = channel.drain();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with(&format!("perch.replace(\"{}\", ", root)));
    assert!(tree.is_attached(a) && tree.is_attached(b));
}

#[test]
fn render_is_idempotent_and_pure() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let tabs = tree.tabs(true);
    let view = tree.tree_view();
    let grid = tree.grid(3);
    tree.push(root, &[tabs, view, grid]);
    let content = tree.number_field(1.5, 0.0, 2.0, 0.5);
    tree.add_tab(tabs, "Numbers", content).unwrap();
    let node = tree.check_box("node", true);
    tree.add_tree_node(view, None, node, true);
    let cells: Vec<_> = (0..5).map(|i| tree.label(format!("<{}>", i))).collect();
    tree.push(grid, &cells);
    tree.set_border_title(root, "Title & more");
    let channel = mounted(&mut tree, root);

    let first = tree.render(root);
    let second = tree.render(root);
    assert_eq!(first, second);
    assert!(first.contains("&lt;4&gt;"));
    assert!(first.contains("Title &amp; more"));
    assert!(channel.drain().is_empty());
}

#[test]
fn detached_mutations_send_nothing() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let channel = mounted(&mut tree, root);

    let loose = tree.column();
    let label = tree.label("x");
    tree.push(loose, &[label]);
    tree.set_text(label, "y");
    tree.remove(loose, &[label]);
    tree.set_border_title(loose, "title");
    assert!(channel.drain().is_empty());
    assert!(tree.render(loose).contains("title"));

    // attaching renders the current state
    tree.push(root, &[loose]);
    let sent = channel.drain();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("title"));
}

#[test]
fn table_changes_replace_the_table() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let table = tree.table(vec!["Key", "Value"]);
    tree.push(root, &[table]);
    let (key, value) = (tree.label("colour"), tree.label("blue"));
    tree.add_row(table, &[key, value]);
    let channel = mounted(&mut tree, root);

    let (other_key, other_value) = (tree.label("size"), tree.label("large"));
    tree.add_row(table, &[other_key, other_value]);
    tree.sort_by_column(table, 0);
    tree.set_filter(table, 1, "lar");
    tree.set_column_visible(table, 0, false);
    tree.set_selected_row(table, Some(1));
    tree.remove_row(table, 0);
    tree.set_visible(other_value, false);

    let sent = channel.drain();
    assert_eq!(sent.len(), 7);
    let replace = format!("perch.replace(\"{}\", ", table);
    assert!(sent.iter().all(|s| s.starts_with(&replace)));
    assert!(!tree.is_attached(key));

    // properties of cells still patch one node
    tree.set_text(other_value, "huge");
    assert_eq!(
        channel.drain(),
        vec![format!("perch.text(\"{}\", \"huge\");", other_value)]
    );
}

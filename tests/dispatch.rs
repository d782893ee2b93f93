use parking_lot::Mutex;
use perch::{ComponentId, ComponentTree, Dispatch, EventKind, QueueChannel, Session, Settings};
use std::sync::Arc;

fn mounted(tree: &mut ComponentTree, root: ComponentId) -> QueueChannel {
    let channel = QueueChannel::new();
    let session = Session::new(Arc::new(channel.clone()), Settings::default());
    assert!(tree.mount(root, session));
    channel
}

fn record(tree: &mut ComponentTree, id: ComponentId, kind: EventKind) -> Arc<Mutex<Vec<String>>> {
    let values = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&values);
    tree.on(id, kind, move |_, value| log.lock().push(value.to_string()));
    values
}

#[test]
fn removed_component_is_not_found() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let a = tree.label("first");
    let b = tree.label("second");
    tree.push(root, &[a, b]);
    mounted(&mut tree, root);

    let markup = tree.render(root);
    let (pos_a, pos_b) = (markup.find("first").unwrap(), markup.find("second").unwrap());
    assert!(pos_a < pos_b);

    tree.remove(root, &[a]);
    let markup = tree.render(root);
    assert!(!markup.contains("first"));
    assert!(markup.contains("second"));

    let changes = record(&mut tree, b, EventKind::ValueChanged);
    assert_eq!(tree.dispatch(&a.to_string(), "changed"), Dispatch::NotFound);
    assert_eq!(tree.text(b), Some("second"));
    assert!(changes.lock().is_empty());
}

#[test]
fn nested_tab_button_receives_only_its_own_click() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let tabs = tree.tabs(false);
    tree.push(root, &[tabs]);

    let first = tree.button("one");
    let second = tree.button("two");
    tree.add_tab(tabs, "Tab 1", first).unwrap();
    tree.add_tab(tabs, "Tab 2", second).unwrap();
    mounted(&mut tree, root);

    let first_clicks = record(&mut tree, first, EventKind::Click);
    let second_clicks = record(&mut tree, second, EventKind::Click);

    assert_eq!(
        tree.dispatch(&second.to_string(), "#click"),
        Dispatch::Delivered(second)
    );
    assert_eq!(*second_clicks.lock(), vec!["click".to_string()]);
    assert!(first_clicks.lock().is_empty());
}

#[test]
fn unknown_id_changes_nothing() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let field = tree.text_field("kept");
    tree.push(root, &[field]);
    let channel = mounted(&mut tree, root);

    let unknown = format!("w{}", "0".repeat(32));
    assert_eq!(tree.dispatch(&unknown, "x"), Dispatch::NotFound);
    assert_eq!(tree.dispatch("", "x"), Dispatch::NotFound);
    assert_eq!(tree.dispatch("HEARTBEAT", "x"), Dispatch::NotFound);
    assert_eq!(tree.text(field), Some("kept"));
    assert!(channel.drain().is_empty());
}

#[test]
fn disabled_component_keeps_its_state() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let check = tree.check_box("agree", false);
    tree.push(root, &[check]);
    mounted(&mut tree, root);

    tree.set_enabled(check, false);
    let changes = record(&mut tree, check, EventKind::ValueChanged);
    assert_eq!(
        tree.dispatch(&check.to_string(), "true"),
        Dispatch::Ignored(check)
    );
    assert_eq!(tree.is_checked(check), Some(false));
    assert!(changes.lock().is_empty());
}

#[test]
fn malformed_number_keeps_last_valid_value() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let field = tree.number_field(5.0, 0.0, 10.0, 1.0);
    tree.push(root, &[field]);
    let channel = mounted(&mut tree, root);
    let changes = record(&mut tree, field, EventKind::ValueChanged);

    tree.dispatch(&field.to_string(), "seven");
    assert_eq!(tree.number(field), Some(5.0));
    assert!(changes.lock().is_empty());

    tree.dispatch(&field.to_string(), "7");
    assert_eq!(tree.number(field), Some(7.0));
    assert!(channel.drain().is_empty(), "client values are not echoed back");

    // out of range values are clamped and the client is corrected
    tree.dispatch(&field.to_string(), "70");
    assert_eq!(tree.number(field), Some(10.0));
    assert_eq!(
        channel.drain(),
        vec![format!("perch.value(\"{}\", \"10\");", field)]
    );
    assert_eq!(*changes.lock(), vec!["7".to_string(), "10".to_string()]);
}

#[test]
fn dialog_close_affordance_closes_it() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let channel = mounted(&mut tree, root);
    let dialog = tree.create_dialog(root, "Settings").unwrap();
    tree.open_dialog(dialog);
    channel.drain();

    let closes = record(&mut tree, dialog, EventKind::Close);
    assert!(tree.dispatch(&dialog.to_string(), "#close").is_delivered());
    assert!(!tree.is_dialog_open(dialog));
    assert_eq!(*closes.lock(), vec!["closed".to_string()]);
    assert_eq!(
        channel.drain(),
        vec![format!("perch.closeDialog(\"{}\");", dialog)]
    );
}

#[test]
fn dispatch_after_disposal_is_a_no_op() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let inner = tree.row();
    let button = tree.button("go");
    tree.push(inner, &[button]);
    tree.push(root, &[inner]);
    mounted(&mut tree, root);
    let clicks = record(&mut tree, button, EventKind::Click);

    tree.dispose(inner);
    assert!(tree.children(root).is_empty());
    assert_eq!(tree.listener_count(button), 0);
    assert_eq!(tree.dispatch(&button.to_string(), "#click"), Dispatch::NotFound);

    tree.dispose(root);
    tree.dispose(root);
    assert!(tree.is_empty());
    assert_eq!(tree.dispatch(&button.to_string(), "#click"), Dispatch::NotFound);
    assert!(clicks.lock().is_empty());
}

#[test]
fn listeners_can_rebuild_the_tree() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let add = tree.button("add");
    tree.push(root, &[add]);
    mounted(&mut tree, root);

    tree.on(add, EventKind::Click, move |tree, _| {
        let label = tree.label("added");
        tree.push(root, &[label]);
    });
    tree.dispatch(&add.to_string(), "#click");
    tree.dispatch(&add.to_string(), "#click");

    let children = tree.children(root).to_vec();
    assert_eq!(children.len(), 3);
    assert!(children.iter().all(|c| tree.is_attached(*c)));
}

#[test]
fn composite_payloads() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let tabs = tree.tabs(true);
    let drop = tree.drop_button("Export", vec!["PDF", "PNG"]);
    let view = tree.tree_view();
    tree.push(root, &[tabs, drop, view]);
    let (one, two) = (tree.label("one"), tree.label("two"));
    tree.add_tab(tabs, "One", one).unwrap();
    tree.add_tab(tabs, "Two", two).unwrap();
    let (a, b) = (tree.label("a"), tree.label("b"));
    tree.add_tree_node(view, None, a, true);
    tree.add_tree_node(view, None, b, true);
    mounted(&mut tree, root);

    let index = record(&mut tree, tabs, EventKind::Index);
    let added = record(&mut tree, tabs, EventKind::Add);
    let removed = record(&mut tree, tabs, EventKind::Remove);
    tree.dispatch(&tabs.to_string(), "#select 1");
    tree.dispatch(&tabs.to_string(), "#select 9");
    tree.dispatch(&tabs.to_string(), "#add");
    tree.dispatch(&tabs.to_string(), "#close 0");
    assert_eq!(*index.lock(), vec!["1".to_string(), "0".to_string()]);
    assert_eq!(added.lock().len(), 1);
    assert_eq!(*removed.lock(), vec!["0".to_string()]);
    assert!(!tree.contains(one));

    let selection = record(&mut tree, drop, EventKind::Selection);
    let hover = record(&mut tree, drop, EventKind::Hover);
    let menu = tree
        .get(drop)
        .and_then(|c| match c.kind() {
            perch::Kind::DropButton(button) => Some(button.menu()),
            _ => None,
        })
        .unwrap();
    tree.dispatch(&drop.to_string(), "#hover");
    tree.dispatch(&menu.to_string(), "#item 1");
    assert_eq!(hover.lock().len(), 1);
    assert_eq!(*selection.lock(), vec!["PNG".to_string()]);

    let order = record(&mut tree, view, EventKind::Order);
    let selected = record(&mut tree, view, EventKind::Selection);
    tree.dispatch(&view.to_string(), &format!("#moved {} 0", b));
    tree.dispatch(&view.to_string(), &format!("#selected {}", a));
    tree.dispatch(&view.to_string(), "#deselected");
    assert_eq!(*order.lock(), vec![format!("{} 0", b)]);
    assert_eq!(*selected.lock(), vec![a.to_string(), String::new()]);
    assert_eq!(tree.selected_node(view), None);
}

#[test]
fn table_rows_and_cells_receive_events() {
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let table = tree.table(vec!["Task", "Done"]);
    tree.push(root, &[table]);
    let mut checks = Vec::new();
    for task in &["write", "review", "merge"] {
        let name = tree.label(*task);
        let done = tree.check_box("", false);
        tree.add_row(table, &[name, done]);
        checks.push(done);
    }
    let channel = mounted(&mut tree, root);
    assert!(tree.is_attached(checks[2]));

    // cells are reached through the table
    assert_eq!(
        tree.dispatch(&checks[1].to_string(), "true"),
        Dispatch::Delivered(checks[1])
    );
    assert_eq!(tree.is_checked(checks[1]), Some(true));

    let order = record(&mut tree, table, EventKind::Order);
    let selection = record(&mut tree, table, EventKind::Selection);
    tree.dispatch(&table.to_string(), "#sort 0");
    assert_eq!(tree.shown_rows(table), vec![2, 1, 0]);
    // positions name shown rows, selection names the stored row
    tree.dispatch(&table.to_string(), "#row 0");
    tree.dispatch(&table.to_string(), "#row 3");
    tree.dispatch(&table.to_string(), "#sort x");
    assert_eq!(tree.selected_row(table), Some(2));
    assert_eq!(*order.lock(), vec!["0 ascending".to_string()]);
    assert_eq!(*selection.lock(), vec!["2".to_string()]);

    let sent = channel.drain();
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .all(|s| s.starts_with(&format!("perch.replace(\"{}\", ", table))));
    assert!(sent[1].contains("perch-selected"));

    tree.set_enabled(table, false);
    assert_eq!(
        tree.dispatch(&checks[0].to_string(), "true"),
        Dispatch::Ignored(checks[0])
    );
}

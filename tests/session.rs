use perch::{ComponentTree, Host, QueueChannel, Session, Settings};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn host(channel: &QueueChannel) -> Host {
    let session = Session::new(Arc::new(channel.clone()), Settings::default());
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let label = tree.label("alive");
    tree.push(root, &[label]);
    let host = Host::new(tree, root, session).unwrap();
    assert_eq!(channel.drain(), vec![r#"perch.title("perch");"#.to_string()]);
    host
}

#[test]
fn missing_heartbeat_disposes_the_tree() {
    let channel = QueueChannel::new();
    let mut host = host(&channel);
    host.start_heartbeat(Duration::from_millis(10));

    let ping = channel.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        ping,
        format!("perch.ping(\"{}\");", host.session().heartbeat_target())
    );

    assert!(wait_until(|| !host.session().is_valid()));
    assert!(host.poll() >= 1);
    assert!(host.tree().is_empty());
    assert_eq!(host.render(), "");
}

#[test]
fn acknowledged_heartbeat_keeps_the_session() {
    let channel = QueueChannel::new();
    let mut host = host(&channel);
    let sender = host.events();
    let target = host.session().heartbeat_target();

    // an adapter thread answering every ping
    let receiver = channel.receiver();
    let adapter = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            if receiver.recv_timeout(Duration::from_millis(50)).is_ok() {
                sender.dispatch(target.clone(), "");
            }
        }
    });

    host.start_heartbeat(Duration::from_millis(40));
    let deadline = Instant::now() + Duration::from_millis(300);
    while Instant::now() < deadline {
        host.poll();
        thread::sleep(Duration::from_millis(5));
    }
    adapter.join().unwrap();

    assert!(host.session().is_valid());
    assert!(host.render().contains("alive"));
    host.shutdown();
    assert!(!host.session().is_valid());
    assert!(host.tree().is_empty());
}

#[test]
fn heartbeat_starts_from_settings() {
    let settings = Settings::from_json(r#"{ "heartbeat_seconds": 1 }"#).unwrap();
    let channel = QueueChannel::new();
    let session = Session::new(Arc::new(channel.clone()), settings);
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let host = Host::new(tree, root, session).unwrap();

    let title = channel.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(title, r#"perch.title("perch");"#);
    let ping = channel.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        ping,
        format!("perch.ping(\"{}\");", host.session().heartbeat_target())
    );
}

#[test]
fn host_renders_the_mounted_tree() {
    let channel = QueueChannel::new();
    let mut host = host(&channel);
    let root = host.tree().root().unwrap();
    let markup = host.render();
    assert!(markup.starts_with("<div class=\"perch-page\" data-theme=\"base\""));
    assert!(markup.contains("font-family: sans-serif; font-size: 14px"));
    assert!(markup.contains(&format!(
        "<div class=\"perch-container perch-column\" id=\"{}\">",
        root
    )));

    let added = host.tree_mut().label("later");
    host.tree_mut().push(root, &[added]);
    assert_eq!(channel.drain().len(), 1);
    assert!(host.render().contains("later"));
}

use crate::error::{Error, Result};
use crate::id::ComponentId;
use crate::instruction::Instruction;
use crate::markup::Element;
use crate::router::Dispatch;
use crate::session::Session;
use crate::timer::Timer;
use crate::tree::ComponentTree;
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Class of the page element wrapping the root.
const PAGE_CLASS: &str = "perch-page";

/// An event reported by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub target: String,
    pub payload: String,
}

#[derive(Debug)]
enum Inbound {
    Event(Envelope),
    Invalidate,
}

/// Posts inbound events into a host’s queue. Can be cloned and sent to adapter threads.
#[derive(Debug, Clone)]
pub struct EventSender(Sender<Inbound>);

impl EventSender {
    /// Queues an event. Returns false if the host is gone.
    pub fn dispatch(&self, target: impl Into<String>, payload: impl Into<String>) -> bool {
        let envelope = Envelope {
            target: target.into(),
            payload: payload.into(),
        };
        self.0.send(Inbound::Event(envelope)).is_ok()
    }

    /// Asks the host to tear down its tree on the next poll.
    pub fn invalidate(&self) {
        let _ = self.0.send(Inbound::Invalidate);
    }
}

/// Connects a component tree to a session.
///
/// Adapter threads post events through an [`EventSender`]; the thread that owns the host
/// applies them with [`Host::poll`], so the tree is only ever mutated from one place.
#[derive(Debug)]
pub struct Host {
    tree: ComponentTree,
    session: Session,
    events: Receiver<Inbound>,
    sender: EventSender,
    heartbeat: Option<Timer>,
}

impl Host {
    /// Creates a new Host and mounts `root` as the root of the tree.
    ///
    /// The document title from the session settings is sent to the client. If the settings
    /// carry a heartbeat interval, the heartbeat is started right away.
    pub fn new(mut tree: ComponentTree, root: ComponentId, session: Session) -> Result<Host> {
        if !tree.mount(root, session.clone()) {
            return Err(Error::Mount(root));
        }
        session.set_title(session.settings().title.as_str());

        let (sender, events) = channel::unbounded();
        let sender = EventSender(sender);
        let on_close = sender.clone();
        session.on_close(move || on_close.invalidate());

        let mut host = Host {
            tree,
            session,
            events,
            sender,
            heartbeat: None,
        };
        if let Some(interval) = host.session.settings().heartbeat_interval() {
            host.start_heartbeat(interval);
        }
        Ok(host)
    }

    /// Returns a handle for posting events into this host.
    pub fn events(&self) -> EventSender {
        self.sender.clone()
    }

    /// Renders the whole tree, for the adapter to place into the page.
    ///
    /// The root is wrapped in a page element carrying the theme and base font of the session.
    /// Redrawing the root replaces it inside the page element, so both survive.
    pub fn render(&self) -> String {
        let root = match self.tree.root().and_then(|root| self.tree.render_element(root)) {
            Some(root) => root,
            None => return String::new(),
        };
        let settings = self.session.settings();
        Element::new("div")
            .class(PAGE_CLASS)
            .attr("data-theme", settings.theme.as_str())
            .attr(
                "style",
                format!(
                    "font-family: {}; font-size: {}px",
                    settings.font_family, settings.font_size
                ),
            )
            .child(root)
            .to_markup()
    }

    /// Applies all queued events. Returns how many were handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events.try_recv() {
                Ok(Inbound::Event(envelope)) => {
                    self.dispatch(&envelope.target, &envelope.payload);
                }
                Ok(Inbound::Invalidate) => self.shutdown(),
                // we hold a sender ourselves
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
            handled += 1;
        }
        handled
    }

    /// Dispatches one event right away.
    ///
    /// Heartbeat acknowledgements are recorded on the session and return `None`.
    pub fn dispatch(&mut self, target: &str, payload: &str) -> Option<Dispatch> {
        if target == self.session.heartbeat_target() {
            self.session.heartbeat();
            return None;
        }
        Some(self.tree.dispatch(target, payload))
    }

    /// Pings the client every `interval`. Without an acknowledgement for twice the interval
    /// the session is invalidated.
    pub fn start_heartbeat(&mut self, interval: Duration) {
        let session = self.session.clone();
        let target = session.heartbeat_target();
        session.heartbeat();
        info!(session = %session.id(), ?interval, "starting heartbeat");

        self.heartbeat = Some(Timer::start(self.session.clone(), interval, move || {
            if session.heartbeat_age() > interval * 2 {
                warn!(session = %session.id(), "heartbeat expired");
                session.invalidate();
                return false;
            }
            session.execute(&Instruction::Ping {
                target: target.clone(),
            });
            true
        }));
    }

    /// Stops the heartbeat, disposes the tree and invalidates the session.
    pub fn shutdown(&mut self) {
        if let Some(mut heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        if let Some(root) = self.tree.root() {
            debug!(%root, "disposing tree");
            self.tree.dispose(root);
        }
        self.session.invalidate();
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ComponentTree {
        &mut self.tree
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
use crate::session::QueueChannel;
#[cfg(test)]
use crate::settings::Settings;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
fn host() -> (Host, ComponentId, QueueChannel) {
    let channel = QueueChannel::new();
    let session = Session::new(Arc::new(channel.clone()), Settings::default());
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let field = tree.text_field("");
    tree.push(root, &[field]);
    let host = Host::new(tree, root, session).unwrap();
    channel.drain();
    (host, field, channel)
}

#[test]
fn settings_reach_the_client() {
    let settings = Settings::from_json(
        r#"{ "title": "Console", "theme": "dark", "font_family": "serif", "font_size": 16 }"#,
    )
    .unwrap();
    let channel = QueueChannel::new();
    let session = Session::new(Arc::new(channel.clone()), settings);
    let mut tree = ComponentTree::new();
    let root = tree.column();
    tree.set_style(root, "color", "red");
    let host = Host::new(tree, root, session).unwrap();

    assert_eq!(channel.drain(), vec![r#"perch.title("Console");"#.to_string()]);
    let markup = host.render();
    assert!(markup.starts_with(
        "<div class=\"perch-page\" data-theme=\"dark\" style=\"font-family: serif; font-size: 16px\">"
    ));
    assert!(markup.contains(&format!("id=\"{}\" style=\"color: red\"", root)));
}

#[test]
fn poll_applies_events_in_order() {
    let (mut host, field, _) = host();
    let sender = host.events();
    let target = field.to_string();
    std::thread::spawn(move || {
        sender.dispatch(target.clone(), "first");
        sender.dispatch(target, "second");
    })
    .join()
    .unwrap();

    assert_eq!(host.poll(), 2);
    assert_eq!(host.tree().text(field), Some("second"));
    assert_eq!(host.poll(), 0);
}

#[test]
fn heartbeat_acknowledgements_bypass_the_router() {
    let (mut host, _, _) = host();
    let target = host.session().heartbeat_target();
    assert_eq!(host.dispatch(&target, ""), None);
}

#[test]
fn invalidation_disposes_on_poll() {
    let (mut host, field, channel) = host();
    host.session().invalidate();
    assert!(host.tree().contains(field));

    host.poll();
    assert!(host.tree().is_empty());
    assert_eq!(host.render(), "");
    assert_eq!(host.dispatch(&field.to_string(), "x"), Some(Dispatch::NotFound));
    assert!(channel.drain().is_empty());
}

#[test]
fn mounting_an_owned_component_fails() {
    let session = Session::new(Arc::new(QueueChannel::new()), Settings::default());
    let mut tree = ComponentTree::new();
    let root = tree.column();
    let child = tree.column();
    tree.push(root, &[child]);
    assert!(matches!(
        Host::new(tree, child, session),
        Err(Error::Mount(id)) if id == child
    ));
}

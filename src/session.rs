//! Sessions and the outbound channel.

use crate::instruction::{Instruction, Level};
use crate::settings::Settings;
use core::fmt;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use crossbeam::select;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};
use uuid::Uuid;

/// Prefix of the heartbeat target id; the session id follows it.
const HEARTBEAT_PREFIX: &str = "HEARTBEAT";

/// The outbound channel to a browser.
///
/// Implementations forward the script to wherever it is evaluated (a push socket, a long-poll
/// queue, an embedded browser). `execute` must not block waiting for the client.
pub trait RemoteChannel: Send + Sync {
    fn execute(&self, instruction: &str);
}

/// An in-memory FIFO channel.
///
/// Adapters drain it to deliver instructions in emission order; tests use it to observe them.
#[derive(Debug, Clone)]
pub struct QueueChannel {
    sender: Sender<String>,
    receiver: Receiver<String>,
}

impl QueueChannel {
    pub fn new() -> QueueChannel {
        let (sender, receiver) = channel::unbounded();
        QueueChannel { sender, receiver }
    }

    /// Takes every queued instruction.
    pub fn drain(&self) -> Vec<String> {
        self.receiver.try_iter().collect()
    }

    /// Waits for the next instruction.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        match self.receiver.recv_timeout(timeout) {
            Ok(instruction) => Some(instruction),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn receiver(&self) -> Receiver<String> {
        self.receiver.clone()
    }
}

impl Default for QueueChannel {
    fn default() -> Self {
        QueueChannel::new()
    }
}

impl RemoteChannel for QueueChannel {
    fn execute(&self, instruction: &str) {
        // we hold a receiver ourselves, so this cannot be disconnected
        let _ = self.sender.send(instruction.to_string());
    }
}

struct SessionInner {
    id: Uuid,
    settings: Settings,
    channel: Arc<dyn RemoteChannel>,
    valid: AtomicBool,
    last_heartbeat: Mutex<Instant>,
    close_listeners: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    /// Queue of the delay worker, started by the first delayed instruction.
    delayed: Mutex<Option<Sender<(Instant, String)>>>,
}

/// The context a component tree is attached to.
///
/// Cheap to clone; all clones refer to the same session.
#[derive(Clone)]
pub struct Session(Arc<SessionInner>);

impl Session {
    pub fn new(channel: Arc<dyn RemoteChannel>, settings: Settings) -> Session {
        Session(Arc::new(SessionInner {
            id: Uuid::new_v4(),
            settings,
            channel,
            valid: AtomicBool::new(true),
            last_heartbeat: Mutex::new(Instant::now()),
            close_listeners: Mutex::new(Vec::new()),
            delayed: Mutex::new(None),
        }))
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn settings(&self) -> &Settings {
        &self.0.settings
    }

    /// Returns true if both handles refer to the same session.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Sends an instruction to the client.
    ///
    /// Instructions sent from one thread arrive in the order they were sent. Nothing is sent
    /// once the session has been invalidated.
    pub fn execute(&self, instruction: &Instruction) {
        self.execute_script(&instruction.to_script());
    }

    /// Sends a raw script to the client. Empty scripts are skipped.
    pub fn execute_script(&self, script: &str) {
        if script.is_empty() || !self.is_valid() {
            return;
        }
        trace!(session = %self.0.id, script, "execute");
        self.0.channel.execute(script);
    }

    /// Sends an instruction after a delay, without blocking the caller.
    ///
    /// All delayed instructions of a session are sent by one worker thread, in deadline order.
    /// Instructions with the same deadline keep the order they were scheduled in.
    pub fn execute_after(&self, instruction: Instruction, delay: Duration) {
        if !self.is_valid() {
            return;
        }
        let script = instruction.to_script();
        let mut delayed = self.0.delayed.lock();
        let queue = delayed.get_or_insert_with(|| {
            let (queue, requests) = channel::unbounded();
            let session = Arc::downgrade(&self.0);
            thread::spawn(move || run_delayed(session, requests));
            queue
        });
        // the worker only stops once this sender is gone
        let _ = queue.send((Instant::now() + delay, script));
    }

    /// Shows a toast notification.
    pub fn notify(&self, level: Level, title: impl Into<String>, message: impl Into<String>) {
        self.execute(&Instruction::Notify {
            level,
            title: title.into(),
            message: message.into(),
        });
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.execute(&Instruction::SetTitle {
            title: title.into(),
        });
    }

    /// Id the client dispatches heartbeat acknowledgements to.
    pub fn heartbeat_target(&self) -> String {
        format!("{}{}", HEARTBEAT_PREFIX, self.0.id.simple())
    }

    /// Records a heartbeat acknowledgement.
    pub fn heartbeat(&self) {
        *self.0.last_heartbeat.lock() = Instant::now();
    }

    /// Time since the last heartbeat acknowledgement.
    pub fn heartbeat_age(&self) -> Duration {
        self.0.last_heartbeat.lock().elapsed()
    }

    pub fn is_valid(&self) -> bool {
        self.0.valid.load(Ordering::SeqCst)
    }

    /// Registers a callback that runs once when the session is invalidated.
    ///
    /// Runs immediately if the session is already invalid.
    pub fn on_close<F: 'static + FnOnce() + Send>(&self, listener: F) {
        if !self.is_valid() {
            listener();
            return;
        }
        self.0.close_listeners.lock().push(Box::new(listener));
    }

    /// Marks the session invalid and runs its close listeners. Only the first call has an
    /// effect.
    pub fn invalidate(&self) {
        if !self.0.valid.swap(false, Ordering::SeqCst) {
            return;
        }
        info!(session = %self.0.id, "session invalidated");
        self.0.delayed.lock().take();
        let listeners = std::mem::take(&mut *self.0.close_listeners.lock());
        for listener in listeners {
            listener();
        }
    }
}

/// Body of the delay worker. Exits when the session is dropped or invalidated.
fn run_delayed(session: Weak<SessionInner>, requests: Receiver<(Instant, String)>) {
    enum Wake {
        Request((Instant, String)),
        Due,
        Closed,
    }

    let mut pending: BinaryHeap<Reverse<(Instant, u64, String)>> = BinaryHeap::new();
    let mut scheduled: u64 = 0;
    loop {
        let wake = match pending.peek() {
            None => requests.recv().map_or(Wake::Closed, Wake::Request),
            Some(Reverse((due, _, _))) => {
                let timeout = channel::at(*due);
                select! {
                    recv(requests) -> request => request.map_or(Wake::Closed, Wake::Request),
                    recv(timeout) -> _ => Wake::Due,
                }
            }
        };

        match wake {
            Wake::Request((due, script)) => {
                pending.push(Reverse((due, scheduled, script)));
                scheduled += 1;
            }
            Wake::Due => {
                let session = match session.upgrade() {
                    Some(inner) => Session(inner),
                    None => break,
                };
                let now = Instant::now();
                while let Some(Reverse((due, _, _))) = pending.peek() {
                    if *due > now {
                        break;
                    }
                    if let Some(Reverse((_, _, script))) = pending.pop() {
                        session.execute_script(&script);
                    }
                }
            }
            Wake::Closed => break,
        }
    }
    debug!(dropped = pending.len(), "delay worker stopped");
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.0.id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

#[cfg(test)]
use std::sync::atomic::AtomicUsize;

#[cfg(test)]
fn session() -> (Session, QueueChannel) {
    let channel = QueueChannel::new();
    let session = Session::new(Arc::new(channel.clone()), Settings::default());
    (session, channel)
}

#[test]
fn instructions_arrive_in_order() {
    let (session, channel) = session();
    session.set_title("one");
    session.execute_script("");
    session.execute_script("two();");
    session.notify(Level::Info, "three", "");
    let received = channel.drain();
    assert_eq!(received.len(), 3);
    assert_eq!(received[0], r#"perch.title("one");"#);
    assert_eq!(received[1], "two();");
    assert!(received[2].starts_with("perch.notify(\"info\""));
}

#[test]
fn delayed_execution() {
    let (session, channel) = session();
    session.execute_after(
        Instruction::SetTitle {
            title: "later".into(),
        },
        Duration::from_millis(20),
    );
    session.set_title("now");
    assert_eq!(
        channel.recv_timeout(Duration::from_secs(1)).as_deref(),
        Some(r#"perch.title("now");"#)
    );
    assert_eq!(
        channel.recv_timeout(Duration::from_secs(5)).as_deref(),
        Some(r#"perch.title("later");"#)
    );
}

#[test]
fn delayed_instructions_follow_their_deadlines() {
    let (session, channel) = session();
    let title = |title: &str| Instruction::SetTitle {
        title: title.to_string(),
    };
    session.execute_after(title("third"), Duration::from_millis(60));
    session.execute_after(title("first"), Duration::from_millis(10));
    session.execute_after(title("second"), Duration::from_millis(10));

    let received: Vec<_> = (0..3)
        .filter_map(|_| channel.recv_timeout(Duration::from_secs(5)))
        .collect();
    assert_eq!(
        received,
        vec![
            r#"perch.title("first");"#,
            r#"perch.title("second");"#,
            r#"perch.title("third");"#,
        ]
    );
}

#[test]
fn invalidation_drops_delayed_instructions() {
    let (session, channel) = session();
    session.execute_after(
        Instruction::SetTitle {
            title: "late".into(),
        },
        Duration::from_millis(20),
    );
    session.invalidate();
    assert_eq!(channel.recv_timeout(Duration::from_millis(100)), None);

    session.execute_after(
        Instruction::SetTitle {
            title: "after".into(),
        },
        Duration::ZERO,
    );
    assert_eq!(channel.recv_timeout(Duration::from_millis(50)), None);
}

#[test]
fn invalidation_runs_close_listeners_once() {
    let (session, channel) = session();
    let closed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&closed);
    session.on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    session.invalidate();
    session.invalidate();
    assert!(!session.is_valid());
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    let counter = Arc::clone(&closed);
    session.on_close(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(closed.load(Ordering::SeqCst), 2);

    session.set_title("ignored");
    assert!(channel.drain().is_empty());
}

#[test]
fn heartbeat_target_names_the_session() {
    let (session, _) = session();
    assert_eq!(
        session.heartbeat_target(),
        format!("HEARTBEAT{}", session.id().simple())
    );
    session.heartbeat();
    assert!(session.heartbeat_age() < Duration::from_secs(5));
}

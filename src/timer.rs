//! Periodic background tasks.

use crate::session::Session;
use crossbeam::channel::{self, Sender};
use crossbeam::select;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Runs a task periodically on a background thread.
///
/// The timer stops when its session becomes invalid, when the task returns `false`, or when the
/// timer is stopped or dropped. Tasks must not touch a component tree directly; they talk to the
/// client through the session or post into a host’s event queue.
#[derive(Debug)]
pub struct Timer {
    stop: Option<Sender<()>>,
    running: Arc<AtomicBool>,
}

impl Timer {
    /// Starts a timer whose first tick happens one `period` from now.
    pub fn start<F>(session: Session, period: Duration, mut task: F) -> Timer
    where
        F: 'static + FnMut() -> bool + Send,
    {
        let (stop, stopped) = channel::bounded::<()>(0);
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        thread::spawn(move || {
            let ticker = channel::tick(period);
            loop {
                select! {
                    // a message or a disconnected sender both mean stop
                    recv(stopped) -> _ => break,
                    recv(ticker) -> _ => {
                        if !session.is_valid() {
                            debug!(session = %session.id(), "stopping timer of invalid session");
                            break;
                        }
                        if !task() {
                            break;
                        }
                    }
                }
            }
            thread_running.store(false, Ordering::SeqCst);
        });

        Timer {
            stop: Some(stop),
            running,
        }
    }

    /// Stops the timer. A tick that is already running completes.
    pub fn stop(&mut self) {
        // dropping the sender disconnects the stop channel
        self.stop.take();
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_some() && self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
use crate::session::QueueChannel;
#[cfg(test)]
use crate::settings::Settings;
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
#[cfg(test)]
use std::time::Instant;

#[cfg(test)]
fn session() -> Session {
    Session::new(Arc::new(QueueChannel::new()), Settings::default())
}

#[cfg(test)]
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

#[test]
fn task_runs_until_it_declines() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let timer = Timer::start(session(), Duration::from_millis(5), move || {
        counter.fetch_add(1, Ordering::SeqCst) + 1 < 3
    });

    assert!(wait_until(|| !timer.is_running()));
    assert_eq!(ticks.load(Ordering::SeqCst), 3);
}

#[test]
fn invalid_session_stops_timer() {
    let session = session();
    let timer = Timer::start(session.clone(), Duration::from_millis(5), || true);
    assert!(timer.is_running());
    session.invalidate();
    assert!(wait_until(|| !timer.is_running()));
}

#[test]
fn stop_is_immediate_for_callers() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let mut timer = Timer::start(session(), Duration::from_millis(5), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    });
    timer.stop();
    assert!(!timer.is_running());
    thread::sleep(Duration::from_millis(50));
    let after_stop = ticks.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
}

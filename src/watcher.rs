// Directory watcher: forwards file creation events to a handler.
//
// notify delivers events on its own thread; they are funnelled through a
// channel and handled one at a time on the thread that calls `run`, so a
// file created during an upload simply waits its turn. Shutdown is a flag
// checked before every dispatch, so queued events are dropped once it is set.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use log::{debug, info, warn};
use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::errors::WatchError;

/// Consumer of "a file was created at this path".
pub trait CreatedFileHandler {
    fn handle_created(&mut self, path: &Path);
}

impl<F: FnMut(&Path)> CreatedFileHandler for F {
    fn handle_created(&mut self, path: &Path) {
        self(path)
    }
}

enum WatchMessage {
    Fs(notify::Result<Event>),
    // only wakes `run`; the flag carries the request
    Wake,
}

/// Stops a running `DirectoryWatcher`. Cheap to clone and safe to move into
/// a signal handler.
#[derive(Clone)]
pub struct ShutdownSignal {
    stopped: Arc<AtomicBool>,
    wake: Sender<WatchMessage>,
}

impl ShutdownSignal {
    /// Request a stop. Returns `false` if a stop was already requested.
    pub fn trigger(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        // receiver gone means the watcher already stopped
        let _ = self.wake.send(WatchMessage::Wake);
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct DirectoryWatcher {
    root: PathBuf,
    // dropping it tells notify's event loop to exit; notify offers no join
    watcher: RecommendedWatcher,
    shutdown: ShutdownSignal,
    rx: Receiver<WatchMessage>,
}

impl DirectoryWatcher {
    /// Start watching `root` recursively. Events are buffered until `run`.
    pub fn new(root: &Path) -> Result<Self, WatchError> {
        if !root.exists() {
            return Err(WatchError::MissingRoot {
                path: root.display().to_string(),
            });
        }

        let (tx, rx) = mpsc::channel();
        let fs_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = fs_tx.send(WatchMessage::Fs(res));
            },
            notify::Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(DirectoryWatcher {
            root: root.to_path_buf(),
            watcher,
            shutdown: ShutdownSignal {
                stopped: Arc::new(AtomicBool::new(false)),
                wake: tx,
            },
            rx,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Dispatch creation events to `handler` until shut down. Events still
    /// queued when the stop is requested are discarded; a handler call that
    /// is already running is left to finish.
    pub fn run<H: CreatedFileHandler + ?Sized>(mut self, handler: &mut H) {
        info!("Started monitoring {}", self.root.display());

        'events: while !self.shutdown.is_triggered() {
            let Ok(message) = self.rx.recv() else { break };
            match message {
                WatchMessage::Fs(Ok(event)) => {
                    for path in created_paths(&event) {
                        if self.shutdown.is_triggered() {
                            break 'events;
                        }
                        handler.handle_created(&path);
                    }
                }
                WatchMessage::Fs(Err(e)) => warn!("Watch error: {}", e),
                WatchMessage::Wake => {}
            }
        }

        if let Err(e) = self.watcher.unwatch(&self.root) {
            debug!("Unwatch of {} failed: {}", self.root.display(), e);
        }
        info!("Stopped monitoring {}", self.root.display());
    }
}

/// Non-directory paths created by `event`; empty for every other event kind.
pub fn created_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

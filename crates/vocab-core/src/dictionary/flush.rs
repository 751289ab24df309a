use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, RwLock};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::snapshot::Snapshot;

/// State shared between the dictionary and its flush worker.
#[derive(Default)]
pub(crate) struct Published {
    snapshot: RwLock<Arc<Snapshot>>,
    dirty: AtomicBool,
}

impl Published {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Publish a new snapshot and mark it as not yet persisted.
    pub fn publish(&self, snapshot: Snapshot, dirty: bool) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = Arc::new(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(snapshot),
        }
        // Set after publishing so a concurrent flush either sees this
        // snapshot or leaves the flag set for the next one.
        if dirty {
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }
}

struct FlushRequest {
    ack: Option<mpsc::Sender<bool>>,
}

/// Background writer for one dictionary file. Requests are coalesced and
/// processed one at a time, so at most one flush is ever in flight.
pub(crate) struct FlushWorker {
    tx: mpsc::Sender<FlushRequest>,
    handle: JoinHandle<()>,
}

impl FlushWorker {
    pub fn spawn(name: &str, path: PathBuf, published: Arc<Published>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<FlushRequest>();
        let handle = thread::Builder::new()
            .name(format!("vocab-flush-{name}"))
            .spawn(move || flush_worker(rx, path, published))?;
        Ok(Self { tx, handle })
    }

    /// Schedule a flush without waiting for it.
    pub fn request(&self) {
        let _ = self.tx.send(FlushRequest { ack: None });
    }

    /// Schedule a flush and block until it (or a flush it was coalesced
    /// into) completes. Returns whether the file is up to date.
    pub fn flush_and_wait(&self) -> bool {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(FlushRequest { ack: Some(ack_tx) }).is_err() {
            return false;
        }
        ack_rx.recv().unwrap_or(false)
    }

    /// Final flush, then stop the worker thread.
    pub fn shutdown(self) -> bool {
        let ok = self.flush_and_wait();
        drop(self.tx);
        if self.handle.join().is_err() {
            warn!("flush worker panicked");
            return false;
        }
        ok
    }
}

fn flush_worker(rx: mpsc::Receiver<FlushRequest>, path: PathBuf, published: Arc<Published>) {
    while let Ok(first) = rx.recv() {
        // Coalesce: one write answers every request queued so far.
        let mut acks: Vec<mpsc::Sender<bool>> = first.ack.into_iter().collect();
        while let Ok(newer) = rx.try_recv() {
            acks.extend(newer.ack);
        }

        let ok = flush_once(&path, &published);
        for ack in acks {
            let _ = ack.send(ok);
        }
    }
}

fn flush_once(path: &std::path::Path, published: &Published) -> bool {
    if !published.dirty.swap(false, Ordering::SeqCst) {
        return true;
    }
    let snapshot = published.current();
    let store = snapshot.merged();
    match store.save(path) {
        Ok(()) => {
            debug!(
                path = %path.display(),
                unigrams = store.unigram_count(),
                ngrams = store.ngram_count(),
                "flushed"
            );
            true
        }
        Err(e) => {
            // The snapshot stays in memory; retry on the next trigger.
            warn!(path = %path.display(), "flush failed: {e}");
            published.dirty.store(true, Ordering::SeqCst);
            false
        }
    }
}

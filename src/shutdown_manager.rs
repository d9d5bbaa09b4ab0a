use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};

use tokio::sync::{Notify, oneshot::{self, error::TryRecvError}};



/// Stop broadcaster: one oneshot channel per worker,
/// so each worker observes exactly one stop notification
/// and broadcasting never blocks, whatever the worker count.
#[derive(Default)]
pub struct StopSignal {
    list_shutdown: Vec<oneshot::Sender<()>>
}

impl StopSignal {

    pub fn new() -> Self {
        StopSignal::default()
    }

    pub fn with_capacity(workers: usize) -> Self {
        StopSignal {
            list_shutdown: Vec::with_capacity(workers)
        }
    }

    /// register one more listener, call once per worker
    pub fn subscribe(&mut self) -> StopListener {
        let (sx, rx) = oneshot::channel();
        self.list_shutdown.push(sx);
        StopListener { recv: rx }
    }

    pub fn listeners(&self) -> usize {
        self.list_shutdown.len()
    }

    /// Send to all channels, returns how many listeners were still alive
    pub fn broadcast(self) -> usize {
        self.list_shutdown
            .into_iter()
            .filter_map(|shutdown| shutdown.send(()).ok())
            .count()
    }
}



pub struct StopListener {
    recv: oneshot::Receiver<()>
}

impl StopListener {

    /// Non-blocking check.
    ///
    /// A dropped `StopSignal` counts as a stop request too,
    /// nobody is left to stop this worker otherwise.
    #[inline]
    pub fn is_stopped(&mut self) -> bool {
        match self.recv.try_recv() {
            Ok(_) | Err(TryRecvError::Closed) => true,
            Err(TryRecvError::Empty) => false
        }
    }
}



/// Join barrier, `wait` returns once every registered worker released its slot
#[derive(Default)]
pub struct JoinBarrier {
    pending: AtomicUsize,
    notify: Notify
}

impl JoinBarrier {

    pub fn new() -> Arc<Self> {
        Arc::new(JoinBarrier::default())
    }

    /// register one unit of pending work, released when the guard drops
    pub fn enter(self: &Arc<Self>) -> WorkerGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        WorkerGuard {
            barrier: self.clone()
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        loop {
            // register before checking, so a release in between is not missed
            let notified = self.notify.notified();

            if self.pending() == 0 {
                return
            }

            notified.await;
        }
    }

    fn release(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}



/// Slot held by a running worker, released on drop (panics included)
pub struct WorkerGuard {
    barrier: Arc<JoinBarrier>
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.barrier.release();
    }
}

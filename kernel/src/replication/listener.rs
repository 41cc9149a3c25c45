//! Progress listeners
//!
//! Listeners run synchronously on the thread driving the replications. A
//! slow listener stalls the next replication; hand heavy work to another
//! thread through [`ChannelProgressListener`].

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use tracing::debug;

/// Observer of replication progress
///
/// Snapshots are independent copies of the controller's statistics taken at
/// the moment of notification. They never change afterwards.
pub trait ProgressListener<S>: Send {
    /// Replication `index` (zero-based) just completed
    fn replication_ended(&mut self, index: u64, snapshot: Arc<S>);

    /// The controller terminated; delivered exactly once
    fn simulation_ended(&mut self, snapshot: Arc<S>);
}

/// Notification forwarded by [`ChannelProgressListener`]
#[derive(Debug, Clone)]
pub enum ProgressEvent<S> {
    ReplicationEnded { index: u64, snapshot: Arc<S> },
    SimulationEnded { snapshot: Arc<S> },
}

impl<S> ProgressEvent<S> {
    pub fn snapshot(&self) -> &Arc<S> {
        match self {
            ProgressEvent::ReplicationEnded { snapshot, .. } => snapshot,
            ProgressEvent::SimulationEnded { snapshot } => snapshot,
        }
    }
}

/// Forwards progress to another thread over a channel
///
/// # Example
/// ```
/// use des_kernel::replication::{ChannelProgressListener, ProgressEvent, ProgressListener};
/// use des_kernel::stats::BasicStatistics;
/// use std::sync::Arc;
///
/// let (mut listener, progress) = ChannelProgressListener::channel();
/// listener.replication_ended(0, Arc::new(BasicStatistics::new()));
///
/// match progress.recv().unwrap() {
///     ProgressEvent::ReplicationEnded { index, .. } => assert_eq!(index, 0),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub struct ChannelProgressListener<S> {
    sender: Sender<ProgressEvent<S>>,
}

impl<S> ChannelProgressListener<S> {
    pub fn new(sender: Sender<ProgressEvent<S>>) -> Self {
        Self { sender }
    }

    /// Listener plus the receiving end of its channel
    pub fn channel() -> (Self, Receiver<ProgressEvent<S>>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }

    fn forward(&self, event: ProgressEvent<S>) {
        // A dropped receiver only means nobody is watching anymore
        if self.sender.send(event).is_err() {
            debug!("Progress receiver dropped; notification discarded");
        }
    }
}

impl<S: Send + Sync> ProgressListener<S> for ChannelProgressListener<S> {
    fn replication_ended(&mut self, index: u64, snapshot: Arc<S>) {
        self.forward(ProgressEvent::ReplicationEnded { index, snapshot });
    }

    fn simulation_ended(&mut self, snapshot: Arc<S>) {
        self.forward(ProgressEvent::SimulationEnded { snapshot });
    }
}

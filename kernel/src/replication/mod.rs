//! Replication control
//!
//! Drives a [`Model`](crate::model::Model) through many replications and
//! reports progress to listeners.

mod controller;
mod listener;

pub use controller::{ControllerHandle, ReplicationController};
pub use listener::{ChannelProgressListener, ProgressEvent, ProgressListener};

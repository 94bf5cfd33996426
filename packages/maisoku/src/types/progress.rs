//! Progress events emitted by pipeline stages.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Pipeline stage identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Detect,
    Group,
    Extract,
    Images,
    Publish,
}

/// Incremental progress for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub processed: usize,
    pub total: usize,
}

impl ProgressEvent {
    /// Completion percentage, 100 for an empty stage.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed.min(self.total) * 100) / self.total) as u8
    }
}

/// Sending half of a progress channel.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half of a progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create a progress channel.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Optional progress sink that ignores a departed receiver.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressReporter {
    sender: Option<ProgressSender>,
}

impl ProgressReporter {
    pub(crate) fn new(sender: Option<ProgressSender>) -> Self {
        Self { sender }
    }

    pub(crate) fn report(&self, stage: Stage, processed: usize, total: usize) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(ProgressEvent {
                stage,
                processed,
                total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        let event = ProgressEvent {
            stage: Stage::Extract,
            processed: 1,
            total: 4,
        };
        assert_eq!(event.percent(), 25);

        let empty = ProgressEvent {
            stage: Stage::Images,
            processed: 0,
            total: 0,
        };
        assert_eq!(empty.percent(), 100);
    }

    #[test]
    fn test_reporter_survives_dropped_receiver() {
        let (tx, rx) = progress_channel();
        drop(rx);
        ProgressReporter::new(Some(tx)).report(Stage::Detect, 1, 1);
    }
}

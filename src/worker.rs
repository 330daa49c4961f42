//! Background worker running one manifest at a time
//!
//! The interactive surface hands a manifest to [`spawn_run`] and stays
//! responsive while the worker thread downloads. Progress can be polled
//! through the shared [`ProgressCounter`] and log lines arrive over a channel.

use crate::image_fetcher::ImageFetcher;
use crate::metadata_retrieval::MetadataProvider;
use crate::path_planner::LayoutPolicy;
use crate::progress::ProgressCounter;
use crate::{ProgressEvent, RunError, RunSummary, process_manifest};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// Handle to a run executing on the background worker
#[derive(Debug)]
pub struct RunHandle {
    progress: Arc<ProgressCounter>,
    events: Receiver<ProgressEvent>,
    worker: JoinHandle<Result<RunSummary, RunError>>,
}

impl RunHandle {
    /// The progress counter the worker advances
    pub fn progress(&self) -> Arc<ProgressCounter> {
        Arc::clone(&self.progress)
    }

    /// Events in emission order; the iterator ends when the run has finished
    pub fn events(&self) -> mpsc::Iter<'_, ProgressEvent> {
        self.events.iter()
    }

    /// Events that are already available, without blocking
    pub fn try_events(&self) -> mpsc::TryIter<'_, ProgressEvent> {
        self.events.try_iter()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the run to end and returns its outcome
    pub fn join(self) -> Result<RunSummary, RunError> {
        self.worker.join().unwrap_or(Err(RunError::WorkerPanicked))
    }
}

/// Starts processing a manifest on a new background thread
///
/// The worker owns the provider and fetcher for the duration of the run, so
/// an authentication token obtained by the provider lives exactly as long as
/// the run. A failed run leaves nothing behind that would prevent starting
/// the next one.
pub fn spawn_run(
    manifest_text: String,
    dest_root: PathBuf,
    provider: Box<dyn MetadataProvider + Send>,
    fetcher: Box<dyn ImageFetcher + Send>,
    layout: LayoutPolicy,
) -> RunHandle {
    let progress = Arc::new(ProgressCounter::new());
    let (sender, events) = mpsc::channel();

    let worker = {
        let progress = Arc::clone(&progress);
        thread::spawn(move || {
            process_manifest(
                &manifest_text,
                &dest_root,
                provider.as_ref(),
                fetcher.as_ref(),
                &layout,
                &progress,
                |event| {
                    // The receiver may have been dropped; the run continues regardless
                    let _ = sender.send(event);
                },
            )
        })
    };

    RunHandle {
        progress,
        events,
        worker,
    }
}

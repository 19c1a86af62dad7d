//! Running an analysis off the caller's thread.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, RecvError};

use crate::error::{Error, Result};
use crate::model::AnalysisResult;

use super::analyzer::DocumentAnalyzer;

/// Message sent from the analysis thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    /// Visual detection reached a page (1-based)
    Progress {
        /// Current page
        current: usize,
        /// Page count
        total: usize,
    },
    /// The pass is over; always the last event
    Finished(AnalysisResult),
}

/// Handle to a running analysis.
///
/// Events arrive in order on [`events`](Self::events); the receiver can be
/// polled from a UI loop with `try_recv` or selected on with other channels.
#[derive(Debug)]
pub struct AnalysisHandle {
    events: Receiver<AnalysisEvent>,
    thread: Option<JoinHandle<()>>,
}

impl AnalysisHandle {
    /// Event stream.
    pub fn events(&self) -> &Receiver<AnalysisEvent> {
        &self.events
    }

    /// Block until the pass finishes, discarding progress events.
    pub fn wait(mut self) -> AnalysisResult {
        let result = loop {
            match self.events.recv() {
                Ok(AnalysisEvent::Finished(result)) => break result,
                Ok(AnalysisEvent::Progress { .. }) => continue,
                Err(RecvError) => {
                    break AnalysisResult::failed("analysis thread exited without a result")
                }
            }
        };
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        result
    }
}

/// Analyze `path` on a new thread.
///
/// The analyzer is moved to the thread, so the caller keeps no shared state
/// with it. There is no cancellation; dropping the handle lets the pass run
/// to completion in the background.
pub fn spawn_analysis(analyzer: DocumentAnalyzer, path: impl Into<PathBuf>) -> Result<AnalysisHandle> {
    let path = path.into();
    let (tx, rx) = unbounded();

    let thread = thread::Builder::new()
        .name("formpdf-analysis".to_string())
        .spawn(move || {
            let progress_tx = tx.clone();
            let result = analyzer.analyze_file_with_progress(&path, |current, total| {
                // The receiver may be gone; the pass still completes
                let _ = progress_tx.send(AnalysisEvent::Progress { current, total });
            });
            let _ = tx.send(AnalysisEvent::Finished(result));
        })
        .map_err(Error::Io)?;

    Ok(AnalysisHandle {
        events: rx,
        thread: Some(thread),
    })
}

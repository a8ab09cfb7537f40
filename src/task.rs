//! Background analysis fetch.
//!
//! A [`FetchTask`] runs one analysis on the tokio runtime and reports back
//! over an unbounded channel: a handful of coarse progress milestones, then
//! exactly one [`FetchEvent::Finished`]. The receiving side (an event loop,
//! or a CLI waiting on [`FetchHandle::wait`]) never touches the network.

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    analysis::{AnalysisFilters, AnalysisRequest, AnalysisType},
    api::{AnalysisOutcome, AnalyticsClient, FetchError},
};

/// Progress checkpoints, in the order they are reported.
pub mod milestone {
    pub const ISSUING: u8 = 10;
    pub const REQUEST_BUILT: u8 = 30;
    pub const SENT: u8 = 50;
    pub const RECEIVED: u8 = 70;
    pub const PARSED: u8 = 90;
    pub const DONE: u8 = 100;
}

#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// Percentage in 0..=100, strictly increasing within one run.
    Progress(u8),
    /// Terminal event; nothing follows it.
    Finished(AnalysisOutcome),
}

/// Sending half owned by the worker.
///
/// `finish` consumes the reporter, so no event can follow the outcome.
struct Reporter {
    tx: mpsc::UnboundedSender<FetchEvent>,
    last: u8,
}

impl Reporter {
    fn progress(&mut self, value: u8) {
        let value = value.min(milestone::DONE);
        if value <= self.last {
            return;
        }
        self.last = value;
        tracing::debug!(progress = value, "Fetch progress");
        // Receiver gone means nobody is listening any more; keep going so the
        // request still completes.
        let _ = self.tx.send(FetchEvent::Progress(value));
    }

    fn finish(self, outcome: AnalysisOutcome) {
        let _ = self.tx.send(FetchEvent::Finished(outcome));
    }
}

pub struct FetchTask;

impl FetchTask {
    /// Start fetching `analysis_key` with the given filters.
    ///
    /// Must be called from within a tokio runtime. An unknown key finishes
    /// with [`FetchError::UnknownAnalysisType`] before any request is made.
    pub fn spawn(
        client: AnalyticsClient,
        analysis_key: impl Into<String>,
        filters: AnalysisFilters,
    ) -> FetchHandle {
        let analysis_key = analysis_key.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Reporter { tx, last: 0 };

        let key = analysis_key.clone();
        let worker = tokio::spawn(async move {
            run(client, &key, filters, reporter).await;
        });

        FetchHandle {
            analysis_key,
            events: rx,
            worker,
        }
    }
}

async fn run(client: AnalyticsClient, key: &str, filters: AnalysisFilters, mut reporter: Reporter) {
    reporter.progress(milestone::ISSUING);

    let analysis = match key.parse::<AnalysisType>() {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!(analysis = key, "Rejected unknown analysis type");
            reporter.finish(Err(e));
            return;
        }
    };

    let request = AnalysisRequest::new(analysis, filters);
    reporter.progress(milestone::REQUEST_BUILT);

    tracing::info!(
        %analysis,
        start = %request.start_date,
        end = %request.end_date,
        outlet = request.outlet_id.as_deref().unwrap_or("all"),
        scope = ?request.scope,
        "Starting analysis"
    );

    reporter.progress(milestone::SENT);
    let raw = match client.send(&request).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(%analysis, error = %e, "Analysis request failed");
            reporter.finish(Err(e));
            return;
        }
    };
    reporter.progress(milestone::RECEIVED);

    match crate::api::decode(raw) {
        Ok(payload) => {
            reporter.progress(milestone::PARSED);
            tracing::info!(%analysis, fields = payload.len(), "Analysis completed");
            reporter.progress(milestone::DONE);
            reporter.finish(Ok(payload));
        }
        Err(e) => {
            tracing::warn!(%analysis, error = %e, "Analysis response rejected");
            reporter.finish(Err(e));
        }
    }
}

/// Receiving side of a running [`FetchTask`].
#[derive(Debug)]
pub struct FetchHandle {
    analysis_key: String,
    events: mpsc::UnboundedReceiver<FetchEvent>,
    worker: JoinHandle<()>,
}

impl FetchHandle {
    pub fn analysis_key(&self) -> &str {
        &self.analysis_key
    }

    /// Next event, or `None` once the worker is gone and everything was read.
    pub async fn next_event(&mut self) -> Option<FetchEvent> {
        self.events.recv().await
    }

    /// Best-effort cancellation; nothing further is delivered once the
    /// worker has been aborted.
    pub fn abort(&self) {
        self.worker.abort();
    }

    /// Drain the task, returning the progress values seen and the outcome.
    ///
    /// After [`abort`](Self::abort) no outcome arrives, so this returns
    /// `FetchError::Unknown("<key> ended without an outcome")`.
    pub async fn wait(mut self) -> (Vec<u8>, AnalysisOutcome) {
        let mut progress = Vec::new();
        while let Some(event) = self.next_event().await {
            match event {
                FetchEvent::Progress(value) => progress.push(value),
                FetchEvent::Finished(outcome) => return (progress, outcome),
            }
        }
        (
            progress,
            Err(FetchError::Unknown(format!(
                "{} ended without an outcome",
                self.analysis_key
            ))),
        )
    }
}

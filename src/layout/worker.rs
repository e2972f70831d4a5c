//! Off-main-thread layout computation.
//!
//! One-shot jobs keyed by keyframe index travel to a background thread over
//! a channel; results come back by value on a second channel. The main
//! thread polls for results between frames, so a response can only ever
//! mutate the layout cache, never a frame in progress.
//!
//! The message schema mirrors the host worker protocol exactly:
//!
//! ```text
//! request:  { jobId, command: "CALCULATE_LAYOUT", data: { treeData, options } }
//! response: { jobId, status: "SUCCESS", result: { layout, layerData } }
//!         | { jobId, status: "ERROR",   error }
//! ```

use std::collections::VecDeque;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::radial::{LayoutCalculator, LayoutOptions};
use super::Layout;
use crate::error::MovieError;
use crate::keyframes::TreeData;

/// The only command the worker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerCommand {
    /// Compute a layout for one tree.
    #[serde(rename = "CALCULATE_LAYOUT")]
    CalculateLayout,
}

/// Payload of a layout job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutJob {
    /// Tree to lay out (shared, immutable).
    pub tree_data: Arc<TreeData>,
    /// Layout parameters.
    pub options: LayoutOptions,
}

/// Inbound worker message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    /// Keyframe index; serialized as a string.
    #[serde(with = "job_id")]
    pub job_id: usize,
    /// Always [`WorkerCommand::CalculateLayout`].
    pub command: WorkerCommand,
    /// Tree and options.
    pub data: LayoutJob,
}

impl LayoutRequest {
    /// Layout request for keyframe `job_id`.
    pub fn calculate(
        job_id: usize,
        tree_data: Arc<TreeData>,
        options: LayoutOptions,
    ) -> Self {
        Self {
            job_id,
            command: WorkerCommand::CalculateLayout,
            data: LayoutJob { tree_data, options },
        }
    }

    /// Encode as wire JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Protocol`] if serialization fails.
    pub fn to_json(&self) -> Result<String, MovieError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from wire JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Protocol`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self, MovieError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Summary data for sizing layers and the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutExtent {
    /// Largest node radius.
    pub max_radius: f32,
    /// Leaf count.
    pub leaf_count: usize,
    /// Node count.
    pub node_count: usize,
}

impl LayoutExtent {
    /// Extent of a computed layout.
    pub fn of(layout: &Layout) -> Self {
        Self {
            max_radius: layout.max_radius(),
            leaf_count: layout.leaves().count(),
            node_count: layout.nodes.len(),
        }
    }
}

/// Successful job output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    /// Computed layout.
    pub layout: Arc<Layout>,
    /// Precomputed extent.
    pub layer_data: LayoutExtent,
}

/// Outcome of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum LayoutOutcome {
    /// Layout computed.
    #[serde(rename = "SUCCESS")]
    Success {
        /// Layout and extent.
        result: LayoutResult,
    },
    /// Layout failed.
    #[serde(rename = "ERROR")]
    Error {
        /// Failure description.
        error: String,
    },
}

/// Outbound worker message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    /// Keyframe index the job was for.
    #[serde(with = "job_id")]
    pub job_id: usize,
    /// Success or error.
    #[serde(flatten)]
    pub outcome: LayoutOutcome,
}

impl LayoutResponse {
    /// Encode as wire JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Protocol`] if serialization fails.
    pub fn to_json(&self) -> Result<String, MovieError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from wire JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Protocol`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self, MovieError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Run one job to completion. Calculator errors become `ERROR` responses.
pub fn handle_request(
    calculator: &dyn LayoutCalculator,
    request: &LayoutRequest,
) -> LayoutResponse {
    let outcome = match request.command {
        WorkerCommand::CalculateLayout => {
            match calculator.calculate(&request.data.tree_data, &request.data.options) {
                Ok(layout) => LayoutOutcome::Success {
                    result: LayoutResult {
                        layer_data: LayoutExtent::of(&layout),
                        layout: Arc::new(layout),
                    },
                },
                Err(e) => LayoutOutcome::Error {
                    error: e.to_string(),
                },
            }
        }
    };
    LayoutResponse {
        job_id: request.job_id,
        outcome,
    }
}

/// One-way job channel to something that computes layouts.
pub trait LayoutTransport {
    /// Queue a job (non-blocking).
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Protocol`] when the worker is gone.
    fn submit(&mut self, request: LayoutRequest) -> Result<(), MovieError>;

    /// Non-blocking check for a finished job.
    fn try_recv(&mut self) -> Option<LayoutResponse>;
}

enum WorkerMessage {
    Job(LayoutRequest),
    Shutdown,
}

/// Background thread running a [`LayoutCalculator`].
pub struct LayoutWorker {
    request_tx: mpsc::Sender<WorkerMessage>,
    response_rx: mpsc::Receiver<LayoutResponse>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl LayoutWorker {
    /// Spawn the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::ThreadSpawn`] if the thread fails to spawn.
    pub fn new(calculator: Arc<dyn LayoutCalculator>) -> Result<Self, MovieError> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();
        let (response_tx, response_rx) = mpsc::channel::<LayoutResponse>();

        let thread = std::thread::Builder::new()
            .name("layout-worker".into())
            .spawn(move || {
                Self::thread_loop(&*calculator, &request_rx, &response_tx);
            })
            .map_err(MovieError::ThreadSpawn)?;

        Ok(Self {
            request_tx,
            response_rx,
            thread: Some(thread),
        })
    }

    /// Block up to `timeout` for the next finished job.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<LayoutResponse> {
        self.response_rx.recv_timeout(timeout).ok()
    }

    /// Shut down the background thread and wait for it to finish.
    pub fn shutdown(&mut self) {
        let _ = self.request_tx.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn thread_loop(
        calculator: &dyn LayoutCalculator,
        request_rx: &mpsc::Receiver<WorkerMessage>,
        response_tx: &mpsc::Sender<LayoutResponse>,
    ) {
        let mut pending: VecDeque<LayoutRequest> = VecDeque::new();
        while let Ok(message) = request_rx.recv() {
            if !drain_pending(message, request_rx, &mut pending) {
                break;
            }
            while let Some(request) = pending.pop_front() {
                let response = handle_request(calculator, &request);
                if response_tx.send(response).is_err() {
                    return;
                }
            }
        }
    }
}

/// Move the received message and everything already queued into
/// `pending`, replacing queued jobs for the same keyframe with the newest
/// one. Returns `false` on shutdown.
fn drain_pending(
    first: WorkerMessage,
    rx: &mpsc::Receiver<WorkerMessage>,
    pending: &mut VecDeque<LayoutRequest>,
) -> bool {
    let mut next = Some(first);
    while let Some(message) = next.take() {
        match message {
            WorkerMessage::Shutdown => return false,
            WorkerMessage::Job(request) => {
                if let Some(slot) =
                    pending.iter_mut().find(|r| r.job_id == request.job_id)
                {
                    *slot = request;
                } else {
                    pending.push_back(request);
                }
            }
        }
        next = rx.try_recv().ok();
    }
    true
}

impl LayoutTransport for LayoutWorker {
    fn submit(&mut self, request: LayoutRequest) -> Result<(), MovieError> {
        self.request_tx
            .send(WorkerMessage::Job(request))
            .map_err(|_| MovieError::Protocol("layout worker disconnected".to_owned()))
    }

    fn try_recv(&mut self) -> Option<LayoutResponse> {
        self.response_rx.try_recv().ok()
    }
}

impl Drop for LayoutWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Synchronous transport: computes on submit and queues the response.
///
/// For hosts without threads and for deterministic tests.
pub struct InlineLayoutWorker {
    calculator: Arc<dyn LayoutCalculator>,
    responses: VecDeque<LayoutResponse>,
}

impl InlineLayoutWorker {
    /// Inline transport over `calculator`.
    pub fn new(calculator: Arc<dyn LayoutCalculator>) -> Self {
        Self {
            calculator,
            responses: VecDeque::new(),
        }
    }

    /// Number of responses waiting to be polled.
    pub fn queued(&self) -> usize {
        self.responses.len()
    }
}

impl LayoutTransport for InlineLayoutWorker {
    fn submit(&mut self, request: LayoutRequest) -> Result<(), MovieError> {
        self.responses
            .push_back(handle_request(&*self.calculator, &request));
        Ok(())
    }

    fn try_recv(&mut self) -> Option<LayoutResponse> {
        self.responses.pop_front()
    }
}

/// Job ids travel as strings and are keyframe indices internally.
mod job_id {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(usize),
    }

    pub(super) fn serialize<S: Serializer>(
        id: &usize,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&id.to_string())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<usize, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

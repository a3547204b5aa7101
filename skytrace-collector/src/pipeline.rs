//! Per-signal fan-out: one queue, one delivery task and one backoff
//! schedule per sink.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use skytrace::export::ExportResult;
use skytrace_proto::{export_request, ExportRequest, LogsPayload, MetricsPayload, TracesPayload};

use crate::retry::{Backoff, RetryPolicy};

/// Per-sink queue depth. Bounds how far a dead backend can lag before
/// newly ingested payloads for it are dropped (with a recorded warning).
pub const SINK_QUEUE_CAPACITY: usize = 2_048;

/// A delivery target for one signal type.
#[async_trait]
pub trait Sink<T>: Send + fmt::Debug + 'static {
    /// Short sink name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Deliver one payload. An error means "not delivered, try again".
    async fn deliver(&mut self, payload: &T) -> ExportResult;
}

/// An optional transformation stage between ingestion and fan-out.
///
/// The stage exists in the pipeline but the default configuration installs
/// no processors: the collector forwards payloads unmodified.
pub trait Processor<T>: Send + Sync + fmt::Debug {
    /// Transform a payload before it is fanned out.
    fn process(&self, payload: T) -> T;
}

/// Fan-out for a single signal type.
#[derive(Debug)]
pub struct SignalPipeline<T> {
    signal: &'static str,
    processors: Vec<Box<dyn Processor<T>>>,
    sinks: Vec<SinkHandle<T>>,
}

#[derive(Debug)]
struct SinkHandle<T> {
    name: &'static str,
    sender: mpsc::Sender<Arc<T>>,
}

impl<T> SignalPipeline<T>
where
    T: Send + Sync + 'static,
{
    /// Create an empty pipeline for the named signal type.
    pub fn new(signal: &'static str) -> Self {
        SignalPipeline {
            signal,
            processors: Vec::new(),
            sinks: Vec::new(),
        }
    }

    /// Install a processor stage. Runs in installation order.
    pub fn with_processor(mut self, processor: impl Processor<T> + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Attach a sink, spawning its delivery task. Must be called within a
    /// Tokio runtime.
    pub fn with_sink(mut self, sink: impl Sink<T>, policy: RetryPolicy) -> Self {
        let name = sink.name();
        let (sender, receiver) = mpsc::channel(SINK_QUEUE_CAPACITY);
        spawn_delivery_task(self.signal, sink, receiver, policy);
        self.sinks.push(SinkHandle { name, sender });
        self
    }

    /// Run the processor stage and enqueue the payload on every sink.
    ///
    /// Never blocks: a sink whose queue is full loses this payload, and the
    /// drop is logged so it is never silent.
    pub fn dispatch(&self, payload: T) {
        let payload = self
            .processors
            .iter()
            .fold(payload, |payload, processor| processor.process(payload));
        let payload = Arc::new(payload);
        for sink in &self.sinks {
            match sink.sender.try_send(payload.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        name: "pipeline.sink_queue_full",
                        signal = self.signal,
                        sink = sink.name,
                        capacity = SINK_QUEUE_CAPACITY,
                        "sink queue full, dropping payload"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(
                        name: "pipeline.sink_gone",
                        signal = self.signal,
                        sink = sink.name,
                        "sink delivery task is gone, dropping payload"
                    );
                }
            }
        }
    }
}

fn spawn_delivery_task<T>(
    signal: &'static str,
    mut sink: impl Sink<T>,
    mut receiver: mpsc::Receiver<Arc<T>>,
    policy: RetryPolicy,
) where
    T: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut backoff = Backoff::new(policy);
        while let Some(payload) = receiver.recv().await {
            // Retried until the sink takes it; only queue overflow (logged
            // at dispatch) ever discards a payload.
            loop {
                match sink.deliver(payload.as_ref()).await {
                    Ok(()) => {
                        if backoff.attempts > 0 {
                            tracing::info!(
                                name: "pipeline.sink_recovered",
                                signal,
                                sink = sink.name(),
                                attempts = backoff.attempts,
                                "sink delivery recovered"
                            );
                        }
                        backoff.reset();
                        break;
                    }
                    Err(err) => {
                        let delay = backoff.next_delay();
                        tracing::warn!(
                            name: "pipeline.sink_delivery_failed",
                            signal,
                            sink = sink.name(),
                            attempt = backoff.attempts,
                            retry_in_ms = delay.as_millis() as u64,
                            error = %err,
                            "sink delivery failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    });
}

/// The three per-signal pipelines of a running collector.
#[derive(Debug)]
pub struct Pipelines {
    /// Fan-out for trace payloads.
    pub traces: SignalPipeline<TracesPayload>,
    /// Fan-out for metric payloads.
    pub metrics: SignalPipeline<MetricsPayload>,
    /// Fan-out for log payloads.
    pub logs: SignalPipeline<LogsPayload>,
}

impl Pipelines {
    /// Route a decoded request to the pipeline for its signal type.
    pub fn dispatch_request(&self, request: ExportRequest) {
        match request.payload {
            Some(export_request::Payload::Traces(payload)) => self.traces.dispatch(payload),
            Some(export_request::Payload::Metrics(payload)) => self.metrics.dispatch(payload),
            Some(export_request::Payload::Logs(payload)) => self.logs.dispatch(payload),
            None => {
                tracing::debug!(name: "pipeline.empty_request", "request without payload ignored");
            }
        }
    }
}

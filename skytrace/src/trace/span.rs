use std::time::SystemTime;

use crate::common::KeyValue;

use super::{SpanContext, SpanData, Status, TracerProvider};

/// A scoped guard over a single traced operation.
///
/// The span is mutable only through this guard, and only until it closes.
/// Closing happens exactly once, on whichever comes first:
///
/// - [`Span::end`], which finalizes with the recorded status ([`Status::Ok`]
///   unless [`Span::set_status`] said otherwise), or
/// - the guard's `Drop`, which finalizes with [`Status::Error`] — the abort
///   path for panics, early `?` returns and cancelled request futures.
///
/// Finalizing hands the immutable [`SpanData`] to the provider's processors.
#[derive(Debug)]
pub struct Span {
    data: Option<SpanData>,
    provider: TracerProvider,
}

impl Span {
    pub(crate) fn new(data: SpanData, provider: TracerProvider) -> Self {
        Span {
            data: Some(data),
            provider,
        }
    }

    /// The propagable identity of this span.
    pub fn span_context(&self) -> &SpanContext {
        // data is only None after `end`, which consumes the guard.
        &self.data.as_ref().expect("span polled after end").span_context
    }

    /// Set an attribute on the span. Keys are unique; setting an existing
    /// key replaces its value.
    pub fn set_attribute(&mut self, kv: KeyValue) {
        if let Some(data) = self.data.as_mut() {
            if let Some(existing) = data.attributes.iter_mut().find(|a| a.key == kv.key) {
                existing.value = kv.value;
            } else {
                data.attributes.push(kv);
            }
        }
    }

    /// Record the outcome of the operation.
    pub fn set_status(&mut self, status: Status) {
        if let Some(data) = self.data.as_mut() {
            data.status = status;
        }
    }

    /// Close the span with the recorded status and hand it to the exporter
    /// pipeline.
    pub fn end(mut self) {
        self.finalize(None);
    }

    fn finalize(&mut self, override_status: Option<Status>) {
        if let Some(mut data) = self.data.take() {
            data.end_time = SystemTime::now();
            if let Some(status) = override_status {
                data.status = status;
            }
            self.provider.on_end(data);
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        // Not ended explicitly: the operation was aborted.
        self.finalize(Some(Status::Error));
    }
}

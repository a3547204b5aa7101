use std::borrow::Cow;
use std::time::SystemTime;

use crate::context::Context;

use super::{Span, SpanContext, SpanData, SpanId, Status, TraceFlags, TracerProvider};

/// Starts [`Span`]s parented from an explicit [`Context`].
#[derive(Clone, Debug)]
pub struct Tracer {
    provider: TracerProvider,
}

impl Tracer {
    pub(crate) fn new(provider: TracerProvider) -> Self {
        Tracer { provider }
    }

    /// Open a new span.
    ///
    /// If `cx` carries a valid active span (local or extracted from a remote
    /// caller), the new span joins that trace as its child; otherwise a new
    /// root span with a fresh trace id is started.
    pub fn start_span(&self, name: impl Into<Cow<'static, str>>, cx: &Context) -> Span {
        let id_generator = self.provider.id_generator();
        let (trace_id, parent_span_id, trace_flags) = match cx.span_context() {
            Some(parent) if parent.is_valid() => {
                (parent.trace_id(), parent.span_id(), parent.trace_flags())
            }
            _ => (
                id_generator.new_trace_id(),
                SpanId::INVALID,
                TraceFlags::SAMPLED,
            ),
        };
        let span_context =
            SpanContext::new(trace_id, id_generator.new_span_id(), trace_flags, false);
        let start_time = SystemTime::now();

        Span::new(
            SpanData {
                span_context,
                parent_span_id,
                name: name.into(),
                start_time,
                end_time: start_time,
                status: Status::default(),
                attributes: Vec::new(),
            },
            self.provider.clone(),
        )
    }
}

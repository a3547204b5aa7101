use crate::trace::{Span, SpanContext};

/// An execution-scoped handle carrying the active span identity.
///
/// Contexts are immutable; deriving a new context with [`Context::with_span`]
/// or [`Context::with_remote_span_context`] leaves the original untouched.
/// They are passed explicitly down call chains — there is no thread-local or
/// otherwise ambient "current" context, so concurrent requests can never
/// observe each other's spans.
#[derive(Clone, Debug, Default)]
pub struct Context {
    span_context: Option<SpanContext>,
}

impl Context {
    /// Create an empty context with no active span.
    ///
    /// Starting a span from an empty context begins a new root trace.
    pub fn new() -> Self {
        Context::default()
    }

    /// Returns a new context with the given local span active.
    pub fn with_span(&self, span: &Span) -> Self {
        Context {
            span_context: Some(span.span_context().clone()),
        }
    }

    /// Returns a new context with a remote span context active, as produced
    /// by extracting propagation headers from an inbound request.
    pub fn with_remote_span_context(&self, span_context: SpanContext) -> Self {
        Context {
            span_context: Some(span_context),
        }
    }

    /// The active span context, if any.
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span_context.as_ref()
    }

    /// Returns `true` if a valid span is active on this context.
    pub fn has_active_span(&self) -> bool {
        self.span_context
            .as_ref()
            .map(SpanContext::is_valid)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanContext, SpanId, TraceFlags, TraceId};

    #[test]
    fn empty_context_has_no_span() {
        let cx = Context::new();
        assert!(cx.span_context().is_none());
        assert!(!cx.has_active_span());
    }

    #[test]
    fn remote_span_context_is_active() {
        let sc = SpanContext::new(
            TraceId::from(1u128),
            SpanId::from(2u64),
            TraceFlags::SAMPLED,
            true,
        );
        let cx = Context::new().with_remote_span_context(sc.clone());
        assert!(cx.has_active_span());
        assert_eq!(cx.span_context(), Some(&sc));
    }

    #[test]
    fn invalid_remote_context_is_not_active() {
        let cx = Context::new().with_remote_span_context(SpanContext::NONE);
        assert!(!cx.has_active_span());
    }
}

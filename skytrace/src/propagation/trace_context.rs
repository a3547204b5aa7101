//! `traceparent` header propagation, following the W3C Trace Context
//! wire format.

use crate::context::Context;
use crate::trace::{SpanContext, SpanId, TraceFlags, TraceId};

use super::{Extractor, Injector};

const SUPPORTED_VERSION: u8 = 0;
const MAX_VERSION: u8 = 254;

/// Name of the header carrying the trace identity.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Propagates [`SpanContext`]s in the W3C `traceparent` format:
///
/// `traceparent: 00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`
///
/// Four `-`-separated fields: version, trace-id, parent-id, trace-flags.
#[derive(Clone, Debug, Default)]
pub struct TraceContextPropagator {
    _private: (),
}

impl TraceContextPropagator {
    /// Create a new `TraceContextPropagator`.
    pub fn new() -> Self {
        TraceContextPropagator { _private: () }
    }

    /// Encode the active span context of `cx` into the carrier.
    ///
    /// Must run before the outbound call is dispatched; the span the context
    /// refers to has to still be open when the downstream service parents
    /// from it.
    pub fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        if let Some(span_context) = cx.span_context().filter(|sc| sc.is_valid()) {
            let header_value = format!(
                "{:02x}-{}-{}-{:02x}",
                SUPPORTED_VERSION,
                span_context.trace_id(),
                span_context.span_id(),
                span_context.trace_flags() & TraceFlags::SAMPLED
            );
            injector.set(TRACEPARENT_HEADER, header_value);
        }
    }

    /// Decode a carrier into a context.
    ///
    /// Absent or malformed headers yield an empty context ("no parent");
    /// extraction never fails.
    pub fn extract(&self, extractor: &dyn Extractor) -> Context {
        self.extract_with_context(&Context::new(), extractor)
    }

    /// Decode a carrier, layering the result over an existing context.
    pub fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        self.extract_span_context(extractor)
            .map(|sc| cx.with_remote_span_context(sc))
            .unwrap_or_else(|()| cx.clone())
    }

    fn extract_span_context(&self, extractor: &dyn Extractor) -> Result<SpanContext, ()> {
        let header_value = extractor.get(TRACEPARENT_HEADER).unwrap_or("").trim();
        let parts = header_value.split_terminator('-').collect::<Vec<&str>>();
        if parts.len() < 4 {
            return Err(());
        }

        // For version 0 there must be exactly 4 parts.
        let version = u8::from_str_radix(parts[0], 16).map_err(|_| ())?;
        if version > MAX_VERSION || version == 0 && parts.len() != 4 {
            return Err(());
        }

        // Field lengths are fixed; ids must be lowercase hex.
        if parts[1].len() != 32 || parts[1].chars().any(|c| c.is_ascii_uppercase()) {
            return Err(());
        }
        let trace_id = TraceId::from_hex(parts[1]).map_err(|_| ())?;

        if parts[2].len() != 16 || parts[2].chars().any(|c| c.is_ascii_uppercase()) {
            return Err(());
        }
        let span_id = SpanId::from_hex(parts[2]).map_err(|_| ())?;

        if parts[3].len() != 2 {
            return Err(());
        }
        let opts = u8::from_str_radix(parts[3], 16).map_err(|_| ())?;
        if version == 0 && opts > 2 {
            return Err(());
        }

        // Clear all flags other than the supported sampling bit.
        let trace_flags = TraceFlags::new(opts) & TraceFlags::SAMPLED;

        let span_context = SpanContext::new(trace_id, span_id, trace_flags, true);
        if !span_context.is_valid() {
            return Err(());
        }

        Ok(span_context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[rustfmt::skip]
    fn extract_data() -> Vec<(&'static str, SpanContext)> {
        vec![
            ("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00", SpanContext::new(TraceId::from(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736), SpanId::from(0x00f0_67aa_0ba9_02b7), TraceFlags::default(), true)),
            ("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01", SpanContext::new(TraceId::from(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736), SpanId::from(0x00f0_67aa_0ba9_02b7), TraceFlags::SAMPLED, true)),
            ("02-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-09", SpanContext::new(TraceId::from(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736), SpanId::from(0x00f0_67aa_0ba9_02b7), TraceFlags::SAMPLED, true)),
            ("02-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-08", SpanContext::new(TraceId::from(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736), SpanId::from(0x00f0_67aa_0ba9_02b7), TraceFlags::default(), true)),
            ("02-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-09-XYZxsf09", SpanContext::new(TraceId::from(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736), SpanId::from(0x00f0_67aa_0ba9_02b7), TraceFlags::SAMPLED, true)),
        ]
    }

    #[rustfmt::skip]
    fn extract_data_invalid() -> Vec<(&'static str, &'static str)> {
        vec![
            ("0000-00000000000000000000000000000000-0000000000000000-01", "wrong version length"),
            ("00-ab00000000000000000000000000000000-cd00000000000000-01", "wrong trace ID length"),
            ("00-ab000000000000000000000000000000-cd0000000000000000-01", "wrong span ID length"),
            ("00-ab000000000000000000000000000000-cd00000000000000-0100", "wrong trace flag length"),
            ("qw-00000000000000000000000000000000-0000000000000000-01",   "bogus version"),
            ("00-qw000000000000000000000000000000-cd00000000000000-01",   "bogus trace ID"),
            ("00-ab000000000000000000000000000000-qw00000000000000-01",   "bogus span ID"),
            ("00-ab000000000000000000000000000000-cd00000000000000-qw",   "bogus trace flag"),
            ("A0-00000000000000000000000000000000-0000000000000000-01",   "upper case version"),
            ("00-AB000000000000000000000000000000-cd00000000000000-01",   "upper case trace ID"),
            ("00-ab000000000000000000000000000000-CD00000000000000-01",   "upper case span ID"),
            ("00-00000000000000000000000000000000-0000000000000000-01",   "zero trace ID and span ID"),
            ("00-ab000000000000000000000000000000-cd00000000000000-09",   "trace-flag unused bits set"),
            ("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7",      "missing options"),
            ("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-",     "empty options"),
            ("",                                                          "empty header"),
            ("00",                                                        "only version"),
            ("00--00",                                                    "missing ids"),
        ]
    }

    fn carrier_with(header: &str) -> HashMap<String, String> {
        let mut carrier = HashMap::new();
        carrier.insert(TRACEPARENT_HEADER.to_string(), header.to_string());
        carrier
    }

    #[test]
    fn extract_valid_headers() {
        let propagator = TraceContextPropagator::new();
        for (header, expected) in extract_data() {
            let cx = propagator.extract(&carrier_with(header));
            assert_eq!(cx.span_context(), Some(&expected), "{header}");
            assert!(expected.is_remote());
        }
    }

    #[test]
    fn extract_rejects_invalid_headers() {
        let propagator = TraceContextPropagator::new();
        for (header, reason) in extract_data_invalid() {
            let cx = propagator.extract(&carrier_with(header));
            assert!(cx.span_context().is_none(), "{reason}");
        }
    }

    #[test]
    fn extract_absent_header_yields_no_parent() {
        let propagator = TraceContextPropagator::new();
        let cx = propagator.extract(&HashMap::new());
        assert!(cx.span_context().is_none());
    }

    #[test]
    fn inject_writes_canonical_header() {
        let propagator = TraceContextPropagator::new();
        let span_context = SpanContext::new(
            TraceId::from(0x4bf9_2f35_77b3_4da6_a3ce_929d_0e0e_4736),
            SpanId::from(0x00f0_67aa_0ba9_02b7),
            TraceFlags::SAMPLED,
            false,
        );
        let cx = Context::new().with_remote_span_context(span_context);

        let mut carrier = HashMap::new();
        propagator.inject_context(&cx, &mut carrier);
        assert_eq!(
            Extractor::get(&carrier, TRACEPARENT_HEADER),
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        );
    }

    #[test]
    fn inject_skips_invalid_context() {
        let propagator = TraceContextPropagator::new();
        let mut carrier: HashMap<String, String> = HashMap::new();
        propagator.inject_context(&Context::new(), &mut carrier);
        assert!(carrier.is_empty());
    }

    #[test]
    fn round_trip_preserves_identity() {
        let propagator = TraceContextPropagator::new();
        let span_context = SpanContext::new(
            TraceId::from(0xdead_beefu128),
            SpanId::from(0xcafeu64),
            TraceFlags::SAMPLED,
            false,
        );
        let cx = Context::new().with_remote_span_context(span_context.clone());

        let mut carrier = HashMap::new();
        propagator.inject_context(&cx, &mut carrier);
        let extracted = propagator.extract(&carrier);

        let remote = extracted.span_context().unwrap();
        assert_eq!(remote.trace_id(), span_context.trace_id());
        assert_eq!(remote.span_id(), span_context.span_id());
        assert!(remote.is_remote());
    }
}

//! Trace context comments via OpenTelemetry propagators.

use std::fmt;
use std::sync::Arc;

use opentelemetry::propagation::{Injector, TextMapPropagator};
use opentelemetry::{global, Context};

use crate::comments::SqlComments;
use crate::context::QueryContext;
use crate::provider::CommentProvider;

/// Adds trace correlation fields (`traceparent`, `tracestate`) to comments.
///
/// The OpenTelemetry context is taken from the [`QueryContext`] when one was
/// attached with [`QueryContext::with_trace_context`], otherwise from
/// `opentelemetry::Context::current()`. Fields are produced by the globally
/// registered text map propagator unless a propagator is supplied with
/// [`TraceCommenter::with_propagator`].
///
/// Nothing is emitted when there is no valid span in the context.
#[derive(Clone, Default)]
pub struct TraceCommenter {
    propagator: Option<Arc<dyn TextMapPropagator + Send + Sync>>,
}

impl TraceCommenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `propagator` instead of the global one.
    pub fn with_propagator<P>(propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        Self {
            propagator: Some(Arc::new(propagator)),
        }
    }

    fn inject(&self, cx: &Context) -> SqlComments {
        let mut carrier = CommentCarrier::default();
        match &self.propagator {
            Some(propagator) => propagator.inject_context(cx, &mut carrier),
            None => global::get_text_map_propagator(|propagator| {
                propagator.inject_context(cx, &mut carrier)
            }),
        }
        carrier.0
    }
}

impl CommentProvider for TraceCommenter {
    fn comments(&self, ctx: &QueryContext) -> SqlComments {
        match ctx.trace_context() {
            Some(cx) => self.inject(cx),
            None => self.inject(&Context::current()),
        }
    }
}

impl fmt::Debug for TraceCommenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceCommenter")
            .field("propagator", &self.propagator.as_ref().map_or("global", |_| "custom"))
            .finish()
    }
}

/// Propagation carrier collecting injected headers as comments.
#[derive(Default)]
struct CommentCarrier(SqlComments);

impl Injector for CommentCarrier {
    fn set(&mut self, key: &str, value: String) {
        // propagators emit `tracestate` even when it is empty
        if !value.is_empty() {
            self.0.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::keys;
    use opentelemetry::trace::{
        SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState,
    };
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    fn remote_context(state: TraceState) -> Context {
        let span_context = SpanContext::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            TraceFlags::SAMPLED,
            true,
            state,
        );
        Context::new().with_remote_span_context(span_context)
    }

    #[test]
    fn test_injects_traceparent() {
        let commenter = TraceCommenter::with_propagator(TraceContextPropagator::new());
        let ctx = QueryContext::new().with_trace_context(remote_context(TraceState::default()));

        let comments = commenter.comments(&ctx);

        assert_eq!(
            comments.get(keys::TRACEPARENT),
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        );
        assert!(!comments.contains_key(keys::TRACESTATE));
    }

    #[test]
    fn test_injects_tracestate() {
        let state = TraceState::from_key_value([("vendor", "abc")]).unwrap();
        let commenter = TraceCommenter::with_propagator(TraceContextPropagator::new());
        let ctx = QueryContext::new().with_trace_context(remote_context(state));

        let comments = commenter.comments(&ctx);

        assert_eq!(comments.get(keys::TRACESTATE), Some("vendor=abc"));
        assert_eq!(comments.len(), 2);
    }

    #[test]
    fn test_no_span_no_comments() {
        let commenter = TraceCommenter::with_propagator(TraceContextPropagator::new());
        let ctx = QueryContext::new().with_trace_context(Context::new());

        assert!(commenter.comments(&ctx).is_empty());
    }

    #[test]
    fn test_falls_back_to_current_context() {
        let commenter = TraceCommenter::with_propagator(TraceContextPropagator::new());
        let _guard = remote_context(TraceState::default()).attach();

        let comments = commenter.comments(&QueryContext::new());

        assert!(comments
            .get(keys::TRACEPARENT)
            .is_some_and(|tp| tp.starts_with("00-4bf92f3577b34da6a3ce929d0e0e4736-")));
    }
}

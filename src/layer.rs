//! `tracing-subscriber` integration.
//!
//! [`ScopeLayer`] wraps the layer that actually renders records (a `fmt`
//! layer, a JSON layer, ...) and adds the scoped enable decision in front
//! of it. Everything else is passed through untouched.

use std::any::TypeId;

use tracing::level_filters::LevelFilter;
use tracing::span;
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::handler::{Handler, HandlerOptions};
use crate::DIAG_TARGET;

/// A layer that filters the wrapped sink by scoped log levels.
pub struct ScopeLayer<L> {
    inner: L,
    handler: Handler,
}

impl<L> ScopeLayer<L> {
    /// Wrap `inner` with a new [`Handler`] built from `options`.
    pub fn new(inner: L, options: HandlerOptions) -> Self {
        Self::with_handler(inner, Handler::new(options))
    }

    /// Wrap `inner` with an existing handler, e.g. one using a custom resolver.
    pub fn with_handler(inner: L, handler: Handler) -> Self {
        Self { inner, handler }
    }

    /// Handle for reconfiguring the layer at runtime.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

/// True if `layer` is, or contains, a scope layer.
fn contains_scope<S, L>(layer: &L) -> bool
where
    S: Subscriber,
    L: Layer<S>,
{
    // SAFETY: the returned pointer is only tested for presence.
    unsafe { layer.downcast_raw(TypeId::of::<Handler>()) }.is_some()
}

impl<S, L> Layer<S> for ScopeLayer<L>
where
    S: Subscriber,
    L: Layer<S>,
{
    fn on_layer(&mut self, subscriber: &mut S) {
        if contains_scope::<S, L>(&self.inner) {
            panic!("ScopeLayer must not wrap another ScopeLayer");
        }
        self.inner.on_layer(subscriber);
    }

    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        // levels can change at any time, so never let the callsite cache a verdict
        if self.inner.register_callsite(metadata).is_never() {
            Interest::never()
        } else {
            Interest::sometimes()
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        // the handler's own diagnostics are not subject to its levels
        if self.handler.is_debug() && metadata.target() == DIAG_TARGET {
            return self.inner.enabled(metadata, ctx);
        }
        self.handler.decide(metadata) && self.inner.enabled(metadata, ctx)
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        self.inner.max_level_hint()
    }

    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        self.inner.on_new_span(attrs, id, ctx)
    }

    fn on_record(&self, span: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        self.inner.on_record(span, values, ctx)
    }

    fn on_follows_from(&self, span: &span::Id, follows: &span::Id, ctx: Context<'_, S>) {
        self.inner.on_follows_from(span, follows, ctx)
    }

    fn event_enabled(&self, event: &Event<'_>, ctx: Context<'_, S>) -> bool {
        self.inner.event_enabled(event, ctx)
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.inner.on_event(event, ctx)
    }

    fn on_enter(&self, id: &span::Id, ctx: Context<'_, S>) {
        self.inner.on_enter(id, ctx)
    }

    fn on_exit(&self, id: &span::Id, ctx: Context<'_, S>) {
        self.inner.on_exit(id, ctx)
    }

    fn on_close(&self, id: span::Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx)
    }

    fn on_id_change(&self, old: &span::Id, new: &span::Id, ctx: Context<'_, S>) {
        self.inner.on_id_change(old, new, ctx)
    }

    #[doc(hidden)]
    unsafe fn downcast_raw(&self, id: TypeId) -> Option<*const ()> {
        if id == TypeId::of::<Self>() {
            Some(self as *const Self as *const ())
        } else if id == TypeId::of::<Handler>() {
            Some(&self.handler as *const Handler as *const ())
        } else {
            self.inner.downcast_raw(id)
        }
    }
}

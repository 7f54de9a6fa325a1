//! Caller resolution for log calls.
//!
//! Tracing callsites carry their origin in static metadata, so resolving
//! "who logged this" is a lookup rather than a stack walk. The resolver is
//! a trait so tests and unusual setups can key scopes on something else.

use tracing::Metadata;

/// Where a log call came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallInfo<'a> {
    /// Module identifier used as the scope key. `None` when unknown.
    pub module: Option<&'a str>,
    pub file: Option<&'a str>,
    pub line: Option<u32>,
    /// Callsite name (event or span name).
    pub name: &'a str,
}

impl<'a> CallInfo<'a> {
    pub fn unknown() -> Self {
        Self::default()
    }

    /// `file:line` for diagnostics, when both are known.
    pub fn source(&self) -> Option<String> {
        match (self.file, self.line) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            _ => None,
        }
    }
}

/// Resolves the originating module of a callsite.
pub trait CallerResolver: Send + Sync {
    fn resolve<'a>(&'a self, metadata: &'a Metadata<'a>) -> CallInfo<'a>;
}

fn call_info<'a>(module: Option<&'a str>, metadata: &'a Metadata<'a>) -> CallInfo<'a> {
    CallInfo {
        module,
        file: metadata.file(),
        line: metadata.line(),
        name: metadata.name(),
    }
}

/// Keys scopes on the Rust module path of the callsite (`my_app::db`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ModulePathResolver;

impl CallerResolver for ModulePathResolver {
    fn resolve<'a>(&'a self, metadata: &'a Metadata<'a>) -> CallInfo<'a> {
        call_info(metadata.module_path(), metadata)
    }
}

/// Keys scopes on the callsite target, which defaults to the module path
/// but can be overridden with `target: "..."`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetResolver;

impl CallerResolver for TargetResolver {
    fn resolve<'a>(&'a self, metadata: &'a Metadata<'a>) -> CallInfo<'a> {
        call_info(Some(metadata.target()), metadata)
    }
}

/// Attributes every call to one fixed module.
#[derive(Debug, Clone, Default)]
pub struct FixedResolver(Option<String>);

impl FixedResolver {
    pub fn new(module: impl Into<String>) -> Self {
        Self(Some(module.into()))
    }

    pub fn unknown() -> Self {
        Self(None)
    }
}

impl CallerResolver for FixedResolver {
    fn resolve<'a>(&'a self, metadata: &'a Metadata<'a>) -> CallInfo<'a> {
        call_info(self.0.as_deref(), metadata)
    }
}

impl<R: CallerResolver + ?Sized> CallerResolver for std::sync::Arc<R> {
    fn resolve<'a>(&'a self, metadata: &'a Metadata<'a>) -> CallInfo<'a> {
        (**self).resolve(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::subscriber::Interest;
    use tracing::{span, Event, Subscriber};

    /// Records the metadata of the last event it sees.
    struct Capture(Arc<Mutex<Option<&'static Metadata<'static>>>>);

    impl Subscriber for Capture {
        fn register_callsite(&self, _: &'static Metadata<'static>) -> Interest {
            Interest::always()
        }
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
            span::Id::from_u64(1)
        }
        fn record(&self, _: &span::Id, _: &span::Record<'_>) {}
        fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}
        fn event(&self, event: &Event<'_>) {
            *self.0.lock().unwrap() = Some(event.metadata());
        }
        fn enter(&self, _: &span::Id) {}
        fn exit(&self, _: &span::Id) {}
    }

    fn capture(f: impl FnOnce()) -> &'static Metadata<'static> {
        let slot = Arc::new(Mutex::new(None));
        tracing::subscriber::with_default(Capture(slot.clone()), f);
        let metadata = slot.lock().unwrap().take();
        metadata.expect("an event was emitted")
    }

    #[test]
    fn test_module_path_resolver() {
        let metadata = capture(|| tracing::info!("hello"));
        let info = ModulePathResolver.resolve(metadata);
        assert_eq!(info.module, Some(module_path!()));
        assert_eq!(info.file, Some(file!()));
        assert!(info.source().unwrap().starts_with(file!()));
    }

    #[test]
    fn test_target_resolver() {
        let metadata = capture(|| tracing::warn!(target: "mod.a", "hello"));
        assert_eq!(TargetResolver.resolve(metadata).module, Some("mod.a"));
        assert_eq!(ModulePathResolver.resolve(metadata).module, Some(module_path!()));
    }

    #[test]
    fn test_fixed_resolver() {
        let metadata = capture(|| tracing::error!("hello"));
        assert_eq!(FixedResolver::new("x").resolve(metadata).module, Some("x"));
        assert_eq!(FixedResolver::unknown().resolve(metadata).module, None);
        assert_eq!(CallInfo::unknown().source(), None);
    }
}

//! Per-request context read by comment providers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use once_cell::sync::Lazy;

tokio::task_local! {
    static CURRENT: QueryContext;
}

static EMPTY: Lazy<QueryContext> = Lazy::new(QueryContext::default);

#[cfg(feature = "opentelemetry")]
const TRACE_CONTEXT_KEY: &str = "sqlcommenter.trace_context";

type Value = Arc<dyn Any + Send + Sync>;

/// Request-scoped values that providers turn into comments.
///
/// A context is immutable once built and cheap to clone, so it can be shared
/// by every query issued while serving one request. It reaches the
/// connection wrapper in one of two ways:
///
/// - bound explicitly with [`crate::Commented::with_context`], or
/// - ambiently, by running the request inside [`QueryContext::scope`].
///
/// An explicitly bound context takes precedence over the ambient one.
///
/// ```rust
/// use sea_orm_sqlcommenter::QueryContext;
///
/// let ctx = QueryContext::new()
///     .with_value("http.route", "/users".to_string())
///     .with_value("attempt", 3_u32);
///
/// assert_eq!(ctx.get_str("http.route"), Some("/users"));
/// assert_eq!(ctx.get::<u32>("attempt"), Some(&3));
/// assert_eq!(ctx.get_str("attempt"), None);
/// ```
#[derive(Clone, Default)]
pub struct QueryContext {
    values: Arc<HashMap<&'static str, Value>>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a context holding `value` under `key`, replacing any previous value.
    pub fn with_value<T>(mut self, key: &'static str, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Arc::make_mut(&mut self.values).insert(key, Arc::new(value));
        self
    }

    /// Look up a value of type `T`.
    ///
    /// Returns `None` when the key is absent or holds a different type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref::<T>()
    }

    /// Look up a string value stored as either `String` or `&'static str`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        let value = self.values.get(key)?;
        value
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| value.downcast_ref::<&'static str>().copied())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Attach an OpenTelemetry context for the trace commenter.
    ///
    /// Without one, the trace commenter falls back to
    /// `opentelemetry::Context::current()`.
    #[cfg(feature = "opentelemetry")]
    pub fn with_trace_context(self, cx: opentelemetry::Context) -> Self {
        self.with_value(TRACE_CONTEXT_KEY, cx)
    }

    #[cfg(feature = "opentelemetry")]
    pub fn trace_context(&self) -> Option<&opentelemetry::Context> {
        self.get::<opentelemetry::Context>(TRACE_CONTEXT_KEY)
    }

    /// Run `future` with this context as the ambient context of the task.
    ///
    /// Queries issued through a [`crate::Commented`] connection without a
    /// bound context read it from here.
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(self, future).await
    }

    /// Synchronous variant of [`QueryContext::scope`].
    pub fn sync_scope<F, R>(self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT.sync_scope(self, f)
    }

    /// Call `f` with the ambient context, or an empty one outside any scope.
    pub fn with_current<F, R>(f: F) -> R
    where
        F: Fn(&QueryContext) -> R,
    {
        CURRENT.try_with(|ctx| f(ctx)).unwrap_or_else(|_| f(&*EMPTY))
    }

    /// Clone of the ambient context, or an empty one outside any scope.
    pub fn current() -> QueryContext {
        Self::with_current(QueryContext::clone)
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("QueryContext").field("keys", &keys).finish()
    }
}

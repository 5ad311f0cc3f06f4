//! Comment providers.
//!
//! A provider turns the current [`QueryContext`] into comment pairs. Providers
//! run for every statement, so they must be cheap, side-effect free, and
//! never perform I/O. A provider that cannot produce a value simply leaves
//! the key out.

use std::fmt;
use std::sync::Arc;

use crate::comments::{keys, CommentKey, SqlComments};
use crate::context::QueryContext;
#[cfg(feature = "opentelemetry")]
use crate::trace::TraceCommenter;

/// Source of comment key/value pairs for a query.
///
/// Closures of the form `Fn(&QueryContext) -> SqlComments` implement this
/// trait, which is usually enough for one-off providers:
///
/// ```rust
/// use sea_orm_sqlcommenter::{CommentProvider, QueryContext, SqlComments};
///
/// let tenant = |ctx: &QueryContext| match ctx.get::<u64>("tenant_id") {
///     Some(id) => SqlComments::from([("tenant", id.to_string())]),
///     None => SqlComments::new(),
/// };
///
/// let ctx = QueryContext::new().with_value("tenant_id", 42_u64);
/// assert_eq!(tenant.comments(&ctx).get("tenant"), Some("42"));
/// ```
pub trait CommentProvider: Send + Sync {
    fn comments(&self, ctx: &QueryContext) -> SqlComments;
}

impl<F> CommentProvider for F
where
    F: Fn(&QueryContext) -> SqlComments + Send + Sync,
{
    fn comments(&self, ctx: &QueryContext) -> SqlComments {
        self(ctx)
    }
}

/// Emits the same comments for every query.
///
/// Use it for values that are constant for the lifetime of the process, such
/// as the application or framework name.
#[derive(Debug, Clone, Default)]
pub struct StaticCommenter {
    comments: SqlComments,
}

impl StaticCommenter {
    pub fn new(comments: SqlComments) -> Self {
        Self { comments }
    }

    pub fn comments_ref(&self) -> &SqlComments {
        &self.comments
    }
}

impl CommentProvider for StaticCommenter {
    fn comments(&self, _ctx: &QueryContext) -> SqlComments {
        self.comments.clone()
    }
}

/// Copies one string value from the context into a comment.
///
/// Emits nothing when the context key is missing or does not hold a string.
///
/// ```rust
/// use sea_orm_sqlcommenter::{CommentProvider, ContextMapper, QueryContext};
///
/// let mapper = ContextMapper::new("route", "http.route");
///
/// let ctx = QueryContext::new().with_value("http.route", "/users");
/// assert_eq!(mapper.comments(&ctx).get("route"), Some("/users"));
/// assert!(mapper.comments(&QueryContext::new()).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ContextMapper {
    comment_key: CommentKey,
    context_key: &'static str,
}

impl ContextMapper {
    pub fn new(comment_key: impl Into<CommentKey>, context_key: &'static str) -> Self {
        Self {
            comment_key: comment_key.into(),
            context_key,
        }
    }

    pub fn comment_key(&self) -> &str {
        &self.comment_key
    }

    pub fn context_key(&self) -> &'static str {
        self.context_key
    }
}

impl CommentProvider for ContextMapper {
    fn comments(&self, ctx: &QueryContext) -> SqlComments {
        match ctx.get_str(self.context_key) {
            Some(value) => SqlComments::from([(self.comment_key.as_str(), value)]),
            None => SqlComments::new(),
        }
    }
}

/// Emits `db_driver` with the name and version of this crate.
#[derive(Debug, Clone)]
pub struct DriverVersionCommenter {
    version: String,
}

impl DriverVersionCommenter {
    pub fn new() -> Self {
        Self::with_version(concat!(env!("CARGO_PKG_NAME"), ":", env!("CARGO_PKG_VERSION")))
    }

    /// Report a custom driver string instead of this crate's version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl Default for DriverVersionCommenter {
    fn default() -> Self {
        Self::new()
    }
}

impl CommentProvider for DriverVersionCommenter {
    fn comments(&self, _ctx: &QueryContext) -> SqlComments {
        SqlComments::from([(keys::DB_DRIVER, self.version.as_str())])
    }
}

/// One entry of a provider chain.
#[derive(Clone)]
pub enum Provider {
    Static(StaticCommenter),
    Context(ContextMapper),
    #[cfg(feature = "opentelemetry")]
    Trace(TraceCommenter),
    DriverVersion(DriverVersionCommenter),
    Custom(Arc<dyn CommentProvider>),
}

impl Provider {
    /// Wrap any provider implementation, including closures.
    pub fn custom<P>(provider: P) -> Self
    where
        P: CommentProvider + 'static,
    {
        Provider::Custom(Arc::new(provider))
    }

    /// Short name used in logs and configuration errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Provider::Static(_) => "static commenter",
            Provider::Context(_) => "context mapper",
            #[cfg(feature = "opentelemetry")]
            Provider::Trace(_) => "trace commenter",
            Provider::DriverVersion(_) => "driver version commenter",
            Provider::Custom(_) => "custom provider",
        }
    }
}

impl CommentProvider for Provider {
    fn comments(&self, ctx: &QueryContext) -> SqlComments {
        match self {
            Provider::Static(p) => p.comments(ctx),
            Provider::Context(p) => p.comments(ctx),
            #[cfg(feature = "opentelemetry")]
            Provider::Trace(p) => p.comments(ctx),
            Provider::DriverVersion(p) => p.comments(ctx),
            Provider::Custom(p) => p.comments(ctx),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Static(p) => f.debug_tuple("Static").field(p).finish(),
            Provider::Context(p) => f.debug_tuple("Context").field(p).finish(),
            #[cfg(feature = "opentelemetry")]
            Provider::Trace(p) => f.debug_tuple("Trace").field(p).finish(),
            Provider::DriverVersion(p) => f.debug_tuple("DriverVersion").field(p).finish(),
            Provider::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<StaticCommenter> for Provider {
    fn from(provider: StaticCommenter) -> Self {
        Provider::Static(provider)
    }
}

impl From<ContextMapper> for Provider {
    fn from(provider: ContextMapper) -> Self {
        Provider::Context(provider)
    }
}

#[cfg(feature = "opentelemetry")]
impl From<TraceCommenter> for Provider {
    fn from(provider: TraceCommenter) -> Self {
        Provider::Trace(provider)
    }
}

impl From<DriverVersionCommenter> for Provider {
    fn from(provider: DriverVersionCommenter) -> Self {
        Provider::DriverVersion(provider)
    }
}

impl From<SqlComments> for Provider {
    fn from(comments: SqlComments) -> Self {
        Provider::Static(StaticCommenter::new(comments))
    }
}

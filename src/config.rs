//! Configuration for SQL comment injection.

use crate::comments::{CommentKey, SqlComments};
use crate::provider::{ContextMapper, DriverVersionCommenter, Provider};
#[cfg(feature = "opentelemetry")]
use crate::trace::TraceCommenter;

/// Configuration options for SQL comment injection.
///
/// Providers are consulted in the order they were added. When two providers
/// emit the same key, the one added later wins.
///
/// # Example
///
/// ```rust
/// use sea_orm_sqlcommenter::{keys, CommenterConfig, SqlComments};
///
/// let config = CommenterConfig::default()
///     .with_comments(SqlComments::from([
///         (keys::APPLICATION, "bootcamp"),
///         (keys::FRAMEWORK, "axum"),
///     ]))
///     .with_context_mapper(keys::ROUTE, "http.route");
///
/// assert_eq!(config.providers.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct CommenterConfig {
    /// Ordered provider chain.
    /// Default: empty (statements are forwarded unchanged)
    pub providers: Vec<Provider>,

    /// Whether comments are appended at all.
    /// Default: `true`
    pub enabled: bool,

    /// Whether the generated comment text is attached to trace events.
    /// Default: `false` (comment values may carry request data)
    pub log_comments: bool,
}

impl Default for CommenterConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            enabled: true,
            log_comments: false,
        }
    }
}

impl CommenterConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the chain.
    pub fn with_provider(mut self, provider: impl Into<Provider>) -> Self {
        self.providers.push(provider.into());
        self
    }

    /// Append a provider emitting the same comments for every query.
    pub fn with_comments(self, comments: SqlComments) -> Self {
        self.with_provider(comments)
    }

    /// Append a provider copying the string at `context_key` into `comment_key`.
    pub fn with_context_mapper(
        self,
        comment_key: impl Into<CommentKey>,
        context_key: &'static str,
    ) -> Self {
        self.with_provider(ContextMapper::new(comment_key, context_key))
    }

    /// Append a provider adding `traceparent`/`tracestate` from OpenTelemetry.
    #[cfg(feature = "opentelemetry")]
    pub fn with_trace_context(self) -> Self {
        self.with_provider(TraceCommenter::new())
    }

    /// Append a provider adding `db_driver` with this crate's version.
    pub fn with_driver_version(self) -> Self {
        self.with_provider(DriverVersionCommenter::new())
    }

    /// Enable or disable comment injection.
    ///
    /// When disabled no provider runs and statements are forwarded unchanged.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enable or disable recording the comment text in trace events.
    ///
    /// **Warning**: comments can contain routes, identifiers and other request
    /// data. Only enable in development or controlled environments.
    pub fn with_comment_logging(mut self, enabled: bool) -> Self {
        self.log_comments = enabled;
        self
    }

    /// Create a development-friendly configuration that logs every comment.
    pub fn development() -> Self {
        Self {
            providers: Vec::new(),
            enabled: true,
            log_comments: true,
        }
    }

    /// Create a production-safe configuration.
    pub fn production() -> Self {
        Self {
            providers: Vec::new(),
            enabled: true,
            log_comments: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::keys;

    #[test]
    fn test_config_builder_keeps_order() {
        let config = CommenterConfig::default()
            .with_comments(SqlComments::from([(keys::APPLICATION, "api")]))
            .with_context_mapper(keys::ROUTE, "route")
            .with_driver_version();

        let kinds: Vec<_> = config.providers.iter().map(Provider::kind).collect();
        assert_eq!(
            kinds,
            ["static commenter", "context mapper", "driver version commenter"]
        );
        assert!(config.enabled);
        assert!(!config.log_comments);
    }

    #[test]
    fn test_development_config() {
        let config = CommenterConfig::development();
        assert!(config.log_comments);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_production_config() {
        let config = CommenterConfig::production().with_enabled(false);
        assert!(!config.log_comments);
        assert!(!config.enabled);
    }
}

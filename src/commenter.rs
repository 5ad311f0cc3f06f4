//! Frozen provider chain producing comment blocks.

use std::sync::Arc;

use crate::comments::SqlComments;
use crate::config::CommenterConfig;
use crate::context::QueryContext;
use crate::encoder;
use crate::error::{Error, Result};
use crate::provider::{CommentProvider, Provider};

/// An immutable provider chain plus the options it was built with.
///
/// Built once at startup and shared by every query; cloning only bumps a
/// reference count.
///
/// ```rust
/// use sea_orm_sqlcommenter::{keys, CommenterConfig, QueryContext, SqlCommenter, SqlComments};
///
/// let commenter = SqlCommenter::new(
///     CommenterConfig::default()
///         .with_comments(SqlComments::from([(keys::APPLICATION, "bootcamp")]))
///         .with_context_mapper(keys::ROUTE, "route"),
/// )?;
///
/// let ctx = QueryContext::new().with_value("route", "/users");
/// assert_eq!(
///     commenter.annotate("SELECT 1", &ctx).as_deref(),
///     Some("SELECT 1 /*application='bootcamp',route='%2Fusers'*/")
/// );
/// # Ok::<(), sea_orm_sqlcommenter::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SqlCommenter {
    providers: Arc<[Provider]>,
    enabled: bool,
    log_comments: bool,
}

impl SqlCommenter {
    /// Validate `config` and freeze its provider chain.
    ///
    /// Fails when a static commenter or context mapper declares an empty key.
    pub fn new(config: CommenterConfig) -> Result<Self> {
        for provider in &config.providers {
            validate(provider)?;
        }

        tracing::debug!(
            providers = config.providers.len(),
            enabled = config.enabled,
            "SQL commenter configured"
        );

        Ok(Self {
            providers: config.providers.into(),
            enabled: config.enabled,
            log_comments: config.log_comments,
        })
    }

    /// A commenter with no providers. It never changes a statement.
    pub fn disabled() -> Self {
        Self {
            providers: Arc::from(Vec::new()),
            enabled: false,
            log_comments: false,
        }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Collect the comments of every provider, later providers winning.
    pub fn comments(&self, ctx: &QueryContext) -> SqlComments {
        if !self.enabled {
            return SqlComments::new();
        }
        encoder::merge(self.providers.iter().map(|provider| provider.comments(ctx)))
    }

    /// Encoded comment block for `ctx`, or an empty string.
    pub fn comment(&self, ctx: &QueryContext) -> String {
        encoder::encode(&self.comments(ctx))
    }

    /// Append the comment block for `ctx` to `sql`.
    ///
    /// Returns `None` when there is nothing to append; the statement should
    /// then be forwarded as is.
    pub fn annotate(&self, sql: &str, ctx: &QueryContext) -> Option<String> {
        let comment = self.comment(ctx);
        if comment.is_empty() {
            tracing::trace!("No SQL comment to append");
            return None;
        }

        if self.log_comments {
            tracing::trace!(comment = %comment, "Appending SQL comment");
        } else {
            tracing::trace!(comment_len = comment.len(), "Appending SQL comment");
        }

        Some(format!("{sql} {comment}"))
    }
}

impl Default for SqlCommenter {
    fn default() -> Self {
        Self::disabled()
    }
}

impl TryFrom<CommenterConfig> for SqlCommenter {
    type Error = Error;

    fn try_from(config: CommenterConfig) -> Result<Self> {
        Self::new(config)
    }
}

fn validate(provider: &Provider) -> Result<()> {
    let empty_key = match provider {
        Provider::Static(p) => p.comments_ref().iter().any(|(key, _)| key.is_empty()),
        Provider::Context(p) => p.comment_key().is_empty(),
        _ => false,
    };

    if empty_key {
        return Err(Error::EmptyCommentKey {
            provider: provider.kind(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::keys;

    fn bootcamp() -> SqlCommenter {
        SqlCommenter::new(
            CommenterConfig::default()
                .with_comments(SqlComments::from([
                    ("app", "bootcamp"),
                    (keys::FRAMEWORK, "go-chi"),
                ]))
                .with_context_mapper(keys::ROUTE, "route"),
        )
        .unwrap()
    }

    #[test]
    fn test_scenario_static_and_context() {
        let ctx = QueryContext::new().with_value("route", "/users");

        assert_eq!(
            bootcamp().annotate("SELECT * FROM users", &ctx).as_deref(),
            Some("SELECT * FROM users /*app='bootcamp',framework='go-chi',route='%2Fusers'*/")
        );
    }

    #[test]
    fn test_missing_context_value_is_omitted() {
        assert_eq!(
            bootcamp()
                .annotate("SELECT * FROM users", &QueryContext::new())
                .as_deref(),
            Some("SELECT * FROM users /*app='bootcamp',framework='go-chi'*/")
        );
    }

    #[test]
    fn test_later_provider_wins() {
        let commenter = SqlCommenter::new(
            CommenterConfig::default()
                .with_comments(SqlComments::from([("k", "p1"), ("only_p1", "x")]))
                .with_comments(SqlComments::from([("k", "p2")])),
        )
        .unwrap();

        let comments = commenter.comments(&QueryContext::new());
        assert_eq!(comments.get("k"), Some("p2"));
        assert_eq!(comments.get("only_p1"), Some("x"));

        let reversed = SqlCommenter::new(
            CommenterConfig::default()
                .with_comments(SqlComments::from([("k", "p2")]))
                .with_comments(SqlComments::from([("k", "p1")])),
        )
        .unwrap();
        assert_eq!(reversed.comments(&QueryContext::new()).get("k"), Some("p1"));
    }

    #[test]
    fn test_empty_chain_is_noop() {
        let commenter = SqlCommenter::new(CommenterConfig::default()).unwrap();

        assert_eq!(commenter.comment(&QueryContext::new()), "");
        assert_eq!(commenter.annotate("SELECT 1", &QueryContext::new()), None);
    }

    #[test]
    fn test_disabled_skips_providers() {
        let commenter = SqlCommenter::new(
            CommenterConfig::default()
                .with_driver_version()
                .with_enabled(false),
        )
        .unwrap();

        assert!(!commenter.is_enabled());
        assert_eq!(commenter.annotate("SELECT 1", &QueryContext::new()), None);
        assert_eq!(SqlCommenter::default().annotate("SELECT 1", &QueryContext::new()), None);
    }

    #[test]
    fn test_deterministic_output() {
        let commenter = bootcamp();
        let ctx = QueryContext::new().with_value("route", "/users");

        let first = commenter.comment(&ctx);
        let second = commenter.clone().comment(&ctx);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_empty_keys() {
        let err = SqlCommenter::new(
            CommenterConfig::default().with_comments(SqlComments::from([("", "value")])),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::EmptyCommentKey {
                provider: "static commenter"
            }
        );

        let err = SqlCommenter::try_from(CommenterConfig::default().with_context_mapper("", "route"))
            .unwrap_err();
        assert_eq!(err.to_string(), "context mapper declares an empty comment key");
    }

    #[test]
    fn test_closure_provider_in_chain() {
        let commenter = SqlCommenter::new(CommenterConfig::default().with_provider(
            Provider::custom(|_: &QueryContext| SqlComments::from([(keys::ACTION, "list")])),
        ))
        .unwrap();

        assert_eq!(commenter.comment(&QueryContext::new()), "/*action='list'*/");
    }
}

//! # sea-orm-sqlcommenter
//!
//! [sqlcommenter](https://google.github.io/sqlcommenter/)-style SQL comments for SeaORM.
//!
//! This crate wraps a SeaORM connection and appends a comment block carrying
//! request metadata (application, route, trace context) to every statement,
//! so database logs, slow-query logs and APM tools can be correlated with the
//! request that issued the query.
//!
//! ```text
//! SELECT * FROM users /*application='bootcamp',route='%2Fusers',traceparent='00-...-01'*/
//! ```
//!
//! ## Features
//!
//! - **Drop-in Wrapper**: `Commented<C>` implements `ConnectionTrait`, `StreamTrait`
//!   and `TransactionTrait` for any wrapped connection that does
//! - **Ordered Providers**: static values, context lookups, trace context, or closures
//! - **Deterministic Output**: keys are always sorted, so identical inputs give identical bytes
//! - **Safe Escaping**: keys and values are percent-encoded; a value can never close the comment
//! - **Zero Overhead When Empty**: statements are forwarded untouched when there is nothing to add
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sea_orm::Database;
//! use sea_orm_sqlcommenter::{keys, CommenterConfig, CommentingExt, QueryContext, SqlCommenter};
//!
//! let commenter = SqlCommenter::new(
//!     CommenterConfig::default()
//!         .with_comments([(keys::APPLICATION, "bootcamp")].into())
//!         .with_context_mapper(keys::ROUTE, "http.route")
//!         .with_trace_context(),
//! )?;
//!
//! let db = Database::connect("postgres://localhost/mydb")
//!     .await?
//!     .with_commenter(commenter);
//!
//! // Per request: either bind the context explicitly...
//! let ctx = QueryContext::new().with_value("http.route", "/users");
//! let users = Users::find().all(&db.with_context(ctx.clone())).await?;
//!
//! // ...or make it ambient for everything the request does.
//! let users = ctx.scope(Users::find().all(&db)).await?;
//! ```
//!
//! ## Precedence
//!
//! Providers run in the order they were configured. When two providers emit
//! the same key, the later one wins.
//!
//! ## Statement Caching
//!
//! Per-request values such as trace ids make each statement text unique, which
//! defeats prepared-statement plan reuse in the underlying driver. This is an
//! accepted trade-off: the crate favours correlation over statement cache hit
//! rate and does not try to work around it.
//!
//! ## Well-known Keys
//!
//! | Key | Constant |
//! |-----|----------|
//! | `application` | [`keys::APPLICATION`] |
//! | `framework` | [`keys::FRAMEWORK`] |
//! | `route` | [`keys::ROUTE`] |
//! | `controller` | [`keys::CONTROLLER`] |
//! | `action` | [`keys::ACTION`] |
//! | `db_driver` | [`keys::DB_DRIVER`] |
//! | `traceparent` | [`keys::TRACEPARENT`] |
//! | `tracestate` | [`keys::TRACESTATE`] |

mod commenter;
mod comments;
mod config;
mod connection;
mod context;
pub mod encoder;
mod error;
mod provider;
#[cfg(feature = "opentelemetry")]
mod trace;

pub use commenter::SqlCommenter;
pub use comments::{keys, CommentKey, CommentValue, SqlComments};
pub use config::CommenterConfig;
pub use connection::{
    Commented, CommentedConnection, CommentedTransaction, CommentingExt, ContextConnection,
};
pub use context::QueryContext;
pub use error::{Error, Result};
pub use provider::{
    CommentProvider, ContextMapper, DriverVersionCommenter, Provider, StaticCommenter,
};
#[cfg(feature = "opentelemetry")]
pub use trace::TraceCommenter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        keys, CommentProvider, Commented, CommenterConfig, CommentingExt, QueryContext,
        SqlCommenter, SqlComments,
    };
}

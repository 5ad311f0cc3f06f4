//! Commenting database connection wrapper.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    ExecResult, IsolationLevel, QueryResult, Statement, StreamTrait, TransactionError,
    TransactionTrait,
};

use crate::commenter::SqlCommenter;
use crate::context::QueryContext;

/// A SeaORM connection that appends a SQL comment to every statement.
///
/// `Commented<C>` implements `ConnectionTrait`, `StreamTrait` and
/// `TransactionTrait` whenever the wrapped `C` does, making it a drop-in
/// replacement for `DatabaseConnection` (see [`CommentedConnection`]) and
/// `DatabaseTransaction` (see [`CommentedTransaction`]).
///
/// Every statement-text path (`execute`, `execute_unprepared`, `query_one`,
/// `query_all`, `stream`) asks the commenter for a comment block and appends
/// it after a single space. The comment is built when the returned future is
/// first polled, so an ambient context entered around the future is seen.
/// When the block is empty the statement is forwarded untouched. Everything
/// else is delegated as is, and errors come back from the wrapped connection
/// unchanged.
///
/// # Context
///
/// Providers read the [`QueryContext`] bound with [`Commented::with_context`]
/// or [`Commented::bind_context`]. Without a bound context the ambient one set
/// by [`QueryContext::scope`] is used, and outside any scope an empty context.
///
/// # Transactions
///
/// `TransactionTrait` hands back SeaORM's own `DatabaseTransaction`, so
/// statements run through it are not commented. Use
/// [`Commented::begin_commented`] or [`Commented::commented_transaction`] to
/// keep commenting inside a transaction.
///
/// # Statement caching
///
/// Comments that vary per request (trace ids, routes) make every statement
/// text distinct, so prepared-statement caches in the wrapped driver see each
/// of them as a new statement. This wrapper does not try to keep plan reuse
/// stable; keep per-request providers out of the chain where statement cache
/// hit rate matters more than correlation.
///
/// # Example
///
/// ```rust,ignore
/// use sea_orm::Database;
/// use sea_orm_sqlcommenter::{keys, CommenterConfig, CommentingExt, QueryContext, SqlCommenter};
///
/// let commenter = SqlCommenter::new(
///     CommenterConfig::default()
///         .with_comments([(keys::APPLICATION, "billing")].into())
///         .with_context_mapper(keys::ROUTE, "http.route"),
/// )?;
///
/// let db = Database::connect("postgres://localhost/mydb")
///     .await?
///     .with_commenter(commenter);
///
/// let ctx = QueryContext::new().with_value("http.route", "/invoices");
/// let invoices = Invoices::find().all(&db.with_context(ctx)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Commented<C> {
    inner: C,
    commenter: SqlCommenter,
    context: Option<QueryContext>,
}

/// A commenting wrapper around `DatabaseConnection`.
pub type CommentedConnection = Commented<DatabaseConnection>;

/// A commenting wrapper around `DatabaseTransaction`.
pub type CommentedTransaction = Commented<DatabaseTransaction>;

impl<C> Commented<C> {
    /// Wrap `inner` so that its statements carry comments from `commenter`.
    pub fn new(inner: C, commenter: SqlCommenter) -> Self {
        Self {
            inner,
            commenter,
            context: None,
        }
    }

    /// Get a reference to the wrapped connection.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn commenter(&self) -> &SqlCommenter {
        &self.commenter
    }

    /// The explicitly bound context, if any.
    pub fn context(&self) -> Option<&QueryContext> {
        self.context.as_ref()
    }

    /// Consume the wrapper and return the wrapped connection.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// A borrowing handle whose statements are commented with `ctx`.
    ///
    /// The connection itself is not cloned; the handle lives as long as the
    /// borrow of `self`.
    pub fn with_context(&self, ctx: QueryContext) -> ContextConnection<'_, C> {
        ContextConnection {
            conn: self,
            context: ctx,
        }
    }

    /// Bind `ctx` to this wrapper, consuming it.
    pub fn bind_context(mut self, ctx: QueryContext) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Wrap another connection with the same commenter, bound to `ctx` or
    /// else to this wrapper's own context.
    fn adopt<T>(&self, inner: T, ctx: Option<&QueryContext>) -> Commented<T> {
        Commented {
            inner,
            commenter: self.commenter.clone(),
            context: ctx.or(self.context.as_ref()).cloned(),
        }
    }

    /// Commented statement text, or `None` to forward `sql` as is.
    fn annotate(&self, sql: &str, ctx: Option<&QueryContext>) -> Option<String> {
        match ctx.or(self.context.as_ref()) {
            Some(ctx) => self.commenter.annotate(sql, ctx),
            None => QueryContext::with_current(|ctx| self.commenter.annotate(sql, ctx)),
        }
    }

    fn comment_statement(&self, mut stmt: Statement, ctx: Option<&QueryContext>) -> Statement {
        if let Some(sql) = self.annotate(&stmt.sql, ctx) {
            stmt.sql = sql;
        }
        stmt
    }
}

impl<C> Commented<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn execute_in(
        &self,
        stmt: Statement,
        ctx: Option<&QueryContext>,
    ) -> Result<ExecResult, DbErr> {
        let stmt = self.comment_statement(stmt, ctx);
        self.inner.execute(stmt).await
    }

    async fn execute_unprepared_in(
        &self,
        sql: &str,
        ctx: Option<&QueryContext>,
    ) -> Result<ExecResult, DbErr> {
        match self.annotate(sql, ctx) {
            Some(commented) => self.inner.execute_unprepared(&commented).await,
            None => self.inner.execute_unprepared(sql).await,
        }
    }

    async fn query_one_in(
        &self,
        stmt: Statement,
        ctx: Option<&QueryContext>,
    ) -> Result<Option<QueryResult>, DbErr> {
        let stmt = self.comment_statement(stmt, ctx);
        self.inner.query_one(stmt).await
    }

    async fn query_all_in(
        &self,
        stmt: Statement,
        ctx: Option<&QueryContext>,
    ) -> Result<Vec<QueryResult>, DbErr> {
        let stmt = self.comment_statement(stmt, ctx);
        self.inner.query_all(stmt).await
    }
}

impl<C> Commented<C>
where
    C: StreamTrait,
{
    fn stream_in<'a>(
        &'a self,
        stmt: Statement,
        ctx: Option<&'a QueryContext>,
    ) -> Pin<Box<dyn Future<Output = Result<C::Stream<'a>, DbErr>> + 'a + Send>> {
        Box::pin(async move {
            let stmt = self.comment_statement(stmt, ctx);
            self.inner.stream(stmt).await
        })
    }
}

impl<C> From<(C, SqlCommenter)> for Commented<C> {
    fn from((inner, commenter): (C, SqlCommenter)) -> Self {
        Self::new(inner, commenter)
    }
}

impl<C> AsRef<C> for Commented<C> {
    fn as_ref(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C> ConnectionTrait for Commented<C>
where
    C: ConnectionTrait + Send + Sync,
{
    fn get_database_backend(&self) -> DbBackend {
        self.inner.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.execute_in(stmt, None).await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.execute_unprepared_in(sql, None).await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.query_one_in(stmt, None).await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.query_all_in(stmt, None).await
    }

    fn support_returning(&self) -> bool {
        self.inner.support_returning()
    }

    fn is_mock_connection(&self) -> bool {
        self.inner.is_mock_connection()
    }
}

impl<C> StreamTrait for Commented<C>
where
    C: StreamTrait,
{
    type Stream<'a>
        = C::Stream<'a>
    where
        Self: 'a;

    fn stream<'a>(
        &'a self,
        stmt: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream<'a>, DbErr>> + 'a + Send>> {
        self.stream_in(stmt, None)
    }
}

fn uncommented_transaction() {
    tracing::debug!(
        "Transaction begun through TransactionTrait; its statements are not commented, \
         use begin_commented or commented_transaction instead"
    );
}

#[async_trait]
impl<C> TransactionTrait for Commented<C>
where
    C: TransactionTrait + Send + Sync,
{
    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        uncommented_transaction();
        self.inner.begin().await
    }

    async fn begin_with_config(
        &self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<DatabaseTransaction, DbErr> {
        uncommented_transaction();
        self.inner
            .begin_with_config(isolation_level, access_mode)
            .await
    }

    async fn transaction<F, T, E>(&self, callback: F) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        uncommented_transaction();
        self.inner.transaction(callback).await
    }

    async fn transaction_with_config<F, T, E>(
        &self,
        callback: F,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        uncommented_transaction();
        self.inner
            .transaction_with_config(callback, isolation_level, access_mode)
            .await
    }
}

impl<C> Commented<C>
where
    C: TransactionTrait + Send + Sync,
{
    /// Begin a transaction whose statements are commented like this connection's.
    pub async fn begin_commented(&self) -> Result<CommentedTransaction, DbErr> {
        let txn = self.inner.begin().await?;
        Ok(self.adopt(txn, None))
    }

    /// Like [`Commented::begin_commented`], with explicit isolation and access mode.
    pub async fn begin_commented_with_config(
        &self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<CommentedTransaction, DbErr> {
        let txn = self
            .inner
            .begin_with_config(isolation_level, access_mode)
            .await?;
        Ok(self.adopt(txn, None))
    }

    /// Run `callback` inside a commented transaction.
    ///
    /// Commits when the callback returns `Ok` and rolls back otherwise, with
    /// the same error shape as `TransactionTrait::transaction`.
    pub async fn commented_transaction<F, T, E>(
        &self,
        callback: F,
    ) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c CommentedTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        let txn = self
            .begin_commented()
            .await
            .map_err(TransactionError::Connection)?;
        run_commented(txn, callback).await
    }
}

async fn run_commented<F, T, E>(
    txn: CommentedTransaction,
    callback: F,
) -> Result<T, TransactionError<E>>
where
    F: for<'c> FnOnce(
            &'c CommentedTransaction,
        ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
        + Send,
    T: Send,
    E: std::fmt::Display + std::fmt::Debug + Send,
{
    let result = callback(&txn).await;
    match result {
        Ok(value) => {
            txn.commit().await.map_err(TransactionError::Connection)?;
            Ok(value)
        }
        Err(err) => {
            txn.rollback().await.map_err(TransactionError::Connection)?;
            Err(TransactionError::Transaction(err))
        }
    }
}

impl Commented<DatabaseTransaction> {
    /// Commit the wrapped transaction.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.inner.commit().await
    }

    /// Roll back the wrapped transaction.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.inner.rollback().await
    }
}

/// A [`Commented`] connection borrowed together with an explicit context.
///
/// Returned by [`Commented::with_context`]. It implements `ConnectionTrait`
/// and `StreamTrait`, so it can be passed wherever SeaORM expects a
/// connection, and every statement run through it is commented with the
/// bound context regardless of the ambient one.
#[derive(Debug)]
pub struct ContextConnection<'a, C> {
    conn: &'a Commented<C>,
    context: QueryContext,
}

impl<'a, C> ContextConnection<'a, C> {
    /// The wrapper this handle borrows.
    pub fn connection(&self) -> &'a Commented<C> {
        self.conn
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }
}

impl<C> ContextConnection<'_, C>
where
    C: TransactionTrait + Send + Sync,
{
    /// Begin a transaction commented with this handle's context.
    pub async fn begin_commented(&self) -> Result<CommentedTransaction, DbErr> {
        let txn = self.conn.inner.begin().await?;
        Ok(self.conn.adopt(txn, Some(&self.context)))
    }

    /// Like [`ContextConnection::begin_commented`], with explicit isolation and access mode.
    pub async fn begin_commented_with_config(
        &self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<CommentedTransaction, DbErr> {
        let txn = self
            .conn
            .inner
            .begin_with_config(isolation_level, access_mode)
            .await?;
        Ok(self.conn.adopt(txn, Some(&self.context)))
    }

    /// Run `callback` inside a transaction commented with this handle's context.
    pub async fn commented_transaction<F, T, E>(
        &self,
        callback: F,
    ) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c CommentedTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        let txn = self
            .begin_commented()
            .await
            .map_err(TransactionError::Connection)?;
        run_commented(txn, callback).await
    }
}

#[async_trait]
impl<C> ConnectionTrait for ContextConnection<'_, C>
where
    C: ConnectionTrait + Send + Sync,
{
    fn get_database_backend(&self) -> DbBackend {
        self.conn.inner.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.conn.execute_in(stmt, Some(&self.context)).await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.conn
            .execute_unprepared_in(sql, Some(&self.context))
            .await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.conn.query_one_in(stmt, Some(&self.context)).await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.conn.query_all_in(stmt, Some(&self.context)).await
    }

    fn support_returning(&self) -> bool {
        self.conn.inner.support_returning()
    }

    fn is_mock_connection(&self) -> bool {
        self.conn.inner.is_mock_connection()
    }
}

impl<C> StreamTrait for ContextConnection<'_, C>
where
    C: StreamTrait,
{
    type Stream<'b>
        = C::Stream<'b>
    where
        Self: 'b;

    fn stream<'b>(
        &'b self,
        stmt: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream<'b>, DbErr>> + 'b + Send>> {
        self.conn.stream_in(stmt, Some(&self.context))
    }
}

/// Extension trait for easy wrapping of database connections.
pub trait CommentingExt: Sized {
    /// Wrap this connection so its statements carry comments from `commenter`.
    fn with_commenter(self, commenter: SqlCommenter) -> Commented<Self>;
}

impl CommentingExt for DatabaseConnection {
    fn with_commenter(self, commenter: SqlCommenter) -> Commented<Self> {
        Commented::new(self, commenter)
    }
}

impl CommentingExt for DatabaseTransaction {
    fn with_commenter(self, commenter: SqlCommenter) -> Commented<Self> {
        Commented::new(self, commenter)
    }
}

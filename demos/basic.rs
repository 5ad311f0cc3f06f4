//! Basic example showing how to use sea-orm-sqlcommenter.
//!
//! Uses SeaORM's mock backend so it runs without a database and prints the
//! statements exactly as the driver received them.
//!
//! Run with: cargo run --example basic

use std::collections::BTreeMap;

use sea_orm::{ConnectionTrait, DbBackend, MockDatabase, MockExecResult, Statement, Value};
use sea_orm_sqlcommenter::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sea_orm_sqlcommenter=trace".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build the provider chain once at startup
    let commenter = SqlCommenter::new(
        CommenterConfig::development()
            .with_comments(SqlComments::from([
                (keys::APPLICATION, "bootcamp"),
                (keys::FRAMEWORK, "axum"),
            ]))
            .with_context_mapper(keys::ROUTE, "http.route")
            .with_driver_version(),
    )?;

    let db = MockDatabase::new(DbBackend::Postgres)
        .append_query_results([vec![BTreeMap::from([("id", Value::from(1_i32))])]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection()
        .with_commenter(commenter);

    // Option 1: bind the request context explicitly
    let ctx = QueryContext::new().with_value("http.route", "/users");
    db.with_context(ctx)
        .query_all(Statement::from_string(
            DbBackend::Postgres,
            "SELECT * FROM users",
        ))
        .await?;

    // Option 2: make it ambient for everything the request does
    QueryContext::new()
        .with_value("http.route", "/sessions/expire")
        .scope(db.execute_unprepared("DELETE FROM sessions WHERE expired"))
        .await?;

    for transaction in db.into_inner().into_transaction_log() {
        println!("{transaction:?}");
    }

    Ok(())
}

// src/database.rs
use std::str::FromStr;
use std::time::Instant;

use sqlx::{
    postgres::{PgArguments, PgConnectOptions, PgPoolOptions},
    query::Query,
    PgPool, Postgres,
};
use tracing::{error, info};

use crate::{config::DatabaseConfig, errors::VehicleApiError};

pub mod row;

pub use row::{ColumnValue, Row};

/// Bind parameter for [`Database::query`].
///
/// Parameters are sent typed, so a `NULL` carries the type of the slot it
/// fills. Integers go out as `INT8`, which Postgres narrows on assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null(SqlType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Type of a `NULL` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bool,
    Int,
    Float,
    Text,
}

/// Rows returned by a statement, in result-set order
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: u64,
}

/// Gateway to the Postgres database.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool that opens connections on first use.
    ///
    /// An unreachable server is reported by the first query, not here. A
    /// malformed URL is rejected immediately.
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, VehicleApiError> {
        let options = match &config.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| VehicleApiError::InvalidDatabaseUrl(e.to_string()))?,
            None => PgConnectOptions::new(),
        };

        info!(
            "Initializing database pool: host={}, port={}",
            options.get_host(),
            options.get_port()
        );

        let pool = PgPoolOptions::new().connect_lazy_with(options);
        Ok(Self::new(pool))
    }

    /// Run a statement with positional (`$1`, `$2`, ...) bind parameters
    pub async fn query(
        &self,
        text: &str,
        params: &[SqlParam],
    ) -> Result<QueryResult, VehicleApiError> {
        let start = Instant::now();

        match self.fetch(text, params).await {
            Ok(result) => {
                info!(
                    text,
                    duration_ms = start.elapsed().as_millis() as u64,
                    rows = result.row_count,
                    "executed query"
                );
                Ok(result)
            }
            Err(e) => {
                error!(message = %e, details = ?e, "query error");
                Err(e)
            }
        }
    }

    async fn fetch<'q>(
        &self,
        text: &'q str,
        params: &'q [SqlParam],
    ) -> Result<QueryResult, VehicleApiError> {
        let query = params.iter().fold(sqlx::query(text), bind_param);
        let pg_rows = query.fetch_all(&self.pool).await?;

        let rows = pg_rows
            .iter()
            .map(Row::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResult {
            row_count: rows.len() as u64,
            rows,
        })
    }

    /// Close every pooled connection, waiting for borrowed ones to return
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }
}

fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &'q SqlParam,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        SqlParam::Null(SqlType::Bool) => query.bind(None::<bool>),
        SqlParam::Null(SqlType::Int) => query.bind(None::<i64>),
        SqlParam::Null(SqlType::Float) => query.bind(None::<f64>),
        SqlParam::Null(SqlType::Text) => query.bind(None::<String>),
        SqlParam::Bool(value) => query.bind(*value),
        SqlParam::Int(value) => query.bind(*value),
        SqlParam::Float(value) => query.bind(*value),
        SqlParam::Text(value) => query.bind(value.as_str()),
    }
}

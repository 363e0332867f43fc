use diesel::{connection::SimpleConnection, sqlite::SqliteConnection};
use failure::Fail;
use quire_macros::From;
use r2d2::CustomizeConnection;
use r2d2_diesel::ConnectionManager;
use serde::Deserialize;
use std::{env, time::Duration};

pub mod functions;
pub mod models;
pub mod schema;
pub mod types;

/// A single connection to a database.
pub type Connection = SqliteConnection;

/// A pool of database connections.
pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// A single database connection taken from a [`Pool`] of connection.
pub type PooledConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

/// How long a connection waits for another writer to release the database
/// before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

embed_migrations!("migrations");

/// Database configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Path to the SQLite database file.
    pub url: String,
}

/// Find the correct database URL based on configuration and environment.
pub fn database_url(cfg: Option<&Config>) -> Result<String, GetDatabaseUrlError> {
    match env::var("DATABASE_URL") {
        Ok(url) => return Ok(url),
        Err(env::VarError::NotUnicode(_)) => {
            return Err(GetDatabaseUrlError::VarInvalidUnicode);
        }
        Err(env::VarError::NotPresent) => (),
    }

    if let Some(ref db) = cfg {
        return Ok(db.url.clone());
    }

    Err(GetDatabaseUrlError::NotConfigured)
}

#[derive(Debug, Fail)]
pub enum GetDatabaseUrlError {
    #[fail(display = "No database connection configured")]
    NotConfigured,
    #[fail(display = "DATABASE_URL contains invalid Unicode")]
    VarInvalidUnicode,
}

/// Create a new connection.
///
/// The connection is set up the same way pooled connections are, but pending
/// migrations are not applied.
pub fn connect(cfg: Option<&Config>) -> Result<Connection, ConnectionError> {
    use diesel::Connection;

    let url = database_url(cfg)?;
    let conn = SqliteConnection::establish(&url)?;
    conn.batch_execute(&pragmas()).map_err(ConnectionError::Setup)?;

    Ok(conn)
}

/// Create a connection pool for the configured database.
pub fn configure_pool(cfg: Option<&Config>) -> Result<Pool, ConnectionError> {
    build_pool(&database_url(cfg)?)
}

/// Create a connection pool for the database at `url`, and bring its schema
/// up to date.
pub fn build_pool(url: &str) -> Result<Pool, ConnectionError> {
    let pool = Pool::builder()
        .connection_customizer(Box::new(Pragmas))
        .build(ConnectionManager::new(url))?;

    // Try to connect to database to detect errors early.
    let conn = pool.get()?;
    run_migrations(&conn)?;

    Ok(pool)
}

/// Apply all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ConnectionError> {
    embedded_migrations::run(conn).map_err(ConnectionError::Migration)
}

fn pragmas() -> String {
    format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
        BUSY_TIMEOUT.as_millis(),
    )
}

/// Set up every connection taken out of the pool.
#[derive(Debug)]
struct Pragmas;

impl CustomizeConnection<SqliteConnection, r2d2_diesel::Error> for Pragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection)
    -> Result<(), r2d2_diesel::Error> {
        conn.batch_execute(&pragmas()).map_err(r2d2_diesel::Error::QueryError)
    }
}

#[derive(Debug, Fail, From)]
pub enum ConnectionError {
    #[fail(display = "{}", _0)]
    Configuration(#[cause] #[from] GetDatabaseUrlError),
    #[fail(display = "{}", _0)]
    Pool(#[cause] #[from] r2d2::Error),
    #[fail(display = "{}", _0)]
    Database(#[cause] #[from] diesel::ConnectionError),
    #[fail(display = "could not set up connection: {}", _0)]
    Setup(#[cause] diesel::result::Error),
    #[fail(display = "could not perform migrations: {}", _0)]
    Migration(#[cause] diesel_migrations::RunMigrationsError),
}

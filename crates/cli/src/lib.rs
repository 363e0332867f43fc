use failure::Error;
use quire_models::db::{self, Connection};
use structopt::StructOpt;

mod category;
mod config;
mod server;
mod user;
mod util;

use self::config::Config;

pub type Result<T, E=Error> = std::result::Result<T, E>;

#[derive(StructOpt)]
#[structopt(name = "quire")]
struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Manage server
    #[structopt(name = "server")]
    Server(server::Opts),
    /// Manage users
    #[structopt(name = "user")]
    User(user::Opts),
    /// Manage categories
    #[structopt(name = "category")]
    Category(category::Opts),
}

pub fn main() -> Result<(), Error> {
    let opts = Opts::from_args();
    let config = crate::config::load()?;

    setup_logging(&config.logging)?;

    match opts.command {
        Command::Server(opts) => server::main(config, opts),
        Command::User(opts) => user::main(&config, opts),
        Command::Category(opts) => category::main(&config, opts),
    }
}

fn setup_logging(config: &crate::config::Logging) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level);

    if let Some(level) = config.network {
        builder.filter_module("actix_web", level);
    }

    for (module, level) in &config.filters {
        builder.filter_module(module, *level);
    }

    // RUST_LOG takes precedence over the configuration file.
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.try_init()?;

    Ok(())
}

/// Open a connection for an administrative command, bringing the schema up
/// to date first.
fn connect(config: &Config) -> Result<Connection> {
    let db = db::connect(config.model.database.as_ref())?;
    db::run_migrations(&db)?;
    Ok(db)
}

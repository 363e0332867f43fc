//! Server administration.

use actix::System;
use actix_web::{App, HttpServer, middleware::{Compress, Logger}};
use failure::Error;
use structopt::StructOpt;

use crate::Config;

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Start the server
    #[structopt(name = "start")]
    Start,
}

pub fn main(cfg: Config, opts: Opts) -> Result<(), Error> {
    match opts.command {
        Command::Start => start(cfg),
    }
}

pub fn start(config: Config) -> Result<(), Error> {
    let system = System::new("quire");

    let pool = quire_models::db::configure_pool(config.model.database.as_ref())?;
    let chapters = config.model.chapters.clone();

    let address = config.server.address;
    let domain = config.server.domain.clone();

    let server = HttpServer::new(move ||
        App::new()
            .hostname(&config.server.domain)
            .data(pool.clone())
            .data(chapters.clone())
            .wrap(Logger::default())
            .wrap(Compress::default())
            .configure(quire_rest_api::configure)
    );

    let server = if let Some(fd) = listenfd::ListenFd::from_env().take_tcp_listener(0)? {
        server.listen(fd)?
    } else {
        server.bind(address)?
    };

    log::info!("Listening on {}", address);

    server
        .server_hostname(domain)
        .start();

    system.run()?;

    Ok(())
}

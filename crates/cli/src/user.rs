//! Commands for managing users.

use quire_models::User;
use structopt::StructOpt;

use crate::{Config, Result};
use super::util::print_table;

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List all users
    #[structopt(name = "list")]
    List,
    /// Add a new user
    #[structopt(name = "add")]
    Add(AddOpts),
    /// Grant coins to a user
    #[structopt(name = "grant")]
    Grant(GrantOpts),
    /// Make one user follow another
    #[structopt(name = "follow")]
    Follow(FollowOpts),
}

pub fn main(cfg: &Config, opts: Opts) -> Result<()> {
    match opts.command {
        Command::List => list(cfg),
        Command::Add(opts) => add_user(cfg, opts),
        Command::Grant(opts) => grant(cfg, opts),
        Command::Follow(opts) => follow(cfg, opts),
    }
}

pub fn list(cfg: &Config) -> Result<()> {
    let db = crate::connect(cfg)?;
    let users = User::all(&db)?;

    let rows = users.iter()
        .map(|user| vec![
            user.id.to_string(),
            user.penname.clone(),
            user.name.clone(),
            user.coin().to_string(),
        ])
        .collect::<Vec<_>>();

    print_table(&["ID", "Penname", "Name", "Coin"], &rows);

    Ok(())
}

#[derive(StructOpt)]
pub struct AddOpts {
    /// User's penname
    penname: String,
    /// User's display name
    name: String,
}

pub fn add_user(cfg: &Config, opts: AddOpts) -> Result<()> {
    let db = crate::connect(cfg)?;
    let user = User::create(&db, &opts.penname, &opts.name)?;

    println!("Created user {}", user.id);

    Ok(())
}

#[derive(StructOpt)]
pub struct GrantOpts {
    /// Penname of the user receiving coins
    penname: String,
    /// Number of coins to grant
    amount: i64,
}

pub fn grant(cfg: &Config, opts: GrantOpts) -> Result<()> {
    let db = crate::connect(cfg)?;
    let mut user = User::by_penname(&db, &opts.penname)?;

    user.grant_coins(&db, opts.amount)?;

    println!("{} now has {} coins", user.penname, user.coin());

    Ok(())
}

#[derive(StructOpt)]
pub struct FollowOpts {
    /// Penname of the follower
    penname: String,
    /// Penname of the user to follow
    target: String,
}

pub fn follow(cfg: &Config, opts: FollowOpts) -> Result<()> {
    let db = crate::connect(cfg)?;
    let user = User::by_penname(&db, &opts.penname)?;
    let target = User::by_penname(&db, &opts.target)?;

    user.follow(&db, &target)?;

    println!("{} now follows {}", user.penname, target.penname);

    Ok(())
}

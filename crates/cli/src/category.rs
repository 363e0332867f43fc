//! Commands for managing book categories.

use quire_models::{Category, Model};
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
    /// List all categories
    #[structopt(name = "list")]
    List,
    /// Add a new category
    #[structopt(name = "add")]
    Add {
        /// Category name
        name: String,
    },
}

pub fn main(cfg: &Config, opts: Opts) -> Result<()> {
    let db = crate::connect(cfg)?;

    match opts.command {
        Command::List => {
            let rows = Category::all(&db)?
                .into_iter()
                .map(|category| vec![category.id().to_string(), category.name().to_string()])
                .collect::<Vec<_>>();

            print_table(&["ID", "Name"], &rows);
        }
        Command::Add { name } => {
            let category = Category::create(&db, &name)?;
            println!("Created category {}", category.id());
        }
    }

    Ok(())
}

//! Category CLI commands

use clap::Subcommand;

use super::print_json;
use crate::display::format_category_list;
use crate::error::LedgerResult;
use crate::services::CategoryService;
use crate::storage::Storage;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    #[command(alias = "add")]
    Create {
        /// Category name
        name: String,
        /// Parent category name or ID
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// List categories
    List {
        /// Print JSON instead of a list
        #[arg(long)]
        json: bool,
    },
}

/// Handle a category command
pub fn handle_category_command(storage: &Storage, cmd: CategoryCommands) -> LedgerResult<()> {
    let service = CategoryService::new(storage);

    match cmd {
        CategoryCommands::Create { name, parent } => {
            let parent = match parent {
                Some(parent) => Some(service.resolve(&parent)?),
                None => None,
            };
            let category = service.create(&name, parent.as_ref().map(|p| p.id))?;

            match parent {
                Some(parent) => println!(
                    "Created category: {} (under {}) [{}]",
                    category.name, parent.name, category.id
                ),
                None => println!("Created category: {} [{}]", category.name, category.id),
            }
        }

        CategoryCommands::List { json } => {
            let categories = service.list()?;
            if json {
                print_json(&categories)?;
            } else {
                print!("{}", format_category_list(&categories));
            }
        }
    }

    Ok(())
}

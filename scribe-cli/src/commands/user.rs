//! User command - add, show, list and remove users

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scribe_orm::{Database, Entity, FindOptions, Limit, Model};
use serde_json::json;
use tracing::info;

use super::print_json;
use crate::models::User;

#[derive(Parser, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a user and print it
    Add {
        /// Display name
        #[arg(long)]
        name: String,
        /// Login email
        #[arg(long)]
        email: String,
        /// Password hash as stored
        #[arg(long)]
        passwd: String,
        /// Avatar URL
        #[arg(long, default_value = "about:blank")]
        image: String,
        /// Grant admin rights
        #[arg(long)]
        admin: bool,
        /// Explicit id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Show one user by id
    Get {
        /// User id
        id: String,
    },
    /// List users, newest first
    List {
        /// Row limit: "N" or "OFFSET,N"
        #[arg(long, short = 'n')]
        limit: Option<Limit>,
    },
    /// Remove a user by id
    Remove {
        /// User id
        id: String,
    },
}

pub async fn run_user(args: UserArgs, db: &Database) -> Result<()> {
    let users = User::schema()?;

    match args.command {
        UserCommand::Add {
            name,
            email,
            passwd,
            image,
            admin,
            id,
        } => {
            let mut user = Entity::new(users)
                .with("name", name)?
                .with("email", email)?
                .with("passwd", passwd)?
                .with("image", image)?
                .with("admin", admin)?;
            if let Some(id) = id {
                user.set("id", id)?;
            }
            user.save(db).await.context("Failed to save user")?;
            info!("saved user {}", user.value("id")?);
            print_json(&user)
        }
        UserCommand::Get { id } => match Entity::find(db, &users, id.as_str()).await? {
            Some(user) => print_json(&user),
            None => bail!("No user with id '{}'", id),
        },
        UserCommand::List { limit } => {
            let mut opts = FindOptions::new().order_by("created_at desc");
            if let Some(limit) = limit {
                opts = opts.limit(limit);
            }
            let found = Entity::find_all(db, &users, &opts).await?;
            print_json(&found)
        }
        UserCommand::Remove { id } => {
            let Some(user) = Entity::find(db, &users, id.as_str()).await? else {
                bail!("No user with id '{}'", id);
            };
            let removed = user.remove(db).await?;
            print_json(&json!({ "removed": removed }))
        }
    }
}

//! Blog command - list blog posts

use anyhow::Result;
use clap::{Parser, Subcommand};
use scribe_orm::{Database, Entity, FindOptions, Limit, Model};

use super::print_json;
use crate::models::Blog;

#[derive(Parser, Debug)]
pub struct BlogArgs {
    #[command(subcommand)]
    pub command: BlogCommand,
}

#[derive(Subcommand, Debug)]
pub enum BlogCommand {
    /// List blog posts, newest first
    List {
        /// Only posts written by this user id
        #[arg(long)]
        user: Option<String>,
        /// Row limit: "N" or "OFFSET,N"
        #[arg(long, short = 'n')]
        limit: Option<Limit>,
    },
}

pub async fn run_blog(args: BlogArgs, db: &Database) -> Result<()> {
    let blogs = Blog::schema()?;

    match args.command {
        BlogCommand::List { user, limit } => {
            let mut opts = FindOptions::new().order_by("created_at desc");
            if let Some(user) = user {
                opts = opts.filter("user_id=?", [user]);
            }
            if let Some(limit) = limit {
                opts = opts.limit(limit);
            }
            let found = Entity::find_all(db, &blogs, &opts).await?;
            print_json(&found)
        }
    }
}

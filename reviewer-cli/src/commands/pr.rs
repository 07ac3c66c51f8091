//! Pull request commands

use clap::{Args, Subcommand};
use reviewer_core::PrStatus;

use super::{print_json, Engine};

/// Pull request commands
#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommand,
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// Open a pull request and assign reviewers from the author's team
    Create {
        /// Title
        title: String,

        /// Author's user identifier
        #[arg(short, long)]
        author: String,

        /// Pull request identifier (required in external id mode)
        #[arg(long)]
        id: Option<String>,
    },

    /// List pull requests, newest first
    List {
        /// OPEN or MERGED
        #[arg(short, long)]
        status: Option<PrStatus>,
    },

    /// Show a pull request with its reviewers
    Show {
        /// Pull request identifier
        id: String,
    },

    /// Merge a pull request (no-op when already merged)
    Merge {
        /// Pull request identifier
        id: String,
    },

    /// Replace one reviewer with another member of their team
    Reassign {
        /// Pull request identifier
        id: String,

        /// Reviewer to replace
        #[arg(short, long)]
        reviewer: String,
    },

    /// Pull requests a user is reviewing
    Assigned {
        /// User identifier
        user: String,

        /// OPEN or MERGED
        #[arg(short, long)]
        status: Option<PrStatus>,
    },
}

impl PrArgs {
    /// Execute the pull request command
    pub async fn execute(self, engine: &Engine) -> anyhow::Result<()> {
        let prs = &engine.pull_requests;
        match self.command {
            PrCommand::Create { title, author, id } => {
                print_json(&prs.create(&title, &author, id).await?)
            }
            PrCommand::List { status } => print_json(&prs.list(status).await?),
            PrCommand::Show { id } => print_json(&prs.get(&id).await?),
            PrCommand::Merge { id } => print_json(&prs.merge(&id).await?),
            PrCommand::Reassign { id, reviewer } => {
                print_json(&prs.reassign(&id, &reviewer).await?)
            }
            PrCommand::Assigned { user, status } => {
                print_json(&prs.list_assigned(&user, status).await?)
            }
        }
    }
}

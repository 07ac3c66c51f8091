//! Team commands

use clap::{Args, Subcommand};

use super::{print_json, Engine};

/// Team management commands
#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Create a team
    Create {
        /// Unique team name
        name: String,

        /// Team identifier (required in external id mode)
        #[arg(long)]
        id: Option<String>,
    },

    /// List teams, oldest first
    List,

    /// Show a team
    Show {
        /// Team identifier
        id: String,
    },
}

impl TeamArgs {
    /// Execute the team command
    pub async fn execute(self, engine: &Engine) -> anyhow::Result<()> {
        match self.command {
            TeamCommand::Create { name, id } => {
                print_json(&engine.teams.create(&name, id).await?)
            }
            TeamCommand::List => print_json(&engine.teams.list().await?),
            TeamCommand::Show { id } => print_json(&engine.teams.get(&id).await?),
        }
    }
}

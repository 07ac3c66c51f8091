//! Statistics commands

use clap::{Args, Subcommand};

use super::{print_json, Engine};

/// Review load statistics
#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(subcommand)]
    pub command: StatsCommand,
}

#[derive(Subcommand, Debug)]
pub enum StatsCommand {
    /// Assignments per user, including users with none
    Users {
        /// Only users of this team
        #[arg(short, long)]
        team: Option<String>,
    },

    /// Reviewer count per pull request
    Prs {
        /// Only pull requests authored in this team
        #[arg(short, long)]
        team: Option<String>,
    },
}

impl StatsArgs {
    /// Execute the stats command
    pub async fn execute(self, engine: &Engine) -> anyhow::Result<()> {
        match self.command {
            StatsCommand::Users { team } => {
                print_json(&engine.stats.by_user(team.as_deref()).await?)
            }
            StatsCommand::Prs { team } => print_json(&engine.stats.by_pr(team.as_deref()).await?),
        }
    }
}

//! User commands

use clap::{Args, Subcommand};
use reviewer_core::UserUpdate;

use super::{print_json, Engine};

/// User management commands
#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Add a user to a team
    Create {
        /// Display name
        name: String,

        /// Owning team identifier
        #[arg(short, long)]
        team: String,

        /// Create the user as inactive
        #[arg(long)]
        inactive: bool,

        /// User identifier (required in external id mode)
        #[arg(long)]
        id: Option<String>,
    },

    /// List users, oldest first
    List {
        /// Only users of this team
        #[arg(short, long)]
        team: Option<String>,

        /// Only active (true) or inactive (false) users
        #[arg(long)]
        active: Option<bool>,
    },

    /// Show a user
    Show {
        /// User identifier
        id: String,
    },

    /// Rename or (de)activate a user
    ///
    /// Deactivating hands the user's open reviews to teammates.
    Update {
        /// User identifier
        id: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// New active flag
        #[arg(long)]
        active: Option<bool>,
    },

    /// Deactivate several users of one team at once
    Deactivate {
        /// Team the users belong to
        #[arg(short, long)]
        team: String,

        /// User identifiers
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl UserArgs {
    /// Execute the user command
    pub async fn execute(self, engine: &Engine) -> anyhow::Result<()> {
        match self.command {
            UserCommand::Create {
                name,
                team,
                inactive,
                id,
            } => print_json(&engine.users.create(&team, &name, !inactive, id).await?),
            UserCommand::List { team, active } => {
                print_json(&engine.users.list(team.as_deref(), active).await?)
            }
            UserCommand::Show { id } => print_json(&engine.users.get(&id).await?),
            UserCommand::Update { id, name, active } => {
                let update = UserUpdate {
                    name,
                    is_active: active,
                };
                print_json(&engine.users.update(&id, update).await?)
            }
            UserCommand::Deactivate { team, ids } => {
                print_json(&engine.bulk.deactivate(&team, &ids).await?)
            }
        }
    }
}

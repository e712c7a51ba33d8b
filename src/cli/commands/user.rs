use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::services::UserService;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a back-office account")]
    Create {
        #[arg(help = "Login email")]
        email: String,
        #[arg(long, env = "CMS_USER_PASSWORD", help = "Initial password")]
        password: String,
        #[arg(long, default_value = "", help = "Display name")]
        name: String,
        #[arg(long, default_value = "admin", value_parser = ["admin", "editor", "viewer"])]
        role: String,
    },

    #[command(about = "Set a new password for an existing account")]
    Password {
        #[arg(help = "Login email")]
        email: String,
        #[arg(long, env = "CMS_USER_PASSWORD", help = "New password")]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let users = UserService::new(connect().await?);

    match cmd {
        UserCommands::Create { email, password, name, role } => {
            let user = users.create(&email, &password, &name, &role).await?;
            output_success(
                &output_format,
                &format!("Created {} user {} (id {})", user.role, user.email, user.id),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::Password { email, password } => {
            users.set_password(&email, &password).await?;
            output_success(&output_format, &format!("Password changed for {email}"), None)
        }
    }
}

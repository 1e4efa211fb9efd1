use anyhow::{bail, Context};
use bookstore_app::modules::auth::{
    models::normalize_email,
    repository::{RoleRepository, UserRepository},
};
use bookstore_authz::RoleName;
use bookstore_kernel::Settings;
use clap::{Parser, Subcommand};

/// Operate the bookstore backend.
#[derive(Debug, Parser)]
#[command(name = "bookstore-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate the database and serve the HTTP API until Ctrl-C
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print a bearer token for an existing user
    IssueToken {
        #[arg(long)]
        email: String,
    },
    /// Grant the ADMIN role to an existing user
    GrantAdmin {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load bookstore settings")?;
    bookstore_app::init_telemetry(&settings.telemetry)?;

    match cli.command {
        Command::Serve => bookstore_app::bootstrap(settings).await?.serve().await,
        Command::Migrate => {
            let applied = bookstore_app::migrate(&settings).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::IssueToken { email } => {
            let app = bookstore_app::bootstrap(settings).await?;
            let email = normalize_email(&email);
            let users = UserRepository::new(app.state.db.clone());
            if users.find_by_email(&email).await?.is_none() {
                bail!("no user with email {email}");
            }
            let token = app.state.tokens.generate(&email)?;
            println!("{token}");
            Ok(())
        }
        Command::GrantAdmin { email } => {
            let app = bookstore_app::bootstrap(settings).await?;
            let email = normalize_email(&email);
            let admin = RoleRepository::new(app.state.db.clone())
                .find_by_name(RoleName::Admin)
                .await?
                .context("role ADMIN is not seeded")?;
            if !UserRepository::new(app.state.db.clone()).add_role(&email, &admin).await? {
                bail!("no user with email {email}");
            }
            tracing::info!(%email, "ADMIN role granted");
            println!("granted ADMIN to {email}");
            Ok(())
        }
    }
}

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "mobsync",
    about = "One-way directory sync into the MobEdu school platform",
    version
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "mobsync.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Log in and show the schools the account administers
    Check,
    /// Import users and classes from the configured directory
    Import,
    /// Replace a remote user's password
    SetPassword {
        /// Login of the remote user
        login: String,
        /// New password
        #[arg(long)]
        password: String,
    },
    /// Delete a remote user
    DeleteUser {
        /// Login of the remote user
        login: String,
    },
    /// Delete a class and its group
    DeleteClass {
        /// Class label as the directory writes it, e.g. "10 B"
        label: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(&cli.config, force)?;
        }
        Commands::Check => {
            commands::check::run(&cli.config).await?;
        }
        Commands::Import => {
            commands::import::run(&cli.config).await?;
        }
        Commands::SetPassword { login, password } => {
            commands::passwords::run(&cli.config, &login, &password).await?;
        }
        Commands::DeleteUser { login } => {
            commands::delete::user(&cli.config, &login).await?;
        }
        Commands::DeleteClass { label } => {
            commands::delete::class(&cli.config, &label).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_parse_init_defaults() {
        let cli = Cli::parse_from(["mobsync", "init"]);
        assert_eq!(cli.config, "mobsync.toml");
        match cli.command {
            Commands::Init { force } => assert!(!force),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parse_init_force_with_config() {
        let cli = Cli::parse_from(["mobsync", "--config", "/etc/mobsync.toml", "init", "--force"]);
        assert_eq!(cli.config, "/etc/mobsync.toml");
        match cli.command {
            Commands::Init { force } => assert!(force),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parse_check() {
        let cli = Cli::parse_from(["mobsync", "check"]);
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn cli_parse_import() {
        let cli = Cli::parse_from(["mobsync", "import"]);
        assert!(matches!(cli.command, Commands::Import));
    }

    #[test]
    fn cli_parse_set_password() {
        let cli = Cli::parse_from(["mobsync", "set-password", "jdoe", "--password", "s3cret"]);
        match cli.command {
            Commands::SetPassword { login, password } => {
                assert_eq!(login, "jdoe");
                assert_eq!(password, "s3cret");
            }
            _ => panic!("expected SetPassword command"),
        }
    }

    #[test]
    fn cli_parse_set_password_requires_password() {
        let result = Cli::try_parse_from(["mobsync", "set-password", "jdoe"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parse_delete_user() {
        let cli = Cli::parse_from(["mobsync", "delete-user", "jdoe"]);
        match cli.command {
            Commands::DeleteUser { login } => assert_eq!(login, "jdoe"),
            _ => panic!("expected DeleteUser command"),
        }
    }

    #[test]
    fn cli_parse_delete_class() {
        let cli = Cli::parse_from(["mobsync", "delete-class", "10 B"]);
        match cli.command {
            Commands::DeleteClass { label } => assert_eq!(label, "10 B"),
            _ => panic!("expected DeleteClass command"),
        }
    }
}

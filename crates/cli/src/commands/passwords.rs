use super::{connect, load_config};

/// Run the `set-password` command.
pub async fn run(config_path: &str, login: &str, password: &str) -> anyhow::Result<()> {
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    let config = load_config(config_path)?;
    let mut client = connect(&config).await?;

    if !client.users().set_password(login, password).await? {
        anyhow::bail!("the server rejected the password change for {login}");
    }
    println!("Password changed for {login}.");
    Ok(())
}

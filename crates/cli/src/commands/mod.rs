pub mod check;
pub mod delete;
pub mod import;
pub mod init;
pub mod passwords;

use std::path::Path;

use mobsync_core::config::MobSyncConfig;
use mobsync_mobedu::client::MobEduClient;
use tracing::info;

/// Load and validate the configuration file.
pub fn load_config(config_path: &str) -> anyhow::Result<MobSyncConfig> {
    let config = MobSyncConfig::load(Path::new(config_path))?;
    config.validate()?;
    info!("Loaded configuration from {}", config_path);
    Ok(config)
}

/// Log in to MobEdu and apply the configured managed school, if any.
pub async fn connect(config: &MobSyncConfig) -> anyhow::Result<MobEduClient> {
    let mut client = MobEduClient::from_config(&config.remote, &config.mapping)?;
    if !client
        .authenticate(&config.remote.username, &config.remote.password)
        .await?
    {
        anyhow::bail!(
            "authentication as {} at {} failed",
            config.remote.username,
            config.remote.base_url
        );
    }
    if let Some(school_id) = config.remote.managed_school {
        client.set_managed_school(school_id)?;
    }
    Ok(client)
}

use std::path::Path;

use mobsync_core::config::MobSyncConfig;
use tracing::info;

/// Run the `init` command: write a default configuration file.
pub fn run(config_path: &str, force: bool) -> anyhow::Result<()> {
    let path = Path::new(config_path);
    if path.exists() && !force {
        anyhow::bail!("{config_path} already exists (use --force to overwrite)");
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let config = MobSyncConfig::generate_default();
    let toml_str = toml::to_string_pretty(&config)?;
    std::fs::write(path, &toml_str)?;
    info!("Wrote configuration to {}", path.display());

    println!("mobsync initialized.");
    println!("  Configuration: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set remote.base_url, remote.username and remote.password");
    println!("  2. Enable [ldap] and list its search bases");
    println!("  3. Run `mobsync check` to verify the login");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("mobsync.toml");
        let path_str = path.to_string_lossy().to_string();

        run(&path_str, false).unwrap();

        let config = MobSyncConfig::load(&path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.remote.page_size, 100);
        assert!(!config.ldap.enabled);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mobsync.toml");
        std::fs::write(&path, "# keep me").unwrap();
        let path_str = path.to_string_lossy().to_string();

        assert!(run(&path_str, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# keep me");

        run(&path_str, true).unwrap();
        assert!(MobSyncConfig::load(&path).is_ok());
    }
}

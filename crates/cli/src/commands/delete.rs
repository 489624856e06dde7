use mobsync_core::record::Record;
use mobsync_mobedu::mappings::DIVISION_NAME_ATTR;
use serde_json::Value;

use super::{connect, load_config};

/// Run the `delete-user` command.
pub async fn user(config_path: &str, login: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut client = connect(&config).await?;

    if !client.users().delete_login(login).await? {
        anyhow::bail!("the server refused to delete {login}");
    }
    println!("Deleted user {login}.");
    Ok(())
}

/// Run the `delete-class` command. The label is resolved the same way a
/// directory class record would be.
pub async fn class(config_path: &str, label: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut client = connect(&config).await?;

    if !client.classes().delete(&class_record(label)).await? {
        anyhow::bail!("the server refused to delete class {label}");
    }
    println!("Deleted class {label} and its group.");
    Ok(())
}

fn class_record(label: &str) -> Record {
    let mut record = Record::new();
    record.insert(DIVISION_NAME_ATTR.into(), Value::String(label.to_string()));
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use mobsync_mobedu::mappings::{class_letter, class_parallel};

    #[test]
    fn class_record_maps_to_natural_key() {
        let record = class_record("10 B");
        assert_eq!(class_parallel(&record), serde_json::json!(10));
        assert_eq!(class_letter(&record), serde_json::json!("B"));
    }
}

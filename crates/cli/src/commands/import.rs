use mobsync_ldap::LdapDirectory;
use mobsync_mobedu::sync::{ImportReport, Importer};

use super::{connect, load_config};

/// Run the `import` command: push the directory into MobEdu.
pub async fn run(config_path: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    if !config.ldap.enabled {
        anyhow::bail!("no directory source configured: enable the [ldap] section");
    }

    let directory = LdapDirectory::new(&config.ldap);
    directory.client().test_connection().await?;

    let mut client = connect(&config).await?;
    let report = Importer::new(directory).run(&mut client).await?;

    print!("{}", render_report(&report));

    if !report.operational_failures.is_empty() {
        anyhow::bail!(
            "{} entities were left partially written and need manual repair",
            report.operational_failures.len()
        );
    }
    Ok(())
}

fn render_report(report: &ImportReport) -> String {
    let mut out = String::new();
    out.push_str("Import Summary\n");
    out.push_str("==============\n");
    out.push_str(&format!("Source:   {}\n", report.source));
    out.push_str(&format!(
        "Started:  {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(finished) = report.finished_at {
        out.push_str(&format!(
            "Finished: {}\n",
            finished.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    out.push('\n');
    out.push_str(&format!(
        "Users:    {} created, {} updated, {} skipped, {} failed\n",
        report.users_created, report.users_updated, report.users_skipped, report.users_failed
    ));
    out.push_str(&format!(
        "Classes:  {} created, {} updated, {} failed\n",
        report.classes_created, report.classes_updated, report.classes_failed
    ));
    out.push_str(&format!(
        "Members:  {} assigned, {} unresolved\n",
        report.members_assigned, report.members_unresolved
    ));
    if !report.operational_failures.is_empty() {
        out.push_str("\nNeeds manual repair:\n");
        for failure in &report.operational_failures {
            out.push_str(&format!("  - {failure}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ImportReport {
        serde_json::from_value(serde_json::json!({
            "source": "ldap://ldap.school.example",
            "started_at": "2024-09-01T06:00:00Z",
            "finished_at": "2024-09-01T06:02:30Z",
            "users_created": 4,
            "users_updated": 120,
            "users_skipped": 2,
            "users_failed": 1,
            "classes_created": 2,
            "classes_updated": 30,
            "classes_failed": 0,
            "members_assigned": 610,
            "members_unresolved": 3,
            "operational_failures": []
        }))
        .unwrap()
    }

    #[test]
    fn render_counts_and_times() {
        let out = render_report(&report());
        assert!(out.contains("Source:   ldap://ldap.school.example"));
        assert!(out.contains("Started:  2024-09-01 06:00:00 UTC"));
        assert!(out.contains("Finished: 2024-09-01 06:02:30 UTC"));
        assert!(out.contains("Users:    4 created, 120 updated, 2 skipped, 1 failed"));
        assert!(out.contains("Members:  610 assigned, 3 unresolved"));
        assert!(!out.contains("manual repair"));
    }

    #[test]
    fn render_lists_operational_failures() {
        let mut report = report();
        report
            .operational_failures
            .push("cn=7 C,ou=classes: group create failed".into());
        let out = render_report(&report);
        assert!(out.contains("Needs manual repair:"));
        assert!(out.contains("  - cn=7 C,ou=classes: group create failed"));
    }
}

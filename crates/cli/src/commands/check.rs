use mobsync_mobedu::catalog::Catalog;

use super::{connect, load_config};

/// Run the `check` command: log in and show what the account can manage.
pub async fn run(config_path: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let client = connect(&config).await?;

    println!("MobEdu Account");
    println!("==============");
    println!("Server:  {}", client.session().base_url());
    println!("Login:   {}", config.remote.username);
    println!();

    println!("Administered Schools");
    println!("--------------------");
    let schools = client.admin_school_ids();
    if schools.is_empty() {
        println!("(none)");
    }
    for school_id in schools {
        println!(
            "{}",
            school_line(client.catalog(), school_id, client.managed_school())
        );
    }
    println!();

    if client.managed_school().is_none() {
        println!("No managed school selected: set remote.managed_school to one of the ids above.");
        println!();
    }

    println!("Catalog");
    println!("-------");
    println!("Users:   {}", client.catalog().users().len());
    println!("Classes: {}", client.catalog().classes().len());
    println!("Schools: {}", client.catalog().schools().len());

    Ok(())
}

fn school_line(catalog: &Catalog, school_id: i64, managed: Option<i64>) -> String {
    let name = catalog
        .school(school_id)
        .and_then(|s| s.name.as_deref())
        .unwrap_or("(unknown)");
    let marker = if managed == Some(school_id) { " *" } else { "" };
    format!("{school_id:>6}  {name}{marker}")
}

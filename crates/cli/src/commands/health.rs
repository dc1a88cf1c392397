//! Service health command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, format_timestamp, print_json, print_warning, yes_no, OutputFormat};

/// Row for the component table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    message: String,
    #[tabled(rename = "Checked")]
    checked: String,
}

/// Show which models the service has loaded
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(50));
            println!("Status:             {}", color_status(&health.status));
            println!("Crop model loaded:  {}", yes_no(health.crop_model_loaded));
            println!("Price models:       {}", yes_no(health.price_models_loaded));
            if !health.price_models.is_empty() {
                println!("Crops with prices:  {}", health.price_models.join(", ").cyan());
            }
            println!();

            if health.components.is_empty() {
                print_warning("Service reported no component detail");
                return Ok(());
            }

            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    message: c.message.clone().unwrap_or_default(),
                    checked: format_timestamp(c.last_check_timestamp),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

//! Prediction CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, CropRequest, PriceRequest};
use crate::output::{format_price, print_json, print_success, OutputFormat};

/// Row for the submitted-input table
#[derive(Tabled)]
struct InputRow {
    #[tabled(rename = "Feature")]
    feature: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn input_rows(request: &CropRequest) -> Vec<InputRow> {
    [
        ("N", request.n),
        ("P", request.p),
        ("K", request.k),
        ("temperature", request.temperature),
        ("humidity", request.humidity),
        ("ph", request.ph),
        ("rainfall", request.rainfall),
    ]
    .into_iter()
    .map(|(feature, value)| InputRow {
        feature,
        value: format!("{}", value),
    })
    .collect()
}

/// Ask the service which crop suits the given soil and climate
pub async fn recommend(client: &ApiClient, request: CropRequest, format: OutputFormat) -> Result<()> {
    let result = client.recommend_crop(&request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Crop Recommendation".bold());
            println!("{}", "=".repeat(40));

            let table = tabled::Table::new(input_rows(&request))
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!();

            print_success(&format!(
                "Recommended crop: {}",
                result.predicted_crop.green().bold()
            ));
        }
    }

    Ok(())
}

/// Ask the service for a crop's predicted price
pub async fn price(client: &ApiClient, request: PriceRequest, format: OutputFormat) -> Result<()> {
    let result = client.predict_price(&request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Price Prediction".bold());
            println!("{}", "=".repeat(40));
            println!("Crop:      {}", request.plant_type.cyan());
            println!("Period:    {}-{:02}", request.year, request.month);
            println!("Rainfall:  {} mm", request.rainfall);
            println!();
            println!(
                "{} {}",
                "Predicted price:".bold(),
                format_price(result.predicted_price, &result.currency)
                    .green()
                    .bold()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_rows_follow_feature_order() {
        let request = CropRequest {
            n: 90.0,
            p: 42.0,
            k: 43.0,
            temperature: 20.5,
            humidity: 82.0,
            ph: 6.5,
            rainfall: 202.9,
        };
        let rows = input_rows(&request);
        let names: Vec<&str> = rows.iter().map(|r| r.feature).collect();
        assert_eq!(names, ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"]);
        assert_eq!(rows[3].value, "20.5");
    }
}

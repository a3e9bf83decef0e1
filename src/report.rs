//! Metadata report output in text, JSON or CSV.

use crate::metadata::{QrisMetadata, ServiceFee};

/// Output format for metadata reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for machine consumption.
    Json,
    /// CSV output for spreadsheet import.
    Csv,
}

impl QrisMetadata {
    /// Prints the report to stdout.
    pub fn print(&self, format: OutputFormat) {
        println!("{}", self.render(format));
    }

    /// Formats the report without printing it.
    #[must_use]
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.render_text(),
            OutputFormat::Json => serde_json::to_string(self).unwrap_or_default(),
            OutputFormat::Csv => self.render_csv(),
        }
    }

    fn render_text(&self) -> String {
        [
            format!("Merchant:     {}", self.merchant),
            format!("Company:      {}", or_dash(&self.company)),
            format!("Merchant PAN: {}", or_dash(&self.merchant_pan)),
            format!("Region:       {}", or_dash(&self.region)),
            format!("Country:      {}", self.country),
            format!("Postal code:  {}", or_dash(&self.postal_code)),
            format!("Price:        {}", self.price.as_deref().unwrap_or("-")),
            format!("Service fee:  {}", fee_text(self.service_fee.as_ref())),
        ]
        .join("\n")
    }

    fn render_csv(&self) -> String {
        let fee = fee_text(self.service_fee.as_ref());
        let row = [
            self.merchant.as_str(),
            self.company.as_str(),
            self.merchant_pan.as_str(),
            self.region.as_str(),
            self.country.as_str(),
            self.postal_code.as_str(),
            self.price.as_deref().unwrap_or(""),
            if self.service_fee.is_some() { fee.as_str() } else { "" },
        ]
        .map(csv_field)
        .join(",");

        format!(
            "merchant,company,merchant_pan,region,country,postal_code,price,service_fee\n{}",
            row
        )
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn fee_text(fee: Option<&ServiceFee>) -> String {
    match fee {
        None => "-".to_string(),
        Some(ServiceFee::Prompted) => "prompted".to_string(),
        Some(ServiceFee::Nominal(value)) => value.clone(),
        Some(ServiceFee::Percentage(value)) => format!("{}%", value),
    }
}

/// Quotes a field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

use crate::cli::WatermarkCommand;
use crate::config::Config;
use crate::error::{FeedRelayError, Result};
use crate::watermark::{WatermarkRecord, WatermarkStore, ZERO};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle watermark commands
pub async fn handle_watermark(config: &Config, command: WatermarkCommand) -> Result<()> {
    let store = super::open_watermark_store(config)?;

    match command {
        WatermarkCommand::List { json } => {
            let records = store
                .list()
                .await
                .map_err(|e| FeedRelayError::Storage(e.to_string()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            if records.is_empty() {
                println!("{}", "No watermarks stored yet.".yellow());
                return Ok(());
            }

            println!("\nWatermarks:");
            render_table(&records).printstd();
            println!();
        }
        WatermarkCommand::Get { url } => {
            let timestamp = store
                .get(&url)
                .await
                .map_err(|e| FeedRelayError::Storage(e.to_string()))?;

            if timestamp == ZERO {
                println!("{} {}", url.cyan(), "(no watermark)".yellow());
            } else {
                println!("{} {}", url.cyan(), timestamp.to_rfc3339());
            }
        }
    }

    Ok(())
}

fn render_table(records: &[WatermarkRecord]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "Feed".bold(),
        "Watermark".bold(),
        "Updated".bold()
    ]);

    for record in records {
        let url = if record.url.chars().count() > 60 {
            let head: String = record.url.chars().take(57).collect();
            format!("{}...", head)
        } else {
            record.url.clone()
        };

        table.add_row(prettytable::row![
            url.cyan(),
            record.timestamp.to_rfc3339(),
            record.updated_at.format("%Y-%m-%d %H:%M").to_string()
        ]);
    }

    table
}

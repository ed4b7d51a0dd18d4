//! Export format and deployment target listing.

use crate::config::CliConfig;
use colored::Colorize;
use serde_json::json;
use tunedeck_export::ExportService;

pub async fn execute(config: &CliConfig, json: bool) -> anyhow::Result<()> {
    let service = ExportService::new(config.export_config());
    let targets = service.targets().await;

    if json {
        let out = json!({ "formats": service.formats(), "targets": targets });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "Export Formats".bold().cyan());
    println!();
    println!("{:<14} {:<18} {:<6} {}", "ID", "Name", "Ext", "Size");
    println!("{}", "─".repeat(60));
    for format in service.formats() {
        println!(
            "{:<14} {:<18} {:<6} {}",
            format.id.cyan(),
            format.name,
            format.extension.dimmed(),
            format.size.dimmed()
        );
    }

    println!();
    println!("{}", "Deployment Targets".bold().cyan());
    println!();
    for target in targets {
        println!("  {:<14} {:<22} {}", target.id.cyan(), target.name, target.description.dimmed());
    }
    println!();
    Ok(())
}

use geoscope::config::{format_size, get_dataset_info, DatasetInfo};
use geoscope::lens::utils::OutputFormat;
use geoscope::GeoscopeConfig;

use super::print_json;

pub fn run(config: &GeoscopeConfig, output_format: OutputFormat) {
    let info = get_dataset_info(config);

    if output_format.is_json() {
        print_json(&info, output_format);
    } else {
        // Table, Markdown, and PSV all use the same human-readable format
        print_status(&info);
    }

    if info.error.is_some() || !info.exists {
        std::process::exit(1);
    }
}

fn print_status(info: &DatasetInfo) {
    println!("Range Dataset");
    println!("=============\n");

    println!("  Path:           {}", info.path);
    println!(
        "  Status:         {}",
        if info.exists { "exists" } else { "not found" }
    );
    if let Some(size) = info.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    println!("  Schema:         {}", info.schema);
    if let Some(version) = &info.dataset_version {
        println!("  Version:        {}", version);
    }
    if !info.locales.is_empty() {
        println!("  Locales:        {}", info.locales.join(", "));
    }

    if !info.tables.is_empty() {
        println!();
        println!("Tables:");
        for table in &info.tables {
            println!("  {:<20} {} rows", table.table, table.rows);
        }
    }

    if !info.missing_indexes.is_empty() {
        println!();
        println!("Missing indexes (lookups will be slow):");
        for index in &info.missing_indexes {
            println!("  {}", index);
        }
    }

    if let Some(error) = &info.error {
        println!();
        println!("Error: {}", error);
    }
}

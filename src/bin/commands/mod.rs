pub mod config;
pub mod lookup;
pub mod serve;
pub mod status;

use geoscope::lens::utils::OutputFormat;
use serde::Serialize;

/// Print a serializable value as JSON in the requested flavour
pub(crate) fn print_json<T: Serialize>(value: &T, format: OutputFormat) {
    let result = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value),
        _ => serde_json::to_string(value),
    };
    match result {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("ERROR: unable to serialize output: {}", e),
    }
}

use geoscope::lens::utils::OutputFormat;
use geoscope::GeoscopeConfig;

use super::print_json;

pub fn run(config: &GeoscopeConfig, output_format: OutputFormat) {
    if output_format.is_json() {
        print_json(config, output_format);
    } else {
        println!("geoscope Configuration");
        println!("======================\n");
        println!("{}", config.summary());
    }
}

use geoscope::database::{GeoDatabase, GeoDataset, GeoSnapshot};
use geoscope::lens::geoip::{GeoLens, GeoLookupArgs};
use geoscope::lens::utils::OutputFormat;
use geoscope::GeoscopeConfig;

pub fn run(config: &GeoscopeConfig, args: GeoLookupArgs, output_format: OutputFormat) {
    let all_found = if args.memory {
        match GeoSnapshot::load_from_path(&config.db_path) {
            Ok(snapshot) => lookup_and_print(&snapshot, config, &args, &output_format),
            Err(e) => {
                eprintln!("ERROR: unable to load dataset: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match GeoDatabase::open(&config.db_path) {
            Ok(db) => lookup_and_print(&db, config, &args, &output_format),
            Err(e) => {
                eprintln!("ERROR: unable to open dataset: {}", e);
                std::process::exit(1);
            }
        }
    };

    if !all_found {
        std::process::exit(1);
    }
}

/// Returns whether every address resolved
fn lookup_and_print<D: GeoDataset>(
    dataset: &D,
    config: &GeoscopeConfig,
    args: &GeoLookupArgs,
    output_format: &OutputFormat,
) -> bool {
    let lens = GeoLens::new(dataset);
    let results = lens.lookup_all(args, &config.locale);

    let output = lens.format_results(&results, output_format);
    if !output.is_empty() {
        println!("{}", output);
    }

    results.iter().all(|r| r.is_found())
}

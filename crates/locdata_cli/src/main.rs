//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `locdata_core` linkage with a deterministic probe.
//! - Optionally load a dataset file and print an offline integrity scan.

use locdata_core::{
    DocumentRepository, IntegrityService, JsonFileDocumentRepository, OfflineTranslationService,
};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("locdata_core ping={}", locdata_core::ping());
    println!("locdata_core version={}", locdata_core::core_version());

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let log_dir = std::env::temp_dir().join("locdata-cli-logs");
    if let Err(err) = locdata_core::init_logging(locdata_core::default_log_level(), &log_dir) {
        eprintln!("logging disabled: {err}");
    }

    let repo = JsonFileDocumentRepository::new(&path);
    let mut doc = match repo.load() {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("failed to load {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = IntegrityService::new(OfflineTranslationService).scan(&mut doc);
    info!(
        "event=cli_scan module=cli status=ok entries={} invalid_fields={}",
        report.entries_scanned,
        report.invalid_fields()
    );
    println!("entries={}", report.entries_scanned);
    println!("malformed_ids={}", report.malformed_ids);
    println!("duplicated_ids={}", report.duplicated_ids);
    println!("blank_speakers={}", report.blank_speakers);
    println!("blank_variant_names={}", report.blank_variant_names);
    println!("blank_texts={}", report.blank_texts);
    println!("missing_languages={}", report.missing_languages);
    println!("language_pass_skipped={}", report.language_pass.is_skipped());

    if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

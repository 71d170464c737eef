// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use bench_history::history::DirectoryHistory;
use bench_history::scanner::HistoryScanner;
use bench_history::store::BenchmarkStore;
use bench_history::{cli, config, report, scheduler, ui};
use log::debug;
use std::sync::Arc;

fn main() {
    env_logger::init();

    // Parse CLI arguments
    let args = cli::CliArgs::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    // Resolve configuration
    let config = match config::build_scan_config(&args) {
        Ok(c) => c,
        Err(e) => {
            ui::print_error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    };

    // Schema problems abort here, before any result file is read
    let mapper = match config.build_mapper() {
        Ok(m) => m,
        Err(e) => {
            ui::print_error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    };

    let history = match DirectoryHistory::open(&config.history_dir) {
        Ok(h) => h,
        Err(e) => {
            ui::print_error(&e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(BenchmarkStore::new(mapper, config.retention));

    if let Some(ref path) = config.load_snapshot {
        match store.load_snapshot(path) {
            Ok(n) => ui::status(&format!("Loaded {} condensed metrics from {}", n, path.display())),
            Err(e) => {
                ui::print_error(&format!("Failed to load snapshot: {}", e));
                std::process::exit(1);
            }
        }
    }

    // Periodic reset of in-memory state
    let reset_task = match config.reset_interval {
        Some(interval) => {
            let store = Arc::clone(&store);
            match scheduler::schedule_repeating("reset-memory", interval, move || store.reset_memory()) {
                Ok(task) => Some(task),
                Err(e) => {
                    ui::print_error(&e);
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    ui::status(&format!(
        "Scanning {} builds in {} with {} workers",
        history.len(),
        history.root().display(),
        config.workers
    ));

    let scanner = HistoryScanner::new(&history, &store, config.sources.clone()).with_workers(config.workers);
    let summary = match scanner.scan(config.start_build, config.end_build) {
        Ok(s) => s,
        Err(e) => {
            ui::print_error(&e);
            std::process::exit(1);
        }
    };
    debug!("scan summary: {:?}", summary);

    ui::status(&format!(
        "Visited {} builds: {} result files imported, {} skipped",
        summary.visited, summary.imported, summary.failed
    ));
    if summary.failed > 0 {
        ui::print_warning(&format!("{} result files could not be read; run with RUST_LOG=warn for details", summary.failed));
    }

    // Stop resetting before reporting so the report sees the scanned state
    if let Some(task) = reset_task {
        task.stop();
    }

    let rows = store.condensed_rows();
    if !config.quiet {
        let title = format!(
            "{} condensed metrics, {} results and {} parameters in the newest builds",
            rows.len(),
            store.number_of_results(),
            store.number_of_parameters()
        );
        report::print_condensed_table(&title, &rows);
    }

    if let Some(ref path) = config.output_json {
        match store.write_snapshot(path) {
            Ok(()) => ui::status(&format!("Snapshot written to {}", path.display())),
            Err(e) => ui::print_error(&format!("Failed to write snapshot: {}", e)),
        }
    }

    if let Some(ref path) = config.output_csv {
        match report::export_csv_report(&rows, path) {
            Ok(()) => ui::status(&format!("CSV written to {}", path.display())),
            Err(e) => ui::print_error(&format!("Failed to write CSV {}: {}", path.display(), e)),
        }
    }
}

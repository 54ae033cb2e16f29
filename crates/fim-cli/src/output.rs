//! Human-readable rendering of scan, verify and status results

use fim_core::{MonitorState, ScanStats, ScanSummary, VerifyOutcome};
use std::fmt::Write;
use std::path::Path;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

fn render_stats(out: &mut String, stats: &ScanStats) {
    let _ = writeln!(
        out,
        "  {} files hashed ({} bytes), {} directories",
        stats.files_hashed, stats.bytes_hashed, stats.directories
    );
    if stats.skipped > 0 {
        let _ = writeln!(out, "  {} entries skipped (unreadable)", stats.skipped);
    }
    if stats.symlinks_not_followed > 0 {
        let _ = writeln!(
            out,
            "  {} symlinks not followed",
            stats.symlinks_not_followed
        );
    }
    if stats.special_files > 0 {
        let _ = writeln!(out, "  {} special files ignored", stats.special_files);
    }
    if stats.excluded > 0 {
        let _ = writeln!(out, "  {} entries excluded", stats.excluded);
    }
}

pub fn render_scan(summary: &ScanSummary) -> String {
    let mut out = String::new();
    let verb = if summary.replaced { "replaced" } else { "created" };
    let _ = writeln!(
        out,
        "Baseline {verb} for {} ({} files, {})",
        summary.root.display(),
        summary.file_count,
        summary.hash_algorithm
    );
    let _ = writeln!(out, "  stored at {}", summary.baseline_path.display());
    render_stats(&mut out, &summary.stats);
    out
}

pub fn render_verify(outcome: &VerifyOutcome) -> String {
    let report = &outcome.report;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Verified {} against baseline from {}",
        outcome.root.display(),
        report.baseline_time().format(TIME_FORMAT)
    );

    for (kind, path) in report.changes() {
        let _ = writeln!(out, "  {:<9} {}", kind.as_str(), path);
    }

    render_stats(&mut out, &outcome.stats);

    if report.is_clean() {
        let _ = writeln!(out, "OK: {} files unchanged", report.unchanged());
    } else {
        let _ = writeln!(
            out,
            "CHANGED: {} modified, {} added, {} removed, {} unchanged",
            report.modified().len(),
            report.added().len(),
            report.removed().len(),
            report.unchanged()
        );
    }
    out
}

pub fn render_status(state: &MonitorState, baseline_path: &Path) -> String {
    let mut out = String::new();
    match state {
        MonitorState::Uninitialized => {
            let _ = writeln!(
                out,
                "No baseline at {}; run `fim scan` first",
                baseline_path.display()
            );
        }
        MonitorState::Baselined(info) => {
            let _ = writeln!(out, "Baseline: {}", baseline_path.display());
            let _ = writeln!(out, "  directory: {}", info.monitored_directory.display());
            let _ = writeln!(out, "  taken:     {}", info.scan_time.format(TIME_FORMAT));
            let _ = writeln!(out, "  algorithm: {}", info.hash_algorithm);
            let _ = writeln!(out, "  files:     {}", info.file_count);
        }
    }
    out
}

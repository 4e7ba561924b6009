//! Estimate command - run the size guard without watching.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Settings;
use crate::watcher::{PathFilter, SizeGuard, WatchError};

/// Machine-readable result of an estimate.
#[derive(Debug, Serialize)]
pub struct EstimateReport {
    pub root: PathBuf,
    pub estimate: usize,
    pub warn_threshold: usize,
    pub hard_threshold: usize,
    /// `ok`, `large` or `refused`
    pub verdict: &'static str,
}

/// Estimate `root` with the configured exclusions and limits.
pub fn estimate(root: &Path, settings: &Settings) -> EstimateReport {
    let w = &settings.watcher;
    let guard = SizeGuard::new(PathFilter::new(w.exclude.iter().cloned())).with_limits(
        w.estimate_cap,
        w.warn_threshold,
        w.hard_threshold,
    );

    let (estimate, verdict) = match guard.check(root) {
        Ok(verdict) if verdict.is_large() => (verdict.estimate, "large"),
        Ok(verdict) => (verdict.estimate, "ok"),
        Err(WatchError::ResourceBoundExceeded { estimate, .. }) => (estimate, "refused"),
        Err(_) => (0, "refused"),
    };

    EstimateReport {
        root: root.to_path_buf(),
        estimate,
        warn_threshold: w.warn_threshold,
        hard_threshold: w.hard_threshold,
        verdict,
    }
}

/// Run the estimate command. Exits with status 1 when the watch would be
/// refused.
pub fn run(path: Option<&Path>, json: bool, settings: &Settings) {
    let root = match super::resolve_root(path) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    let report = estimate(&root, settings);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("Root:     {}", report.root.display());
        println!("Estimate: {} files", report.estimate);
        println!(
            "Verdict:  {} (warn above {}, refuse at {})",
            report.verdict, report.warn_threshold, report.hard_threshold
        );
    }

    if report.verdict == "refused" {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_small_tree_is_ok() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.rs"), "").unwrap();

        let report = estimate(temp.path(), &Settings::default());
        assert_eq!(report.estimate, 1);
        assert_eq!(report.verdict, "ok");
    }

    #[test]
    fn test_limits_come_from_settings() {
        let temp = TempDir::new().unwrap();
        for i in 0..6 {
            fs::write(temp.path().join(format!("{i}.rs")), "").unwrap();
        }

        let mut settings = Settings::default();
        settings.watcher.warn_threshold = 3;
        assert_eq!(estimate(temp.path(), &settings).verdict, "large");

        settings.watcher.estimate_cap = 4;
        settings.watcher.hard_threshold = 5;
        let report = estimate(temp.path(), &settings);
        assert_eq!(report.verdict, "refused");
        assert!(report.estimate >= 5);
    }

    #[test]
    fn test_report_serializes() {
        let temp = TempDir::new().unwrap();
        let report = estimate(temp.path(), &Settings::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["estimate"], 0);
        assert_eq!(json["verdict"], "ok");
    }
}

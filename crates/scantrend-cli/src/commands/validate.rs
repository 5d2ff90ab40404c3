//! The `scantrend validate` command.

use std::path::Path;

use anyhow::Result;

use scantrend_core::aggregate::aggregate_window;
use scantrend_core::engine::sort_most_recent_first;
use scantrend_sources::snapshot::Snapshot;

use super::SourceArgs;

pub fn execute(source: &SourceArgs, path: &Path) -> Result<()> {
    let config = source.load_config()?;
    let snapshot = Snapshot::load(path)?;

    println!(
        "Snapshot: {} ({} window(s))",
        path.display(),
        snapshot.windows.len()
    );

    let mut total_warnings = 0;
    for warning in snapshot.lint() {
        println!("  WARNING: {warning}");
        total_warnings += 1;
    }

    let mut windows = snapshot.windows.clone();
    sort_most_recent_first(&mut windows);

    let mut invalid = 0;
    for window in windows.iter().rev() {
        let Some(heatmap) = snapshot.heatmaps.get(&window.id) else {
            continue;
        };
        if let Err(e) = heatmap.validate(&config.scale) {
            println!("  [{}] INVALID: {e}", window.id);
            invalid += 1;
            continue;
        }

        let aggregate = aggregate_window(window, heatmap);
        println!(
            "  [{}] {} student(s), {} categories",
            window.id,
            aggregate.students.len(),
            aggregate.categories.len()
        );
        for issue in &aggregate.issues {
            println!("  [{}] WARNING: {issue}", window.id);
        }
        total_warnings += aggregate.issues.len();
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} invalid window(s) found");
    }
    if total_warnings == 0 {
        println!("All windows valid.");
    } else {
        println!("\nAll windows valid, {total_warnings} warning(s) found.");
    }

    Ok(())
}

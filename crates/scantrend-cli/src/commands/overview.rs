//! The `scantrend overview` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use scantrend_core::report::OverviewPayload;

use super::{delta, print_json, score, FilterArgs, OutputFormat, SourceArgs};

pub async fn execute(
    source: &SourceArgs,
    filters: FilterArgs,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let (engine, config) = source.engine()?;
    let filters = filters.into_filters(&config);
    let overview = engine.get_overview(&filters).await?;

    if let Some(path) = &output {
        overview.save_json(path)?;
        eprintln!("Overview written to {}", path.display());
    }

    match format {
        OutputFormat::Json => print_json(&overview)?,
        OutputFormat::Text => print_text(&overview),
    }
    Ok(())
}

fn print_text(overview: &OverviewPayload) {
    let Some(current) = &overview.current_scan else {
        println!("No scans available.");
        return;
    };

    println!("Current scan: {} ({})", current.label, current.date);
    match &overview.previous_scan {
        Some(previous) => println!("Previous scan: {} ({})", previous.label, previous.date),
        None => println!("Previous scan: none"),
    }
    println!(
        "Class average: {} ({})",
        score(overview.class_average_score),
        delta(overview.class_trend_delta)
    );
    println!(
        "Students: {} total, {} improved, {} declined",
        overview.total_students, overview.students_improved, overview.students_declined
    );

    let mut categories = Table::new();
    categories.set_header(vec![
        "Category", "Average", "Previous", "Delta", "Assessed", "Low", "Growth", "Decline",
    ]);
    for c in &overview.category_summaries {
        categories.add_row(vec![
            Cell::new(&c.category_name),
            Cell::new(score(c.average_score)),
            Cell::new(score(c.previous_average)),
            Cell::new(delta(c.trend_delta)),
            Cell::new(c.students_assessed),
            Cell::new(c.low_score_count),
            Cell::new(c.strong_growth_count),
            Cell::new(c.decline_count),
        ]);
    }
    println!("\n{categories}");

    let mut scans = Table::new();
    scans.set_header(vec![
        "Scan", "Date", "Average", "P10", "P25", "Median", "P75", "P90",
    ]);
    for s in &overview.scans {
        scans.add_row(vec![
            Cell::new(&s.label),
            Cell::new(s.date),
            Cell::new(score(s.overall_average)),
            Cell::new(score(s.p10)),
            Cell::new(score(s.p25)),
            Cell::new(score(s.median)),
            Cell::new(score(s.p75)),
            Cell::new(score(s.p90)),
        ]);
    }
    println!("\nScan history:\n{scans}");

    if overview.notable_students.is_empty() {
        println!("\nNo notable students.");
        return;
    }
    let mut notable = Table::new();
    notable.set_header(vec!["Student", "Class", "Type", "Category", "Score", "Delta"]);
    for n in &overview.notable_students {
        notable.add_row(vec![
            Cell::new(&n.student_name),
            Cell::new(&n.class_name),
            Cell::new(n.kind),
            Cell::new(&n.category),
            Cell::new(score(n.score)),
            Cell::new(delta(n.delta)),
        ]);
    }
    println!("\nNotable students:\n{notable}");
}

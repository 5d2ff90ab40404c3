//! The `scantrend history` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use scantrend_core::report::StudentHistory;

use super::{print_json, score, OutputFormat, SourceArgs};

pub async fn execute(
    source: &SourceArgs,
    student_id: &str,
    course: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let (engine, _) = source.engine()?;
    let history = engine
        .get_student_historical_scores(student_id, course.as_deref())
        .await?;

    match format {
        OutputFormat::Json => print_json(&history)?,
        OutputFormat::Text => print_text(&history),
    }
    Ok(())
}

fn print_text(history: &StudentHistory) {
    if history.scans.is_empty() {
        println!("No scans found for student '{}'.", history.student_id);
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Scan", "Date", "Overall", "Categories"]);
    for scan in &history.scans {
        let categories: Vec<String> = scan
            .category_scores
            .iter()
            .map(|c| format!("{} {}", c.category_name, score(c.average)))
            .collect();
        table.add_row(vec![
            Cell::new(&scan.scan_label),
            Cell::new(scan.scan_date),
            Cell::new(score(scan.overall_average)),
            Cell::new(categories.join(", ")),
        ]);
    }
    println!("Student: {}", history.student_id);
    println!("{table}");
}

//! The `scantrend category` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use scantrend_core::report::CategoryDetail;

use super::{delta, print_json, score, FilterArgs, OutputFormat, SourceArgs};

pub async fn execute(
    source: &SourceArgs,
    category_id: &str,
    filters: FilterArgs,
    format: OutputFormat,
) -> Result<()> {
    let (engine, config) = source.engine()?;
    let filters = filters.into_filters(&config);
    let Some(detail) = engine.get_category_detail(category_id, &filters).await? else {
        anyhow::bail!("category '{category_id}' not found in the current scan");
    };

    match format {
        OutputFormat::Json => print_json(&detail)?,
        OutputFormat::Text => print_text(&detail),
    }
    Ok(())
}

fn print_text(detail: &CategoryDetail) {
    let c = &detail.category;
    println!("Category: {} ({})", c.category_name, c.category_id);
    println!(
        "Average: {} (previous {}, delta {})",
        score(c.average_score),
        score(c.previous_average),
        delta(c.trend_delta)
    );
    println!("Students assessed: {}", c.students_assessed);

    println!("\nScore distribution:");
    let widest = detail
        .score_distribution
        .iter()
        .map(|b| b.count)
        .max()
        .unwrap_or(0)
        .max(1);
    for bucket in &detail.score_distribution {
        let bar = "#".repeat(bucket.count * 40 / widest);
        println!("  {:>2} | {bar} {}", bucket.score, bucket.count);
    }

    if detail.risk_students.is_empty() {
        println!("\nNo students at risk.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Student", "Class", "Average", "Delta", "Reasons"]);
    for r in &detail.risk_students {
        let reasons: Vec<String> = r.reasons.iter().map(ToString::to_string).collect();
        table.add_row(vec![
            Cell::new(&r.student_name),
            Cell::new(&r.class_name),
            Cell::new(score(r.average)),
            Cell::new(delta(r.delta)),
            Cell::new(reasons.join(", ")),
        ]);
    }
    println!("\nStudents at risk:\n{table}");
}

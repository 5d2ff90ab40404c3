//! The `scantrend students` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use scantrend_core::report::{CategoryScore, StudentSummary};

use super::{delta, print_json, score, FilterArgs, OutputFormat, SourceArgs};

pub async fn execute(source: &SourceArgs, filters: FilterArgs, format: OutputFormat) -> Result<()> {
    let (engine, config) = source.engine()?;
    let filters = filters.into_filters(&config);
    let students = engine.get_students(&filters).await?;

    match format {
        OutputFormat::Json => print_json(&students)?,
        OutputFormat::Text => print_text(&students),
    }
    Ok(())
}

fn category(pick: Option<&CategoryScore>) -> String {
    pick
        .map(|c| format!("{} ({:.2})", c.category_name, c.average))
        .unwrap_or_else(|| "-".to_string())
}

fn print_text(students: &[StudentSummary]) {
    if students.is_empty() {
        println!("No students in the current scan.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Student", "Class", "Overall", "Delta", "Strongest", "Weakest", "Flags",
    ]);
    for s in students {
        let flags: Vec<String> = s.flags.iter().map(ToString::to_string).collect();
        table.add_row(vec![
            Cell::new(&s.student_name),
            Cell::new(&s.class_name),
            Cell::new(score(s.overall_average)),
            Cell::new(delta(s.overall_delta)),
            Cell::new(category(s.strongest_category.as_ref())),
            Cell::new(category(s.weakest_category.as_ref())),
            Cell::new(flags.join(", ")),
        ]);
    }
    println!("{table}");
    println!("{} student(s)", students.len());
}

//! The `scantrend feedback` command.

use anyhow::Result;

use scantrend_core::report::ScanFeedback;

use super::{print_json, OutputFormat, SourceArgs};

pub async fn execute(source: &SourceArgs, window_id: &str, format: OutputFormat) -> Result<()> {
    let (engine, _) = source.engine()?;
    let feedback = engine.get_scan_feedback(window_id).await?;

    match format {
        OutputFormat::Json => print_json(&feedback)?,
        OutputFormat::Text => print_text(&feedback),
    }
    Ok(())
}

fn print_text(feedback: &ScanFeedback) {
    if feedback.students.is_empty() {
        println!("No goals or reflections recorded for scan '{}'.", feedback.window_id);
        return;
    }

    println!("Scan: {}", feedback.window_id);
    for student in &feedback.students {
        println!(
            "\n{}: {} goal(s), {} reflection(s)",
            student.student_id,
            student.goals.len(),
            student.reflections.len()
        );
        for goal in &student.goals {
            match &goal.competency_id {
                Some(competency) => println!("  goal [{competency}] {}", goal.text),
                None => println!("  goal {}", goal.text),
            }
        }
        for reflection in &student.reflections {
            println!("  reflection {}", reflection.text);
        }
    }
}

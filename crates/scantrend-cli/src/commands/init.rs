//! The `scantrend init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("scantrend.toml"), SAMPLE_CONFIG)?;
    write_if_missing(Path::new("demo-snapshot.json"), DEMO_SNAPSHOT)?;

    println!("\nNext steps:");
    println!("  1. Run: scantrend validate demo-snapshot.json");
    println!("  2. Run: scantrend overview");
    println!("  3. Point [source] in scantrend.toml at your school's API");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# scantrend configuration

parallelism = 4
default_range = "last_3"

# Read scores from the bundled demo snapshot.
[source]
type = "snapshot"
path = "demo-snapshot.json"

# Or from the school platform's read API:
# [source]
# type = "http"
# base_url = "https://school.example"
# api_token = "${SCANTREND_API_TOKEN}"
# timeout_secs = 30

[thresholds]
low_score = 2.5
strong_growth = 0.5
decline = 0.5
improvement = 0.1

[scale]
min = 1.0
max = 5.0
"#;

const DEMO_SNAPSHOT: &str = include_str!("../../../../fixtures/demo-snapshot.json");

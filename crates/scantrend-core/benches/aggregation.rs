use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use scantrend_core::aggregate::aggregate_window;
use scantrend_core::model::{Competency, EvaluationWindow, Heatmap, RawScoreRow, Thresholds};
use scantrend_core::notable::detect;
use scantrend_core::trend::compare;

fn make_window(id: &str) -> EvaluationWindow {
    EvaluationWindow {
        id: id.into(),
        title: id.into(),
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        course_id: None,
    }
}

/// `students` rows over 24 competencies in 6 categories, with some gaps.
fn make_heatmap(students: usize, shift: usize) -> Heatmap {
    let competencies = (0..24)
        .map(|i| Competency {
            id: format!("comp{i}"),
            name: format!("Competency {i}"),
            category_id: Some(format!("cat{}", i % 6)),
            category_name: Some(format!("Category {}", i % 6)),
        })
        .collect();
    let rows = (0..students)
        .map(|s| RawScoreRow {
            student_id: format!("s{s:05}"),
            student_name: format!("Student {s}"),
            class_name: format!("class{}", s % 4),
            scores: (0..24)
                .map(|i| {
                    let score = ((s + i + shift) % 9 != 0).then(|| 1.0 + ((s * 7 + i + shift) % 5) as f64);
                    (format!("comp{i}"), score)
                })
                .collect(),
        })
        .collect();
    Heatmap { competencies, rows }
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_window");
    let window = make_window("w1");

    for students in [30usize, 500] {
        let heatmap = make_heatmap(students, 0);
        group.bench_function(format!("students={students}"), |b| {
            b.iter(|| aggregate_window(black_box(&window), black_box(&heatmap)))
        });
    }

    group.finish();
}

fn bench_trend_and_flags(c: &mut Criterion) {
    let current = aggregate_window(&make_window("w1"), &make_heatmap(500, 0));
    let previous = aggregate_window(&make_window("w0"), &make_heatmap(500, 3));
    let thresholds = Thresholds::default();

    c.bench_function("compare_and_detect_500", |b| {
        b.iter(|| {
            let trend = compare(black_box(&current), Some(black_box(&previous)), 0.1);
            detect(&current, &trend, &thresholds)
        })
    });
}

criterion_group!(benches, bench_aggregate, bench_trend_and_flags);
criterion_main!(benches);

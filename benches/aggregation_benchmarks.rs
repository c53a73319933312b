use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use wellbeing_rs::domains::risk::{build_prompt, parse_categories, MESSAGE_SEPARATOR};
use wellbeing_rs::utils::token_counter::SimpleTokenCounter;
use wellbeing_rs::{Label, PromptBudget, WellbeingSummary};

fn labels(size: usize) -> Vec<Label> {
    (0..size)
        .map(|i| match i % 3 {
            0 => Label::Positive,
            1 => Label::Negative,
            _ => Label::Other("LABEL_2".to_string()),
        })
        .collect()
}

fn messages(size: usize) -> Vec<String> {
    (0..size)
        .map(|i| {
            format!(
                "inbound sender{}@school.org kid@school.org Subject {} Please read the attached notes before class",
                i, i
            )
        })
        .collect()
}

pub fn summary_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("wellbeing_summary");

    for size in [5, 100, 10_000] {
        let batch = labels(size);
        group.bench_with_input(BenchmarkId::new("from_labels", size), &batch, |b, batch| {
            b.iter(|| WellbeingSummary::from_labels(black_box(batch)));
        });
    }

    group.finish();
}

pub fn risk_prompt_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_prompt");

    for size in [10, 500, 5_000] {
        let batch = messages(size);
        let budget = PromptBudget::with_counter(24_000, SimpleTokenCounter);

        group.bench_with_input(BenchmarkId::new("fit_and_build", size), &batch, |b, batch| {
            b.iter(|| {
                let fitted = budget.fit(black_box(batch), MESSAGE_SEPARATOR);
                build_prompt(&fitted.join(MESSAGE_SEPARATOR))
            });
        });
    }

    let reply = "```json\n[\"Gambling\", \"External contact\", \"Late-night use\", \"Grooming\"]\n```";
    group.bench_function("parse_reply", |b| b.iter(|| parse_categories(black_box(reply))));

    group.finish();
}

criterion_group!(benches, summary_benchmark, risk_prompt_benchmark);
criterion_main!(benches);

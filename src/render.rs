// Plain text views

use std::fmt::Write;

use crate::dashboard::WellbeingReport;
use crate::dataset::{ActivityOverview, Dataset};
use crate::types::Outcome;

const SUBJECT_WIDTH: usize = 40;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

pub fn render_overview(overview: &ActivityOverview) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Activity Overview");
    let _ = writeln!(output, "Total emails: {}", overview.total_emails);
    let _ = writeln!(
        output,
        "Estimated screen time: {} min",
        overview.estimated_screen_time_minutes
    );
    let _ = writeln!(output, "Safety score: calculated in the wellbeing view");
    let _ = writeln!(
        output,
        "Inbound: {}  Outbound: {}  Other: {}",
        overview.inbound, overview.outbound, overview.other_direction
    );

    if let (Some(first), Some(last)) = (overview.first_timestamp, overview.last_timestamp) {
        let _ = writeln!(output, "Active from {} to {}", first, last);
    }

    output
}

/// One line per message, subjects cut to a fixed width
pub fn render_messages(dataset: &Dataset, limit: Option<usize>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Messages");

    if dataset.is_empty() {
        let _ = writeln!(output, "No messages in this dataset.");
        return output;
    }

    let shown = limit.unwrap_or(dataset.len()).min(dataset.len());
    for (index, message) in dataset.messages().iter().take(shown).enumerate() {
        let _ = writeln!(
            output,
            "{:>4}. [{}] {} -> {}: {}",
            index + 1,
            message.direction,
            message.sender,
            message.recipient,
            truncate(&message.subject, SUBJECT_WIDTH)
        );
    }
    if shown < dataset.len() {
        let _ = writeln!(output, "... {} more", dataset.len() - shown);
    }

    output
}

pub fn render_wellbeing(report: &WellbeingReport) -> String {
    let mut output = String::new();
    let sentiment = &report.sentiment;
    let summary = &sentiment.summary;

    let _ = writeln!(output, "# Wellbeing Analysis");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk & Tone");

    match &report.risk {
        Outcome::Ready(assessment) => {
            if assessment.is_clear() {
                let _ = writeln!(output, "No risk categories detected.");
            } else {
                for category in &assessment.categories_found {
                    let _ = writeln!(output, "- {}", category);
                }
            }
            if !assessment.unrecognized.is_empty() {
                let _ = writeln!(
                    output,
                    "Unrecognised terms in the reply: {}",
                    assessment.unrecognized.join(", ")
                );
            }
            if assessment.is_trimmed() {
                let _ = writeln!(
                    output,
                    "Only the first {} of {} messages fit in the request.",
                    assessment.messages_included, assessment.messages_total
                );
            }
        }
        Outcome::Failed(message) => {
            let _ = writeln!(output, "Risk analysis unavailable: {}", message);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment");
    let _ = writeln!(output, "Wellbeing score: {:.2} / 10", summary.score);
    let _ = writeln!(output, "Positive: {}", summary.positive_pct);
    let _ = writeln!(output, "Neutral: {}", summary.neutral_pct);
    let _ = writeln!(output, "Negative: {}", summary.negative_pct);
    let _ = writeln!(
        output,
        "Based on {} of {} sampled messages",
        summary.counts.total, sentiment.sampled
    );
    match sentiment.failed {
        0 => {}
        1 => {
            let _ = writeln!(output, "1 message could not be classified");
        }
        n => {
            let _ = writeln!(output, "{} messages could not be classified", n);
        }
    }
    if sentiment.cancelled {
        let _ = writeln!(output, "Analysis was cancelled; results are partial");
    }

    output
}

pub fn render_answer(question: &str, answer: &Outcome<String>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Q: {}", question.trim());
    match answer {
        Outcome::Ready(text) => {
            let _ = writeln!(output, "A: {}", text);
        }
        Outcome::Failed(message) => {
            let _ = writeln!(output, "Error: {}", message);
        }
    }
    output
}

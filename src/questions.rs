use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::models::Response;

const NO_RESPONSE_TEXT: &str = "<i>No Response</i>";
const CONTRIBUTION_NOT_SURE: i64 = -101;
const CONTRIBUTION_EQUAL_SHARE: i64 = 100;

/// Type-specific behaviour of a question: how answers render, what the
/// statistics fragment looks like, and whether unanswered pairs are shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    Mcq { options: Vec<String> },
    NumScale { min: f64, max: f64 },
    /// Team contribution self-evaluation.
    Contribution,
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Text => "text",
            QuestionKind::Mcq { .. } => "mcq",
            QuestionKind::NumScale { .. } => "num_scale",
            QuestionKind::Contribution => "contribution",
        }
    }

    /// Renders the statistics block for a set of responses. Empty when the
    /// question type has nothing to summarize.
    pub fn statistics_fragment(&self, responses: &[&Response]) -> String {
        match self {
            QuestionKind::Text => String::new(),
            QuestionKind::Mcq { options } => mcq_statistics(options, responses),
            QuestionKind::NumScale { min, max } => num_scale_statistics(*min, *max, responses),
            QuestionKind::Contribution => contribution_statistics(responses),
        }
    }

    pub fn no_response_text(&self, _giver: &str, _recipient: &str) -> String {
        NO_RESPONSE_TEXT.to_string()
    }

    pub fn should_show_no_response(&self, _giver: &str, _recipient: &str) -> bool {
        !matches!(self, QuestionKind::Contribution)
    }

    pub fn answer_html(&self, answer: &str) -> String {
        match self {
            QuestionKind::Contribution => match answer.trim().parse::<i64>() {
                Ok(points) => contribution_label(points),
                Err(_) => html_escape(answer),
            },
            _ => html_escape(answer),
        }
    }
}

fn mcq_statistics(options: &[String], responses: &[&Response]) -> String {
    if responses.is_empty() {
        return String::new();
    }

    let mut counts: Vec<(String, usize)> = options.iter().map(|o| (o.clone(), 0)).collect();
    let mut other = 0usize;
    for response in responses {
        match counts.iter_mut().find(|(option, _)| option == &response.answer) {
            Some(entry) => entry.1 += 1,
            None => other += 1,
        }
    }
    if other > 0 {
        counts.push(("Other".to_string(), other));
    }

    let total = responses.len() as f64;
    let mut output = String::new();
    let _ = write!(
        output,
        "<table class=\"table statistics-table\"><thead><tr><th>Choice</th><th>Response Count</th><th>Percentage</th></tr></thead><tbody>"
    );
    for (option, count) in counts {
        let _ = write!(
            output,
            "<tr><td>{}</td><td>{}</td><td>{:.0}%</td></tr>",
            html_escape(&option),
            count,
            count as f64 / total * 100.0
        );
    }
    let _ = write!(output, "</tbody></table>");
    output
}

/// Answers outside the scale are left out of the summary.
fn num_scale_statistics(scale_min: f64, scale_max: f64, responses: &[&Response]) -> String {
    let values: Vec<f64> = responses
        .iter()
        .filter_map(|r| r.answer.trim().parse::<f64>().ok())
        .filter(|value| (scale_min..=scale_max).contains(value))
        .collect();
    if values.is_empty() {
        return String::new();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let average = values.iter().sum::<f64>() / values.len() as f64;

    format!(
        "<table class=\"table statistics-table\"><caption>Scale {} to {}</caption><thead><tr><th>Responses</th><th>Average</th><th>Min</th><th>Max</th></tr></thead><tbody><tr><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr></tbody></table>",
        scale_min,
        scale_max,
        values.len(),
        average,
        min,
        max
    )
}

fn contribution_statistics(responses: &[&Response]) -> String {
    let mut per_recipient: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for response in responses {
        let Ok(points) = response.answer.trim().parse::<i64>() else {
            continue;
        };
        if points == CONTRIBUTION_NOT_SURE {
            continue;
        }
        let entry = per_recipient.entry(response.recipient.as_str()).or_insert((0, 0));
        entry.0 += points;
        entry.1 += 1;
    }
    if per_recipient.is_empty() {
        return String::new();
    }

    let mut output = String::new();
    let _ = write!(
        output,
        "<table class=\"table statistics-table\"><thead><tr><th>Recipient</th><th>Perceived Contribution</th></tr></thead><tbody>"
    );
    for (recipient, (total, count)) in per_recipient {
        let average = (total as f64 / count as f64).round() as i64;
        let _ = write!(
            output,
            "<tr><td>{}</td><td>{}</td></tr>",
            html_escape(recipient),
            contribution_label(average)
        );
    }
    let _ = write!(output, "</tbody></table>");
    output
}

fn contribution_label(points: i64) -> String {
    match points {
        CONTRIBUTION_NOT_SURE => "Not Sure".to_string(),
        CONTRIBUTION_EQUAL_SHARE => "Equal Share".to_string(),
        p if p > CONTRIBUTION_EQUAL_SHARE => {
            format!("Equal Share + {}%", p - CONTRIBUTION_EQUAL_SHARE)
        }
        p => format!("Equal Share - {}%", CONTRIBUTION_EQUAL_SHARE - p),
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

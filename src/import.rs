//! Packs CSV exports (roster, questions, responses) into a results bundle.

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::Path;

use anyhow::{bail, Context};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    default_section, FeedbackSession, Instructor, ParticipantType, Question, Response,
    ResultsData, Roster, Student,
};
use crate::questions::QuestionKind;

#[derive(Debug, serde::Deserialize)]
struct RosterRow {
    role: String,
    email: String,
    name: String,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    section: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct QuestionRow {
    id: String,
    number: u32,
    text: String,
    giver_type: ParticipantType,
    recipient_type: ParticipantType,
    kind: String,
    /// `|`-separated choices for multiple choice questions.
    #[serde(default)]
    options: Option<String>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseRow {
    #[serde(default)]
    id: Option<Uuid>,
    question_id: String,
    giver: String,
    recipient: String,
    answer: String,
    #[serde(default)]
    giver_section: Option<String>,
    #[serde(default)]
    recipient_section: Option<String>,
    #[serde(default)]
    hidden_giver: Option<bool>,
    #[serde(default)]
    hidden_recipient: Option<bool>,
}

pub fn import_csv(
    session: FeedbackSession,
    roster_path: &Path,
    questions_path: &Path,
    responses_path: &Path,
) -> anyhow::Result<ResultsData> {
    let roster = read_roster(csv::Reader::from_path(roster_path).with_context(|| {
        format!("failed to open roster {}", roster_path.display())
    })?)?;
    let questions = read_questions(csv::Reader::from_path(questions_path).with_context(|| {
        format!("failed to open questions {}", questions_path.display())
    })?)?;
    let reader = csv::Reader::from_path(responses_path)
        .with_context(|| format!("failed to open responses {}", responses_path.display()))?;
    let data = assemble_data(session, roster, questions, reader)?;

    info!(
        students = data.roster.students.len(),
        instructors = data.roster.instructors.len(),
        questions = data.questions.len(),
        responses = data.responses.len(),
        "imported results"
    );
    Ok(data)
}

fn read_roster<R: io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Roster> {
    let mut roster = Roster::default();
    for (line, result) in reader.deserialize::<RosterRow>().enumerate() {
        let row = result.with_context(|| format!("invalid roster row {}", line + 1))?;
        match row.role.trim().to_ascii_lowercase().as_str() {
            "student" => {
                let Some(team) = row.team.filter(|team| !team.is_empty()) else {
                    bail!("student {} on roster row {} has no team", row.email, line + 1);
                };
                roster.students.push(Student {
                    email: row.email,
                    name: row.name,
                    team,
                    section: row
                        .section
                        .filter(|section| !section.is_empty())
                        .unwrap_or_else(default_section),
                });
            }
            "instructor" => roster.instructors.push(Instructor {
                email: row.email,
                name: row.name,
            }),
            other => bail!("unknown role {other:?} on roster row {}", line + 1),
        }
    }
    Ok(roster)
}

fn read_questions<R: io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Vec<Question>> {
    let mut questions = Vec::new();
    for (line, result) in reader.deserialize::<QuestionRow>().enumerate() {
        let row = result.with_context(|| format!("invalid question row {}", line + 1))?;
        let details = match row.kind.trim() {
            "text" => QuestionKind::Text,
            "mcq" => QuestionKind::Mcq {
                options: row
                    .options
                    .as_deref()
                    .unwrap_or_default()
                    .split('|')
                    .map(str::trim)
                    .filter(|option| !option.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            "num_scale" => QuestionKind::NumScale {
                min: row.min.unwrap_or(1.0),
                max: row.max.unwrap_or(5.0),
            },
            "contribution" => QuestionKind::Contribution,
            other => bail!("unknown question kind {other:?} for question {}", row.id),
        };
        questions.push(Question {
            id: row.id,
            number: row.number,
            text: row.text,
            giver_type: row.giver_type,
            recipient_type: row.recipient_type,
            details,
        });
    }
    Ok(questions)
}

/// Reads responses, filling absent ids with fresh ones and absent sections
/// from the roster.
fn assemble_data<R: io::Read>(
    session: FeedbackSession,
    roster: Roster,
    questions: Vec<Question>,
    mut reader: csv::Reader<R>,
) -> anyhow::Result<ResultsData> {
    let sections: HashMap<String, String> = roster
        .students
        .iter()
        .map(|student| (student.email.clone(), student.section.clone()))
        .collect();
    let section_of = |identifier: &str, given: Option<String>| {
        given
            .filter(|section| !section.is_empty())
            .or_else(|| sections.get(identifier).cloned())
            .unwrap_or_else(default_section)
    };

    let mut responses = Vec::new();
    let mut hidden_givers = BTreeSet::new();
    let mut hidden_recipients = BTreeSet::new();
    for (line, result) in reader.deserialize::<ResponseRow>().enumerate() {
        let row = result.with_context(|| format!("invalid response row {}", line + 1))?;
        let id = row.id.unwrap_or_else(Uuid::new_v4);
        if row.hidden_giver.unwrap_or(false) {
            hidden_givers.insert(id);
        }
        if row.hidden_recipient.unwrap_or(false) {
            hidden_recipients.insert(id);
        }
        responses.push(Response {
            id,
            giver_section: section_of(&row.giver, row.giver_section),
            recipient_section: section_of(&row.recipient, row.recipient_section),
            question_id: row.question_id,
            giver: row.giver,
            recipient: row.recipient,
            answer: row.answer,
        });
    }
    debug!(responses = responses.len(), "read responses");

    Ok(ResultsData {
        session,
        questions,
        responses,
        roster,
        is_complete: true,
        hidden_givers,
        hidden_recipients,
    })
}

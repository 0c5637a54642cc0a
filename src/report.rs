use std::fmt::Write;

use crate::panels::{PageBody, QuestionTable, ResponseRow, ResultsPage, SectionPanel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSummary {
    pub display_name: String,
    pub teams: usize,
    pub participants_with_responses: usize,
    pub participants_without_responses: usize,
    pub missing_rows: usize,
}

pub fn summarize_sections(page: &ResultsPage) -> Vec<SectionSummary> {
    page.sections()
        .iter()
        .map(|section| {
            let participants = section.teams.iter().flat_map(|team| team.participants.iter());
            let (with, without) =
                participants.fold((0, 0), |(with, without), participant| {
                    if participant.has_responses {
                        (with + 1, without)
                    } else {
                        (with, without + 1)
                    }
                });
            let missing_rows = section
                .teams
                .iter()
                .flat_map(|team| team.participants.iter())
                .flat_map(|participant| participant.question_tables.iter())
                .map(|table| table.rows.iter().filter(|row| row.is_missing).count())
                .sum();
            SectionSummary {
                display_name: section.display_name.clone(),
                teams: section.teams.len(),
                participants_with_responses: with,
                participants_without_responses: without,
                missing_rows,
            }
        })
        .collect()
}

pub fn build_report(page: &ResultsPage) -> String {
    let session = &page.session_panel;
    let mut output = String::new();

    let _ = writeln!(
        output,
        "# Feedback Results: {} ({})",
        session.session_name, session.course_id
    );
    let _ = writeln!(
        output,
        "Open {} to {}; section {}; view {}",
        session.start_time, session.end_time, session.selected_section, page.filter_panel.sort_type
    );
    if page.panels_collapsed {
        let _ = writeln!(output, "Panels start collapsed.");
    }

    if let Some(advisory) = &page.advisory {
        let _ = writeln!(output);
        let _ = writeln!(output, "> {advisory}");
    }

    match page.body {
        PageBody::Questions(_) => write_questions(&mut output, page.question_tables()),
        PageBody::Sections(_) => write_sections(&mut output, page),
    }

    output
}

pub fn build_json(page: &ResultsPage) -> serde_json::Result<String> {
    serde_json::to_string_pretty(page)
}

fn write_questions(output: &mut String, tables: &[QuestionTable]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Questions");
    if tables.is_empty() {
        let _ = writeln!(output, "No questions in this session.");
    }
    for table in tables {
        write_question_table(output, table, "###");
    }
}

fn write_sections(output: &mut String, page: &ResultsPage) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    if page.sections().is_empty() {
        let _ = writeln!(output, "No responses recorded for this session.");
    }
    for summary in summarize_sections(page) {
        let _ = writeln!(
            output,
            "- {}: {} teams, {} participants with responses, {} without, {} missing responses",
            summary.display_name,
            summary.teams,
            summary.participants_with_responses,
            summary.participants_without_responses,
            summary.missing_rows
        );
    }
    for section in page.sections() {
        write_section(output, section);
    }
}

fn write_section(output: &mut String, section: &SectionPanel) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {}", section.display_name);

    if section.load_by_ajax {
        let _ = writeln!(output, "Responses for this section are loaded separately.");
        return;
    }
    if !section.able_to_load {
        let _ = writeln!(output, "Responses for this section could not be loaded.");
        return;
    }
    if section.is_empty() {
        let _ = writeln!(output, "No teams in this section.");
    }

    for team in &section.teams {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {}", team.team);
        for table in &team.statistics_tables {
            let _ = writeln!(
                output,
                "- Statistics for question {}: {}",
                table.question_number, table.statistics_html
            );
        }
        for participant in &team.participants {
            let _ = writeln!(output);
            if participant.has_responses {
                let _ = writeln!(output, "#### {}", participant.name);
            } else {
                let _ = writeln!(output, "#### {} (no responses)", participant.name);
            }
            for table in &participant.question_tables {
                write_question_table(output, table, "#####");
            }
        }
    }
}

fn write_question_table(output: &mut String, table: &QuestionTable, heading: &str) {
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "{heading} Question {}: {}",
        table.question_number, table.question_text
    );
    if !table.statistics_html.is_empty() {
        let _ = writeln!(output, "{}", table.statistics_html);
    }
    if !table.show_response_rows {
        return;
    }
    for row in &table.rows {
        let _ = writeln!(output, "- {}", row_line(row));
    }
}

fn row_line(row: &ResponseRow) -> String {
    let giver = participant_label(&row.giver_name, &row.giver_team);
    let recipient = participant_label(&row.recipient_name, &row.recipient_team);
    let pair = match (row.giver_displayed, row.recipient_displayed) {
        (true, true) => format!("{giver} to {recipient}"),
        (false, true) => format!("to {recipient}"),
        (true, false) => format!("from {giver}"),
        (false, false) => String::new(),
    };
    if row.is_missing {
        format!("{pair}: {} (pending)", row.answer_html)
    } else {
        format!("{pair}: {}", row.answer_html)
    }
}

fn participant_label(name: &str, team: &str) -> String {
    if team.is_empty() || team == name {
        name.to_string()
    } else {
        format!("{name} ({team})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::fixtures::*;
    use crate::bundle::ResultsBundle;
    use crate::config::RenderConfig;
    use crate::models::ParticipantType;
    use crate::page::{build_page, ResultsRequest};
    use crate::permissions::InstructorPrivileges;
    use crate::view::ViewMode;

    fn page(view: ViewMode) -> ResultsPage {
        let students = two_section_students();
        let responses = vec![response(
            &students,
            "q1",
            "alice@example.com",
            "bob@example.com",
            "great",
        )];
        let q1 = question("q1", 1, ParticipantType::Students, ParticipantType::OwnTeamMembers);
        let bundle = ResultsBundle::new(data(students, vec![q1], responses)).expect("valid bundle");
        build_page(
            &bundle,
            &ResultsRequest::new(view),
            &RenderConfig::default(),
            &InstructorPrivileges::co_owner(),
        )
        .expect("page builds")
    }

    #[test]
    fn summaries_count_placeholders() {
        let summaries = summarize_sections(&page(ViewMode::GiverQuestionRecipient));
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].display_name, "A");
        assert_eq!(summaries[0].participants_with_responses, 1);
        assert_eq!(summaries[0].participants_without_responses, 1);
        assert_eq!(summaries[1].participants_with_responses, 0);
        assert_eq!(summaries[1].participants_without_responses, 2);
    }

    #[test]
    fn grouped_report_lists_sections_and_teams() {
        let report = build_report(&page(ViewMode::GiverQuestionRecipient));
        assert!(report.starts_with("# Feedback Results: Peer Review 1 (CS2103)"));
        assert!(report.contains("## A"));
        assert!(report.contains("### T1"));
        assert!(report.contains("#### Alice"));
        assert!(report.contains("#### Bob (no responses)"));
        assert!(report.contains("- to Bob (T1): great"));
    }

    #[test]
    fn question_report_marks_pending_rows() {
        let report = build_report(&page(ViewMode::Question));
        assert!(report.contains("### Question 1: Question 1"));
        assert!(report.contains("- Alice (T1) to Bob (T1): great"));
        assert!(report.contains("- Bob (T1) to Alice (T1): <i>No Response</i> (pending)"));
    }

    #[test]
    fn json_output_tags_body_kind() {
        let json = build_json(&page(ViewMode::Question)).expect("serializes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["body"]["kind"], "questions");
        assert_eq!(value["filter_panel"]["sort_type"], "question");
    }
}

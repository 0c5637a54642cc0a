use clap::ValueEnum;
use serde::Serialize;

use crate::models::Primary;
use crate::panels::{ColumnHeader, ResponseRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    Question,
    GiverQuestionRecipient,
    RecipientQuestionGiver,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        self.strategy().name
    }

    pub fn strategy(self) -> &'static ViewStrategy {
        match self {
            ViewMode::Question => &BY_QUESTION,
            ViewMode::GiverQuestionRecipient => &BY_GIVER,
            ViewMode::RecipientQuestionGiver => &BY_RECIPIENT,
        }
    }
}

#[derive(Debug)]
pub struct ColumnSpec {
    pub label: &'static str,
    pub sort_id: Option<&'static str>,
    pub sort_column: Option<u8>,
    pub initially_ascending: bool,
    pub width_percent: Option<u8>,
    pub sortable: bool,
}

impl ColumnSpec {
    const fn plain(label: &'static str) -> Self {
        Self {
            label,
            sort_id: None,
            sort_column: None,
            initially_ascending: false,
            width_percent: None,
            sortable: false,
        }
    }

    const fn sorted(
        label: &'static str,
        sort_id: &'static str,
        sort_column: u8,
        initially_ascending: bool,
        width_percent: Option<u8>,
    ) -> Self {
        Self {
            label,
            sort_id: Some(sort_id),
            sort_column: Some(sort_column),
            initially_ascending,
            width_percent,
            sortable: true,
        }
    }

    fn header(&self) -> ColumnHeader {
        ColumnHeader {
            label: self.label.to_string(),
            sort_id: self.sort_id.map(str::to_string),
            sort_column: self.sort_column,
            initially_ascending: self.initially_ascending,
            width_percent: self.width_percent,
            sortable: self.sortable,
        }
    }
}

/// Profile picture links for the two participants of a row.
#[derive(Debug, Clone, Default)]
pub struct RowPictures {
    pub giver: Option<String>,
    pub recipient: Option<String>,
}

/// Everything that differs between the three views, in one record.
#[derive(Debug)]
pub struct ViewStrategy {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Participant the section panels are keyed on; none for by-question.
    pub primary: Option<Primary>,
    pub tables_collapsible: bool,
    pub moderation_on_panels: bool,
    pub statistics_header: Option<&'static str>,
    pub detailed_responses_header: Option<&'static str>,
    pub additional_info_id: fn(usize, usize) -> String,
    pub configure_row: fn(&mut ResponseRow, RowPictures),
}

impl ViewStrategy {
    pub fn column_headers(&self) -> Vec<ColumnHeader> {
        self.columns.iter().map(ColumnSpec::header).collect()
    }
}

static QUESTION_COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec::sorted("Giver", "button_sortFromName", 1, false, Some(15)),
    ColumnSpec::sorted("Team", "button_sortFromTeam", 2, false, Some(15)),
    ColumnSpec::sorted("Recipient", "button_sortToName", 3, false, Some(15)),
    ColumnSpec::sorted("Team", "button_sortToTeam", 4, true, Some(15)),
    ColumnSpec::sorted("Feedback", "button_sortFeedback", 5, false, None),
    ColumnSpec::plain("Actions"),
];

static GIVER_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec::plain("Photo"),
    ColumnSpec::sorted("Recipient", "button_sortTo", 2, false, Some(15)),
    ColumnSpec::sorted("Team", "button_sortFromTeam", 3, true, Some(15)),
    ColumnSpec::sorted("Feedback", "button_sortFeedback", 4, false, None),
];

static RECIPIENT_COLUMNS: [ColumnSpec; 5] = [
    ColumnSpec::plain("Photo"),
    ColumnSpec::sorted("Giver", "button_sortFromName", 2, false, Some(15)),
    ColumnSpec::sorted("Team", "button_sortFromTeam", 3, true, Some(15)),
    ColumnSpec::sorted("Feedback", "button_sortFeedback", 4, false, None),
    ColumnSpec::plain("Actions"),
];

static BY_QUESTION: ViewStrategy = ViewStrategy {
    name: "question",
    columns: &QUESTION_COLUMNS,
    primary: None,
    tables_collapsible: true,
    moderation_on_panels: false,
    statistics_header: None,
    detailed_responses_header: None,
    additional_info_id: no_additional_info,
    configure_row: configure_question_row,
};

static BY_GIVER: ViewStrategy = ViewStrategy {
    name: "giver-question-recipient",
    columns: &GIVER_COLUMNS,
    primary: Some(Primary::Giver),
    tables_collapsible: false,
    moderation_on_panels: true,
    statistics_header: Some("Statistics for Given Responses"),
    detailed_responses_header: Some("Detailed Responses"),
    additional_info_id: giver_additional_info,
    configure_row: configure_giver_row,
};

static BY_RECIPIENT: ViewStrategy = ViewStrategy {
    name: "recipient-question-giver",
    columns: &RECIPIENT_COLUMNS,
    primary: Some(Primary::Recipient),
    tables_collapsible: false,
    moderation_on_panels: false,
    statistics_header: Some("Received Responses Statistics"),
    detailed_responses_header: Some("Detailed Responses"),
    additional_info_id: recipient_additional_info,
    configure_row: configure_recipient_row,
};

fn no_additional_info(_participant: usize, _question: usize) -> String {
    String::new()
}

fn giver_additional_info(participant: usize, question: usize) -> String {
    format!("giver-{participant}-question-{question}")
}

fn recipient_additional_info(participant: usize, question: usize) -> String {
    format!("recipient-{participant}-question-{question}")
}

fn configure_question_row(row: &mut ResponseRow, pictures: RowPictures) {
    row.giver_picture = pictures.giver;
    row.recipient_picture = pictures.recipient;
    row.actions_displayed = true;
}

fn configure_giver_row(row: &mut ResponseRow, pictures: RowPictures) {
    row.giver_displayed = false;
    row.giver_picture = None;
    row.recipient_picture_column = true;
    row.recipient_picture = pictures.recipient;
    row.actions_displayed = false;
}

fn configure_recipient_row(row: &mut ResponseRow, pictures: RowPictures) {
    row.recipient_displayed = false;
    row.giver_picture_column = true;
    row.giver_picture = pictures.giver;
    row.actions_displayed = true;
}

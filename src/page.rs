//! Top-level render: turns a bundle and a request into a `ResultsPage`.

use tracing::{info, warn};

use crate::assembler::PanelAssembler;
use crate::bundle::ResultsBundle;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::models::DEFAULT_SECTION;
use crate::panels::{FilterPanel, PageBody, QuestionTable, ResultsPage, SectionPanel, SessionPanel};
use crate::permissions::PermissionChecker;
use crate::rows::RowBuilder;
use crate::tables::TableBuilder;
use crate::view::ViewMode;

const ALL_SECTIONS: &str = "All";
const EDIT_PAGE: &str = "/page/instructorFeedbackEditPage";
const RESULTS_PAGE: &str = "/page/instructorFeedbackResultsPage";

/// Which sections a render covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SectionFilter {
    #[default]
    All,
    Section(String),
}

impl SectionFilter {
    /// `None` and the literal "All" both mean every section.
    pub fn from_arg(section: Option<String>) -> Self {
        match section {
            Some(name) if name != ALL_SECTIONS => SectionFilter::Section(name),
            _ => SectionFilter::All,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, SectionFilter::All)
    }

    pub fn label(&self) -> &str {
        match self {
            SectionFilter::All => ALL_SECTIONS,
            SectionFilter::Section(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultsRequest {
    pub view: ViewMode,
    pub section: SectionFilter,
    pub show_stats: bool,
    pub group_by_team: bool,
    /// Sections offered by the filter; defaults to the roster's sections.
    pub sections: Vec<String>,
    /// Offset of the first participant panel when sections load separately.
    pub start_index: usize,
}

impl ResultsRequest {
    pub fn new(view: ViewMode) -> Self {
        Self {
            view,
            section: SectionFilter::All,
            show_stats: true,
            group_by_team: true,
            sections: Vec::new(),
            start_index: 0,
        }
    }
}

pub fn build_page(
    bundle: &ResultsBundle,
    request: &ResultsRequest,
    config: &RenderConfig,
    permissions: &dyn PermissionChecker,
) -> Result<ResultsPage, RenderError> {
    let strategy = request.view.strategy();
    let sections = if request.sections.is_empty() {
        bundle
            .all_roster_sections()
            .into_iter()
            .filter(|section| section != DEFAULT_SECTION)
            .collect()
    } else {
        request.sections.clone()
    };

    let mut collapsed = false;
    let mut advisory = None;

    let body = match strategy.primary {
        None => {
            let (tables, responses) = question_tables(bundle, request, config, permissions);
            collapsed = responses > config.collapse_threshold;
            PageBody::Questions(tables)
        }
        Some(_) if !bundle.is_complete => {
            warn!(
                course = %bundle.session.course_id,
                session = %bundle.session.name,
                section = request.section.label(),
                "results too large to assemble, deferring sections"
            );
            advisory = Some(exceeding_responses_message(config));
            match &request.section {
                SectionFilter::All => {
                    collapsed = true;
                    PageBody::Sections(deferred_section_panels(&sections))
                }
                SectionFilter::Section(name) => {
                    let mut panel = SectionPanel::new(name);
                    panel.display_name = name.clone();
                    panel.able_to_load = false;
                    PageBody::Sections(vec![panel])
                }
            }
        }
        Some(_) if bundle.responses.is_empty() => PageBody::Sections(Vec::new()),
        Some(primary) => {
            let scoped;
            let source = match &request.section {
                SectionFilter::All => bundle,
                SectionFilter::Section(name) => {
                    scoped = bundle.restricted_to_section(name, Some(primary));
                    &scoped
                }
            };
            collapsed = source.responses.len() > config.collapse_threshold;
            let rows = RowBuilder::new(source, strategy, permissions, config, &request.section);
            let tables = TableBuilder::new(rows, request.show_stats);
            let entries = source.responses_grouped_by(primary);
            let assembler = PanelAssembler::new(source, &tables, strategy)?
                .with_start_index(request.start_index);
            let panels = match &request.section {
                SectionFilter::Section(name) if entries.is_empty() => {
                    vec![assembler.placeholder_section(name)]
                }
                _ => assembler.assemble(&entries, request.section.is_all()),
            };
            PageBody::Sections(panels)
        }
    };

    info!(
        view = strategy.name,
        section = request.section.label(),
        responses = bundle.responses.len(),
        collapsed,
        "built results page"
    );

    Ok(ResultsPage {
        session_panel: session_panel(bundle, request, permissions),
        filter_panel: filter_panel(bundle, request, collapsed, sections),
        body,
        panels_collapsed: collapsed,
        advisory,
    })
}

fn question_tables(
    bundle: &ResultsBundle,
    request: &ResultsRequest,
    config: &RenderConfig,
    permissions: &dyn PermissionChecker,
) -> (Vec<QuestionTable>, usize) {
    let scoped;
    let source = match &request.section {
        SectionFilter::All => bundle,
        SectionFilter::Section(name) => {
            scoped = bundle.restricted_to_section(name, None);
            &scoped
        }
    };
    let rows = RowBuilder::new(
        source,
        request.view.strategy(),
        permissions,
        config,
        &request.section,
    );
    let tables = TableBuilder::new(rows, request.show_stats);
    let question_tables = source
        .question_response_map()
        .iter()
        .map(|group| tables.question_table(group.question, &group.responses))
        .collect();
    (question_tables, source.responses.len())
}

/// One panel per section, plus the default section, each fetched later.
fn deferred_section_panels(sections: &[String]) -> Vec<SectionPanel> {
    let mut panels: Vec<SectionPanel> = sections
        .iter()
        .filter(|section| section.as_str() != DEFAULT_SECTION)
        .map(|section| {
            let mut panel = SectionPanel::new(section);
            panel.load_by_ajax = true;
            panel
        })
        .collect();
    let mut default_panel = SectionPanel::new(DEFAULT_SECTION);
    default_panel.load_by_ajax = true;
    panels.push(default_panel);
    panels
}

fn session_panel(
    bundle: &ResultsBundle,
    request: &ResultsRequest,
    permissions: &dyn PermissionChecker,
) -> SessionPanel {
    let session = &bundle.session;
    let can_modify = permissions.can_modify_session();
    SessionPanel {
        course_id: session.course_id.clone(),
        session_name: session.name.clone(),
        start_time: session.start_time,
        end_time: session.end_time,
        published: session.published,
        selected_section: request.section.label().to_string(),
        edit_link: can_modify.then(|| session_link(EDIT_PAGE, bundle)),
        publish_label: can_modify.then(|| {
            if session.published {
                "Unpublish Results".to_string()
            } else {
                "Publish Results".to_string()
            }
        }),
    }
}

fn filter_panel(
    bundle: &ResultsBundle,
    request: &ResultsRequest,
    collapsed: bool,
    sections: Vec<String>,
) -> FilterPanel {
    FilterPanel {
        stats_shown: request.show_stats,
        panels_collapsed: collapsed,
        all_sections_selected: request.section.is_all(),
        selected_section: request.section.label().to_string(),
        grouped_by_team: request.group_by_team,
        sort_type: request.view.as_str().to_string(),
        results_link: session_link(RESULTS_PAGE, bundle),
        sections,
    }
}

fn session_link(page: &str, bundle: &ResultsBundle) -> String {
    format!(
        "{page}?courseid={}&fsname={}",
        bundle.session.course_id, bundle.session.name
    )
}

/// Advisory shown when results could not be assembled in one page.
pub fn exceeding_responses_message(config: &RenderConfig) -> String {
    let limit = group_thousands(config.advisory_entry_limit);
    let email = &config.support_email;
    format!(
        "Sorry, we could not retrieve results. Please try again in a few minutes. \
         If you continue to see this message, it could be because the report you are trying \
         to display contains too much data to display in one page. e.g. more than {limit} entries.\
         <ul><li>If that is the case, you can still use the 'By question' report to view responses. \
         You can also download the results as a spreadsheet. If you would like to see the responses \
         in other formats (e.g. 'Group by - Giver'), you can try to divide the course into smaller \
         sections so that we can display responses one section at a time.</li>\
         <li>If you believe the report you are trying to view is unlikely to have more than {limit} \
         entries, please contact us at <a href='mailto:{email}'>{email}</a> so that we can \
         investigate.</li></ul>"
    )
}

fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::fixtures::*;
    use crate::models::{ParticipantType, Response, ResultsData};
    use crate::permissions::InstructorPrivileges;

    fn two_section_data(responses: impl FnOnce(&[crate::models::Student]) -> Vec<Response>) -> ResultsData {
        let students = two_section_students();
        let responses = responses(&students);
        let q1 = question("q1", 1, ParticipantType::Students, ParticipantType::OwnTeamMembers);
        data(students, vec![q1], responses)
    }

    fn alice_to_bob() -> ResultsBundle {
        let data = two_section_data(|s| {
            vec![response(s, "q1", "alice@example.com", "bob@example.com", "great")]
        });
        ResultsBundle::new(data).expect("valid bundle")
    }

    fn render(bundle: &ResultsBundle, request: &ResultsRequest) -> ResultsPage {
        build_page(
            bundle,
            request,
            &RenderConfig::default(),
            &InstructorPrivileges::co_owner(),
        )
        .expect("page builds")
    }

    #[test]
    fn giver_view_fills_both_sections() {
        let bundle = alice_to_bob();
        let page = render(&bundle, &ResultsRequest::new(ViewMode::GiverQuestionRecipient));

        let names: Vec<&str> = page.sections().iter().map(|p| p.section_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let t1 = page.section("A").and_then(|s| s.team("T1")).expect("T1 in A");
        let alice = t1.participant("alice@example.com").expect("alice");
        assert!(alice.has_responses);
        assert_eq!(alice.question_tables.len(), 1);
        let real_rows: Vec<_> = alice.question_tables[0]
            .rows
            .iter()
            .filter(|r| !r.is_missing)
            .collect();
        assert_eq!(real_rows.len(), 1);
        assert_eq!(real_rows[0].recipient_name, "Bob");
        let bob = t1.participant("bob@example.com").expect("bob");
        assert!(!bob.has_responses);

        let b = page.section("B").expect("B");
        assert!(b.teams.iter().all(|t| !t.has_responses));
        assert_eq!(b.participant_count(), 2);
        assert!(!page.panels_collapsed);
        assert!(page.advisory.is_none());
    }

    #[test]
    fn incomplete_bundle_defers_every_section() {
        let mut data = two_section_data(|_| Vec::new());
        data.is_complete = false;
        let bundle = ResultsBundle::new(data).expect("valid bundle");
        let mut request = ResultsRequest::new(ViewMode::GiverQuestionRecipient);
        request.sections = vec!["A".to_string(), "B".to_string()];
        let page = render(&bundle, &request);

        let names: Vec<&str> = page.sections().iter().map(|p| p.section_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", DEFAULT_SECTION]);
        assert!(page.sections().iter().all(|p| p.load_by_ajax && p.is_empty()));
        assert!(page.panels_collapsed);
        assert!(page.filter_panel.panels_collapsed);
        assert!(page.advisory.as_deref().is_some_and(|m| m.contains("2,500 entries")));
    }

    #[test]
    fn incomplete_bundle_for_one_section_cannot_load() {
        let mut data = two_section_data(|_| Vec::new());
        data.is_complete = false;
        let bundle = ResultsBundle::new(data).expect("valid bundle");
        let mut request = ResultsRequest::new(ViewMode::RecipientQuestionGiver);
        request.section = SectionFilter::Section("B".to_string());
        let page = render(&bundle, &request);

        assert_eq!(page.sections().len(), 1);
        assert!(!page.sections()[0].able_to_load);
        assert!(!page.panels_collapsed);
        assert!(page.advisory.is_some());
    }

    #[test]
    fn no_responses_produce_no_section_panels() {
        let bundle = ResultsBundle::new(two_section_data(|_| Vec::new())).expect("valid bundle");
        let page = render(&bundle, &ResultsRequest::new(ViewMode::GiverQuestionRecipient));
        assert!(page.sections().is_empty());
    }

    #[test]
    fn many_responses_collapse_but_stay_populated() {
        let data = two_section_data(|s| {
            (0..501)
                .map(|i| response(s, "q1", "alice@example.com", "bob@example.com", &format!("answer {i}")))
                .collect()
        });
        let bundle = ResultsBundle::new(data).expect("valid bundle");
        let page = render(&bundle, &ResultsRequest::new(ViewMode::GiverQuestionRecipient));

        assert!(page.panels_collapsed);
        let alice = page
            .section("A")
            .and_then(|s| s.team("T1"))
            .and_then(|t| t.participant("alice@example.com"))
            .expect("alice");
        assert_eq!(alice.question_tables[0].rows.len(), 501);
    }

    #[test]
    fn collapse_threshold_is_configurable() {
        let bundle = alice_to_bob();
        let config = RenderConfig {
            collapse_threshold: 0,
            ..RenderConfig::default()
        };
        let page = build_page(
            &bundle,
            &ResultsRequest::new(ViewMode::Question),
            &config,
            &InstructorPrivileges::co_owner(),
        )
        .expect("page builds");
        assert!(page.panels_collapsed);
    }

    #[test]
    fn selected_section_yields_one_section_panel() {
        let data = two_section_data(|s| {
            vec![
                response(s, "q1", "alice@example.com", "bob@example.com", "great"),
                response(s, "q1", "carol@example.com", "dan@example.com", "fine"),
            ]
        });
        let bundle = ResultsBundle::new(data).expect("valid bundle");
        let mut request = ResultsRequest::new(ViewMode::GiverQuestionRecipient);
        request.section = SectionFilter::Section("B".to_string());
        let page = render(&bundle, &request);

        assert_eq!(page.sections().len(), 1);
        assert_eq!(page.sections()[0].section_name, "B");
        assert!(!page.filter_panel.all_sections_selected);
        assert_eq!(page.session_panel.selected_section, "B");
    }

    #[test]
    fn selected_section_without_responses_is_back_filled() {
        let bundle = alice_to_bob();
        let mut request = ResultsRequest::new(ViewMode::GiverQuestionRecipient);
        request.section = SectionFilter::Section("B".to_string());
        let page = render(&bundle, &request);

        assert_eq!(page.sections().len(), 1);
        let b = &page.sections()[0];
        assert_eq!(b.section_name, "B");
        assert_eq!(b.participant_count(), 2);
        assert!(b.teams.iter().all(|t| !t.has_responses));
        assert!(b.statistics_header.is_some());
    }

    #[test]
    fn collapse_counts_only_the_selected_section() {
        let data = two_section_data(|s| {
            let mut responses: Vec<Response> = (0..3)
                .map(|i| response(s, "q1", "alice@example.com", "bob@example.com", &format!("a{i}")))
                .collect();
            responses.push(response(s, "q1", "carol@example.com", "dan@example.com", "fine"));
            responses
        });
        let bundle = ResultsBundle::new(data).expect("valid bundle");
        let config = RenderConfig {
            collapse_threshold: 2,
            ..RenderConfig::default()
        };
        let privileges = InstructorPrivileges::co_owner();
        for view in [ViewMode::Question, ViewMode::GiverQuestionRecipient] {
            let mut request = ResultsRequest::new(view);
            request.section = SectionFilter::Section("B".to_string());
            let page = build_page(&bundle, &request, &config, &privileges).expect("page builds");
            assert!(!page.panels_collapsed);

            request.section = SectionFilter::Section("A".to_string());
            let page = build_page(&bundle, &request, &config, &privileges).expect("page builds");
            assert!(page.panels_collapsed);
        }
    }

    #[test]
    fn hidden_giver_is_not_revealed_by_grouping() {
        let mut data = two_section_data(|s| {
            vec![response(s, "q1", "alice@example.com", "bob@example.com", "great")]
        });
        let hidden = data.responses[0].id;
        data.hidden_givers.insert(hidden);
        let bundle = ResultsBundle::new(data).expect("valid bundle");
        let page = render(&bundle, &ResultsRequest::new(ViewMode::GiverQuestionRecipient));

        let a = page.section("A").expect("A");
        let anonymous = a
            .teams
            .iter()
            .flat_map(|t| t.participants.iter())
            .find(|p| p.has_responses)
            .expect("panel with the hidden response");
        assert_eq!(anonymous.identifier, "Anonymous student 1");
        assert_eq!(anonymous.name, "Anonymous student");
        assert!(a.team("Anonymous student 1").is_some());

        // alice is listed with her team like any member who did not respond.
        let t1 = a.team("T1").expect("T1");
        assert!(!t1.has_responses);
        assert!(t1.participants.iter().all(|p| !p.has_responses));
        assert_eq!(t1.participants.len(), 2);

        let json = serde_json::to_string(anonymous).expect("serializes");
        assert!(!json.contains("alice"));
    }

    #[test]
    fn question_view_builds_one_table_per_question() {
        let bundle = alice_to_bob();
        let page = render(&bundle, &ResultsRequest::new(ViewMode::Question));

        let tables = page.question_tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].response_count, 1);
        assert!(page.sections().is_empty());
        assert_eq!(page.filter_panel.sort_type, "question");
    }

    #[test]
    fn rendering_twice_gives_identical_pages() {
        let bundle = alice_to_bob();
        for view in [
            ViewMode::Question,
            ViewMode::GiverQuestionRecipient,
            ViewMode::RecipientQuestionGiver,
        ] {
            let request = ResultsRequest::new(view);
            assert_eq!(render(&bundle, &request), render(&bundle, &request));
        }
    }

    #[test]
    fn session_controls_require_modify_privilege() {
        let bundle = alice_to_bob();
        let page = build_page(
            &bundle,
            &ResultsRequest::new(ViewMode::Question),
            &RenderConfig::default(),
            &InstructorPrivileges::default(),
        )
        .expect("page builds");
        assert!(page.session_panel.edit_link.is_none());
        assert!(page.session_panel.publish_label.is_none());

        let page = render(&bundle, &ResultsRequest::new(ViewMode::Question));
        assert_eq!(
            page.session_panel.edit_link.as_deref(),
            Some("/page/instructorFeedbackEditPage?courseid=CS2103&fsname=Peer Review 1")
        );
        assert_eq!(page.session_panel.publish_label.as_deref(), Some("Publish Results"));
    }

    #[test]
    fn section_filter_parses_all() {
        assert_eq!(SectionFilter::from_arg(None), SectionFilter::All);
        assert_eq!(SectionFilter::from_arg(Some("All".into())), SectionFilter::All);
        assert_eq!(
            SectionFilter::from_arg(Some("A".into())),
            SectionFilter::Section("A".into())
        );
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(2_500), "2,500");
        assert_eq!(group_thousands(500), "500");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}

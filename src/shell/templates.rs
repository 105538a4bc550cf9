use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ratatui::style::{Modifier, Style};

use crate::ipc::{DocumentId, ExportFormat, TagRecord, TargetMode};
use crate::tui::{Element, FocusId, Theme};

use super::app::ShellMsg;
use super::dispatch::SessionStats;
use super::editor::DocumentInfo;
use super::notify::ErrorNotice;
use super::popup::{FormState, PopupMsg};
use super::recent::RecentEntry;

/// Named content templates, wire names matching the core-side contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    TextfieldEntry,
    NumericTarget,
    FileInfoSummary,
    RecentDocumentList,
    ExportOptions,
    StatisticsSummary,
    FindReplace,
    FormattingMenu,
    TagCloud,
    ErrorDetail,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::TextfieldEntry => "textfield-entry",
            Template::NumericTarget => "numeric-target",
            Template::FileInfoSummary => "file-info-summary",
            Template::RecentDocumentList => "recent-document-list",
            Template::ExportOptions => "export-options",
            Template::StatisticsSummary => "statistics-summary",
            Template::FindReplace => "find-replace",
            Template::FormattingMenu => "formatting-menu",
            Template::TagCloud => "tag-cloud",
            Template::ErrorDetail => "error-detail",
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A template name plus its typed context, ready to render
#[derive(Debug, Clone)]
pub enum TemplateRequest {
    TextfieldEntry {
        title: String,
        placeholder: String,
        initial: String,
    },
    NumericTarget {
        document: DocumentId,
        mode: TargetMode,
        count: u32,
    },
    FileInfoSummary {
        info: DocumentInfo,
    },
    RecentDocumentList {
        entries: Vec<RecentEntry>,
    },
    ExportOptions {
        document: DocumentId,
        title: String,
    },
    StatisticsSummary {
        stats: SessionStats,
    },
    FindReplace,
    FormattingMenu,
    TagCloud {
        tags: Vec<TagRecord>,
    },
    /// Custom-CSS editor; renders through the textfield template
    CustomCss {
        initial: String,
    },
    ErrorDetail {
        notice: ErrorNotice,
    },
}

impl TemplateRequest {
    pub fn template(&self) -> Template {
        match self {
            TemplateRequest::TextfieldEntry { .. } | TemplateRequest::CustomCss { .. } => {
                Template::TextfieldEntry
            }
            TemplateRequest::NumericTarget { .. } => Template::NumericTarget,
            TemplateRequest::FileInfoSummary { .. } => Template::FileInfoSummary,
            TemplateRequest::RecentDocumentList { .. } => Template::RecentDocumentList,
            TemplateRequest::ExportOptions { .. } => Template::ExportOptions,
            TemplateRequest::StatisticsSummary { .. } => Template::StatisticsSummary,
            TemplateRequest::FindReplace => Template::FindReplace,
            TemplateRequest::FormattingMenu => Template::FormattingMenu,
            TemplateRequest::TagCloud { .. } => Template::TagCloud,
            TemplateRequest::ErrorDetail { .. } => Template::ErrorDetail,
        }
    }

    /// Panel title shown in the popup border
    pub fn heading(&self) -> String {
        match self {
            TemplateRequest::TextfieldEntry { title, .. } => title.clone(),
            TemplateRequest::NumericTarget { .. } => "Writing Target".into(),
            TemplateRequest::FileInfoSummary { info } => info.title.clone(),
            TemplateRequest::RecentDocumentList { .. } => "Recent Documents".into(),
            TemplateRequest::ExportOptions { title, .. } => format!("Export \"{title}\""),
            TemplateRequest::StatisticsSummary { .. } => "Statistics".into(),
            TemplateRequest::FindReplace => "Find & Replace".into(),
            TemplateRequest::FormattingMenu => "Formatting".into(),
            TemplateRequest::TagCloud { .. } => "Tags".into(),
            TemplateRequest::CustomCss { .. } => "Custom CSS".into(),
            TemplateRequest::ErrorDetail { notice } => notice.title.clone(),
        }
    }
}

/// Templating collaborator: turns a request plus the popup's live form state
/// into an element tree.
pub trait Templates {
    fn render(
        &self,
        request: &TemplateRequest,
        form: &FormState,
        theme: &Theme,
    ) -> Element<ShellMsg>;
}

/// Inline formatting actions (headings are rendered separately as a hover
/// row). The second column is the markdown marker handed to the editor.
pub const FORMATTING_ITEMS: [(&str, &str); 8] = [
    ("Bold", "**"),
    ("Italic", "*"),
    ("Inline code", "`"),
    ("Link", "[]()"),
    ("Blockquote", "> "),
    ("Bulleted list", "- "),
    ("Numbered list", "1. "),
    ("Divider", "---"),
];

pub const HEADING_LEVELS: u8 = 6;

pub fn heading_marker(level: u8) -> String {
    let mut marker = "#".repeat(level.clamp(1, HEADING_LEVELS) as usize);
    marker.push(' ');
    marker
}

/// Cumulative hover highlight: hovering level N lights up every level 1..=N
pub fn heading_levels_highlighted(hovered: Option<u8>) -> [bool; HEADING_LEVELS as usize] {
    let mut lit = [false; HEADING_LEVELS as usize];
    if let Some(n) = hovered {
        for level in 1..=n.min(HEADING_LEVELS) {
            lit[(level - 1) as usize] = true;
        }
    }
    lit
}

/// Indices into `entries` matching the query, best match first. An empty
/// query lists everything most-recent first.
pub fn filter_recent(entries: &[RecentEntry], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..entries.len()).rev().collect();
    }
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(usize, i64)> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| matcher.fuzzy_match(&e.title, query).map(|s| (i, s)))
        .collect();
    // Ties break toward the more recently opened entry
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
    scored.into_iter().map(|(i, _)| i).collect()
}

pub const POPUP_INPUT: FocusId = FocusId::new("popup-input");
pub const POPUP_INPUT_2: FocusId = FocusId::new("popup-input-2");
pub const POPUP_LIST: FocusId = FocusId::new("popup-list");

fn popup_msg(msg: PopupMsg) -> ShellMsg {
    ShellMsg::Popup(msg)
}

/// Production templates
pub struct BuiltinTemplates;

impl Templates for BuiltinTemplates {
    fn render(
        &self,
        request: &TemplateRequest,
        form: &FormState,
        theme: &Theme,
    ) -> Element<ShellMsg> {
        let body = match request {
            TemplateRequest::TextfieldEntry { placeholder, .. } => {
                textfield_body(form, placeholder, theme)
            }
            TemplateRequest::CustomCss { .. } => {
                textfield_body(form, "/* served to every rendered document */", theme)
            }
            TemplateRequest::NumericTarget { .. } => numeric_target_body(form, theme),
            TemplateRequest::FileInfoSummary { info } => file_info_body(info, theme),
            TemplateRequest::RecentDocumentList { entries } => {
                recent_list_body(entries, form, theme)
            }
            TemplateRequest::ExportOptions { .. } => export_body(form, theme),
            TemplateRequest::StatisticsSummary { stats } => stats_body(stats, theme),
            TemplateRequest::FindReplace => find_replace_body(form, theme),
            TemplateRequest::FormattingMenu => formatting_body(form, theme),
            TemplateRequest::TagCloud { tags } => tag_cloud_body(tags, form, theme),
            TemplateRequest::ErrorDetail { notice } => error_detail_body(notice, theme),
        };
        Element::panel(Element::container(body).padding(1).build())
            .title(request.heading())
            .build()
    }
}

fn ok_cancel_row(theme: &Theme) -> Element<ShellMsg> {
    Element::row(vec![
        Element::button(FocusId::new("popup-ok"), "OK")
            .on_press(popup_msg(PopupMsg::Submit))
            .style(Style::default().fg(theme.green))
            .build(),
        Element::button(FocusId::new("popup-cancel"), "Cancel")
            .on_press(popup_msg(PopupMsg::Cancel))
            .style(Style::default().fg(theme.overlay1))
            .build(),
    ])
    .build()
}

fn textfield_body(form: &FormState, placeholder: &str, theme: &Theme) -> Element<ShellMsg> {
    let field = &form.fields[0];
    Element::column(vec![
        Element::text_input(POPUP_INPUT, &field.value, &field.input)
            .placeholder(placeholder)
            .on_change(|key| popup_msg(PopupMsg::TextKey(key)))
            .on_submit(popup_msg(PopupMsg::Submit))
            .build(),
        Element::None,
        ok_cancel_row(theme),
    ])
    .build()
}

fn numeric_target_body(form: &FormState, theme: &Theme) -> Element<ShellMsg> {
    let field = &form.fields[0];
    Element::column(vec![
        Element::styled("Target count", theme.dimmed()),
        Element::text_input(POPUP_INPUT, &field.value, &field.input)
            .placeholder("0")
            .on_change(|key| popup_msg(PopupMsg::TextKey(key)))
            .on_submit(popup_msg(PopupMsg::Submit))
            .build(),
        Element::button(
            FocusId::new("popup-mode"),
            format!("Mode: {}", form.mode.label()),
        )
        .on_press(popup_msg(PopupMsg::ToggleMode))
        .build(),
        ok_cancel_row(theme),
    ])
    .build()
}

fn labelled(label: &str, value: String, theme: &Theme) -> Element<ShellMsg> {
    Element::row(vec![
        Element::styled(format!("{label}:"), theme.dimmed()),
        Element::text(value),
    ])
    .build()
}

fn file_info_body(info: &DocumentInfo, theme: &Theme) -> Element<ShellMsg> {
    Element::column(vec![
        labelled("Words", info.words.to_string(), theme),
        labelled("Characters", info.chars.to_string(), theme),
        labelled("Identifier", info.id.0.to_string(), theme),
    ])
    .spacing(0)
    .build()
}

fn stats_body(stats: &SessionStats, theme: &Theme) -> Element<ShellMsg> {
    Element::column(vec![
        labelled("Words written", stats.words_total.to_string(), theme),
        labelled("Characters", stats.chars_total.to_string(), theme),
        labelled("Documents", stats.documents.to_string(), theme),
    ])
    .spacing(0)
    .build()
}

fn recent_list_body(
    entries: &[RecentEntry],
    form: &FormState,
    theme: &Theme,
) -> Element<ShellMsg> {
    let filter = &form.fields[0];
    let rows: Vec<Element<ShellMsg>> = filter_recent(entries, &filter.value)
        .into_iter()
        .map(|i| Element::text(entries[i].title.clone()))
        .collect();
    let list: Element<ShellMsg> = if rows.is_empty() {
        Element::styled("No matching documents", theme.dimmed())
    } else {
        Element::list(POPUP_LIST, rows, &form.list)
            .on_activate(|i| popup_msg(PopupMsg::Pick(i)))
            .on_navigate(|key| popup_msg(PopupMsg::ListNav(key)))
            .build()
    };
    Element::column(vec![
        Element::text_input(POPUP_INPUT, &filter.value, &filter.input)
            .placeholder("filter by title")
            .on_change(|key| popup_msg(PopupMsg::TextKey(key)))
            .on_submit(popup_msg(PopupMsg::Submit))
            .build(),
        list,
    ])
    .spacing(1)
    .build()
}

fn export_body(form: &FormState, _theme: &Theme) -> Element<ShellMsg> {
    let rows: Vec<Element<ShellMsg>> = ExportFormat::ALL
        .iter()
        .map(|format| Element::text(format.label()))
        .collect();
    Element::list(POPUP_LIST, rows, &form.list)
        .on_activate(|i| popup_msg(PopupMsg::Pick(i)))
        .on_navigate(|key| popup_msg(PopupMsg::ListNav(key)))
        .build()
}

fn tag_cloud_body(tags: &[TagRecord], form: &FormState, theme: &Theme) -> Element<ShellMsg> {
    if tags.is_empty() {
        return Element::styled("No tags in the database", theme.dimmed());
    }
    let rows: Vec<Element<ShellMsg>> = tags
        .iter()
        .map(|tag| Element::text(format!("#{} ({})", tag.name, tag.count)))
        .collect();
    Element::list(POPUP_LIST, rows, &form.list)
        .on_activate(|i| popup_msg(PopupMsg::Pick(i)))
        .on_navigate(|key| popup_msg(PopupMsg::ListNav(key)))
        .build()
}

fn find_replace_body(form: &FormState, theme: &Theme) -> Element<ShellMsg> {
    let term = &form.fields[0];
    let replacement = &form.fields[1];
    Element::column(vec![
        Element::styled("Find", theme.dimmed()),
        Element::text_input(POPUP_INPUT, &term.value, &term.input)
            .placeholder("search term")
            .on_change(|key| popup_msg(PopupMsg::TextKey(key)))
            .on_submit(popup_msg(PopupMsg::FindNext))
            .build(),
        Element::styled("Replace with", theme.dimmed()),
        Element::text_input(POPUP_INPUT_2, &replacement.value, &replacement.input)
            .placeholder("replacement")
            .on_change(|key| popup_msg(PopupMsg::SecondKey(key)))
            .on_submit(popup_msg(PopupMsg::ReplaceOne))
            .build(),
        Element::row(vec![
            Element::button(FocusId::new("popup-find-next"), "Next")
                .on_press(popup_msg(PopupMsg::FindNext))
                .build(),
            Element::button(FocusId::new("popup-replace-one"), "Replace")
                .on_press(popup_msg(PopupMsg::ReplaceOne))
                .build(),
            Element::button(FocusId::new("popup-replace-all"), "Replace All")
                .on_press(popup_msg(PopupMsg::ReplaceAll))
                .style(Style::default().fg(theme.peach))
                .build(),
        ])
        .build(),
    ])
    .build()
}

const HEADING_BUTTON_IDS: [FocusId; HEADING_LEVELS as usize] = [
    FocusId::new("popup-h1"),
    FocusId::new("popup-h2"),
    FocusId::new("popup-h3"),
    FocusId::new("popup-h4"),
    FocusId::new("popup-h5"),
    FocusId::new("popup-h6"),
];

fn formatting_body(form: &FormState, theme: &Theme) -> Element<ShellMsg> {
    let lit = heading_levels_highlighted(form.hovered_heading);
    let headings: Vec<Element<ShellMsg>> = (1..=HEADING_LEVELS)
        .map(|level| {
            let idx = (level - 1) as usize;
            let style = if lit[idx] {
                Style::default().fg(theme.mauve).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            };
            Element::button(HEADING_BUTTON_IDS[idx].clone(), format!("H{level}"))
                .on_press(popup_msg(PopupMsg::PickHeading(level)))
                .on_hover(popup_msg(PopupMsg::HoverHeading(level)))
                .on_hover_exit(popup_msg(PopupMsg::HoverClear))
                .style(style)
                .build()
        })
        .collect();
    let rows: Vec<Element<ShellMsg>> = FORMATTING_ITEMS
        .iter()
        .map(|(label, marker)| Element::text(format!("{label:<14}{marker}")))
        .collect();
    crate::tui::element::ColumnBuilder::new()
        .add(
            Element::row(headings).spacing(0).build(),
            crate::tui::LayoutConstraint::Length(3),
        )
        .add(
            Element::list(POPUP_LIST, rows, &form.list)
                .on_activate(|i| popup_msg(PopupMsg::Pick(i)))
                .on_navigate(|key| popup_msg(PopupMsg::ListNav(key)))
                .build(),
            crate::tui::LayoutConstraint::Fill(1),
        )
        .build()
}

fn error_detail_body(notice: &ErrorNotice, theme: &Theme) -> Element<ShellMsg> {
    let mut rows = vec![Element::styled(notice.message.clone(), theme.error())];
    if let Some(details) = &notice.details {
        rows.push(Element::None);
        for line in details.lines() {
            rows.push(Element::styled(line.to_string(), theme.dimmed()));
        }
    }
    rows.push(Element::None);
    rows.push(
        Element::button(FocusId::new("popup-dismiss-error"), "Dismiss")
            .on_press(ShellMsg::DismissError)
            .build(),
    );
    Element::column(rows).build()
}

use std::collections::VecDeque;

use crossterm::event::KeyCode;
use serde_json::{Map, Value};

use crate::ipc::{ExportFormat, TargetMode};
use crate::tui::widgets::{ListState, TextInputState};
use crate::tui::FocusId;

use super::editor::SearchOp;
use super::overlay::OverlayId;
use super::templates::{
    filter_recent, heading_marker, Template, TemplateRequest, FORMATTING_ITEMS, POPUP_INPUT,
    POPUP_LIST,
};

/// Form values a popup hands back on submission, keyed by field name
pub type FormValues = Map<String, Value>;

/// Completion callback: `Some(values)` on submit, `None` on dismissal
pub type CloseCallback = Box<dyn FnOnce(Option<FormValues>)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentOptions {
    /// Persistent popups ignore soft dismissal (Escape); only an explicit
    /// cancel or programmatic close takes them down.
    pub persistent: bool,
}

impl PresentOptions {
    pub fn persistent() -> Self {
        Self { persistent: true }
    }
}

/// Overlay-presentation collaborator
pub trait Presenter {
    fn present(
        &mut self,
        request: TemplateRequest,
        options: PresentOptions,
        on_close: CloseCallback,
    ) -> OverlayId;

    /// Close without submission; false if the id is not the open popup
    fn dismiss(&mut self, id: OverlayId) -> bool;
}

/// Messages the popup layer handles while open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupMsg {
    TextKey(KeyCode),
    SecondKey(KeyCode),
    ListNav(KeyCode),
    Pick(usize),
    PickHeading(u8),
    Submit,
    Cancel,
    /// Soft dismissal (Escape); no-op for persistent popups
    Dismiss,
    ToggleMode,
    HoverHeading(u8),
    HoverClear,
    FindNext,
    ReplaceOne,
    ReplaceAll,
}

pub struct FormField {
    pub name: &'static str,
    pub value: String,
    pub input: TextInputState,
}

impl FormField {
    fn new(name: &'static str, initial: impl Into<String>) -> Self {
        let value = initial.into();
        let mut input = TextInputState::new();
        input.move_to_end(&value);
        Self { name, value, input }
    }
}

/// Live state of the open popup's form, fed back into template rendering
pub struct FormState {
    pub fields: Vec<FormField>,
    pub list: ListState,
    pub mode: TargetMode,
    pub hovered_heading: Option<u8>,
}

impl FormState {
    pub fn empty() -> Self {
        Self {
            fields: Vec::new(),
            list: ListState::new(),
            mode: TargetMode::Words,
            hovered_heading: None,
        }
    }

    fn for_request(request: &TemplateRequest) -> Self {
        let mut form = Self::empty();
        match request {
            TemplateRequest::TextfieldEntry { initial, .. } => {
                form.fields.push(FormField::new("value", initial.clone()));
            }
            TemplateRequest::CustomCss { initial } => {
                form.fields.push(FormField::new("css", initial.clone()));
            }
            TemplateRequest::NumericTarget { mode, count, .. } => {
                form.fields.push(FormField::new("count", count.to_string()));
                form.mode = *mode;
            }
            TemplateRequest::RecentDocumentList { .. } => {
                form.fields.push(FormField::new("filter", ""));
                form.list = ListState::with_selection();
            }
            TemplateRequest::FindReplace => {
                form.fields.push(FormField::new("term", ""));
                form.fields.push(FormField::new("replacement", ""));
            }
            TemplateRequest::ExportOptions { .. }
            | TemplateRequest::FormattingMenu
            | TemplateRequest::TagCloud { .. } => {
                form.list = ListState::with_selection();
            }
            TemplateRequest::FileInfoSummary { .. }
            | TemplateRequest::StatisticsSummary { .. }
            | TemplateRequest::ErrorDetail { .. } => {}
        }
        form
    }
}

/// Live action requested from an open popup (popup stays up)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupAction {
    Search(SearchOp),
}

#[derive(Debug, PartialEq, Eq)]
pub enum HostEvent {
    None,
    /// The popup closed; its completion callback already ran
    Completed,
    Action(PopupAction),
}

struct ActivePopup {
    id: OverlayId,
    request: TemplateRequest,
    options: PresentOptions,
    form: FormState,
    on_close: Option<CloseCallback>,
}

/// Production presenter: drives at most one modal popup at a time as a layer
/// in the Elm view. Presenting while one is open dismisses the old popup
/// first (its callback sees `None`).
#[derive(Default)]
pub struct PopupHost {
    active: Option<ActivePopup>,
    next_id: u64,
    pending_focus: Option<FocusId>,
}

const LIST_VISIBLE_ROWS: usize = 8;

impl PopupHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<(&TemplateRequest, &FormState, PresentOptions)> {
        self.active
            .as_ref()
            .map(|p| (&p.request, &p.form, p.options))
    }

    /// Focus the runtime should claim for a freshly presented popup
    pub fn take_pending_focus(&mut self) -> Option<FocusId> {
        self.pending_focus.take()
    }

    fn complete(&mut self, values: Option<FormValues>) {
        if let Some(mut popup) = self.active.take() {
            if let Some(on_close) = popup.on_close.take() {
                on_close(values);
            }
        }
    }

    fn list_len(request: &TemplateRequest, form: &FormState) -> usize {
        match request {
            TemplateRequest::RecentDocumentList { entries } => {
                let filter = form.fields.first().map(|f| f.value.as_str()).unwrap_or("");
                filter_recent(entries, filter).len()
            }
            TemplateRequest::ExportOptions { .. } => ExportFormat::ALL.len(),
            TemplateRequest::FormattingMenu => FORMATTING_ITEMS.len(),
            TemplateRequest::TagCloud { tags } => tags.len(),
            _ => 0,
        }
    }

    fn pick_values(request: &TemplateRequest, form: &FormState, index: usize) -> Option<FormValues> {
        let mut values = FormValues::new();
        match request {
            TemplateRequest::RecentDocumentList { entries } => {
                let filter = form.fields.first().map(|f| f.value.as_str()).unwrap_or("");
                let hits = filter_recent(entries, filter);
                let entry = &entries[*hits.get(index)?];
                values.insert("hash".into(), Value::from(entry.id.0));
            }
            TemplateRequest::ExportOptions { .. } => {
                let format = ExportFormat::ALL.get(index)?;
                values.insert(
                    "format".into(),
                    serde_json::to_value(format).unwrap_or(Value::Null),
                );
            }
            TemplateRequest::FormattingMenu => {
                let (_, marker) = FORMATTING_ITEMS.get(index)?;
                values.insert("marker".into(), Value::from(*marker));
            }
            TemplateRequest::TagCloud { tags } => {
                let tag = tags.get(index)?;
                values.insert("tag".into(), Value::from(tag.name.clone()));
            }
            _ => return None,
        }
        Some(values)
    }

    fn search_term(form: &FormState) -> Option<(String, bool)> {
        let raw = form.fields.first().map(|f| f.value.as_str()).unwrap_or("");
        if raw.is_empty() {
            return None;
        }
        // `/pattern/` means regex match mode
        if raw.len() > 2 && raw.starts_with('/') && raw.ends_with('/') {
            Some((raw[1..raw.len() - 1].to_string(), true))
        } else {
            Some((raw.to_string(), false))
        }
    }

    pub fn handle(&mut self, msg: PopupMsg) -> HostEvent {
        let Some(popup) = self.active.as_mut() else {
            return HostEvent::None;
        };
        match msg {
            PopupMsg::TextKey(key) => {
                if let Some(field) = popup.form.fields.first_mut() {
                    if field.input.apply_key(key, &mut field.value) {
                        // Filter changed: restart selection at the best match
                        if matches!(popup.request, TemplateRequest::RecentDocumentList { .. }) {
                            popup.form.list.select(Some(0));
                            let len = Self::list_len(&popup.request, &popup.form);
                            popup.form.list.clamp(len);
                        }
                    }
                }
                HostEvent::None
            }
            PopupMsg::SecondKey(key) => {
                if let Some(field) = popup.form.fields.get_mut(1) {
                    field.input.apply_key(key, &mut field.value);
                }
                HostEvent::None
            }
            PopupMsg::ListNav(key) => {
                let len = Self::list_len(&popup.request, &popup.form);
                popup.form.list.handle_key(key, len, LIST_VISIBLE_ROWS);
                HostEvent::None
            }
            PopupMsg::Pick(index) => {
                match Self::pick_values(&popup.request, &popup.form, index) {
                    Some(values) => {
                        self.complete(Some(values));
                        HostEvent::Completed
                    }
                    None => HostEvent::None,
                }
            }
            PopupMsg::PickHeading(level) => {
                let mut values = FormValues::new();
                values.insert("marker".into(), Value::from(heading_marker(level)));
                self.complete(Some(values));
                HostEvent::Completed
            }
            PopupMsg::Submit => match popup.request.template() {
                Template::TextfieldEntry => {
                    let mut values = FormValues::new();
                    let field = &popup.form.fields[0];
                    values.insert(field.name.into(), Value::from(field.value.clone()));
                    self.complete(Some(values));
                    HostEvent::Completed
                }
                Template::NumericTarget => {
                    let count: u32 = popup.form.fields[0].value.trim().parse().unwrap_or(0);
                    let mut values = FormValues::new();
                    values.insert("count".into(), Value::from(count));
                    values.insert(
                        "mode".into(),
                        serde_json::to_value(popup.form.mode).unwrap_or(Value::Null),
                    );
                    self.complete(Some(values));
                    HostEvent::Completed
                }
                Template::RecentDocumentList
                | Template::ExportOptions
                | Template::FormattingMenu
                | Template::TagCloud => match popup.form.list.selected() {
                    Some(selected) => self.handle(PopupMsg::Pick(selected)),
                    None => HostEvent::None,
                },
                Template::FindReplace => self.handle(PopupMsg::FindNext),
                Template::FileInfoSummary
                | Template::StatisticsSummary
                | Template::ErrorDetail => {
                    self.complete(None);
                    HostEvent::Completed
                }
            },
            PopupMsg::Cancel => {
                self.complete(None);
                HostEvent::Completed
            }
            PopupMsg::Dismiss => {
                if popup.options.persistent {
                    HostEvent::None
                } else {
                    self.complete(None);
                    HostEvent::Completed
                }
            }
            PopupMsg::ToggleMode => {
                popup.form.mode = match popup.form.mode {
                    TargetMode::Words => TargetMode::Chars,
                    TargetMode::Chars => TargetMode::Words,
                };
                HostEvent::None
            }
            PopupMsg::HoverHeading(level) => {
                popup.form.hovered_heading = Some(level);
                HostEvent::None
            }
            PopupMsg::HoverClear => {
                popup.form.hovered_heading = None;
                HostEvent::None
            }
            PopupMsg::FindNext => match Self::search_term(&popup.form) {
                Some((term, regex)) => {
                    HostEvent::Action(PopupAction::Search(SearchOp::Next { term, regex }))
                }
                None => HostEvent::None,
            },
            PopupMsg::ReplaceOne | PopupMsg::ReplaceAll => {
                match Self::search_term(&popup.form) {
                    Some((term, _)) => {
                        let replacement = popup
                            .form
                            .fields
                            .get(1)
                            .map(|f| f.value.clone())
                            .unwrap_or_default();
                        HostEvent::Action(PopupAction::Search(SearchOp::Replace {
                            term,
                            replacement,
                            all: msg == PopupMsg::ReplaceAll,
                        }))
                    }
                    None => HostEvent::None,
                }
            }
        }
    }
}

fn initial_focus(request: &TemplateRequest) -> Option<FocusId> {
    match request.template() {
        Template::TextfieldEntry
        | Template::NumericTarget
        | Template::RecentDocumentList
        | Template::FindReplace => Some(POPUP_INPUT),
        Template::ExportOptions | Template::FormattingMenu | Template::TagCloud => {
            Some(POPUP_LIST)
        }
        Template::FileInfoSummary | Template::StatisticsSummary | Template::ErrorDetail => None,
    }
}

impl Presenter for PopupHost {
    fn present(
        &mut self,
        request: TemplateRequest,
        options: PresentOptions,
        on_close: CloseCallback,
    ) -> OverlayId {
        if self.active.is_some() {
            self.complete(None);
        }
        self.next_id += 1;
        let id = OverlayId::from_raw(self.next_id);
        let form = FormState::for_request(&request);
        self.pending_focus = initial_focus(&request);
        self.active = Some(ActivePopup {
            id,
            request,
            options,
            form,
            on_close: Some(on_close),
        });
        id
    }

    fn dismiss(&mut self, id: OverlayId) -> bool {
        if self.active.as_ref().is_some_and(|p| p.id == id) {
            self.complete(None);
            true
        } else {
            false
        }
    }
}

/// Scripted presenter for facade tests: completes each presented popup
/// immediately with the next scripted response (default: dismissal).
#[derive(Default)]
pub struct ScriptedPresenter {
    responses: VecDeque<Option<FormValues>>,
    presented: Vec<(Template, PresentOptions)>,
    next_id: u64,
}

impl ScriptedPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&mut self, response: Option<FormValues>) {
        self.responses.push_back(response);
    }

    pub fn presented(&self) -> Vec<Template> {
        self.presented.iter().map(|(t, _)| *t).collect()
    }

    pub fn last_options(&self) -> Option<PresentOptions> {
        self.presented.last().map(|(_, o)| *o)
    }
}

impl Presenter for ScriptedPresenter {
    fn present(
        &mut self,
        request: TemplateRequest,
        options: PresentOptions,
        on_close: CloseCallback,
    ) -> OverlayId {
        self.presented.push((request.template(), options));
        let response = self.responses.pop_front().unwrap_or(None);
        on_close(response);
        self.next_id += 1;
        OverlayId::from_raw(self.next_id)
    }

    fn dismiss(&mut self, _id: OverlayId) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::DocumentId;
    use crate::shell::recent::RecentEntry;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn capture() -> (CloseCallback, Rc<RefCell<Vec<Option<FormValues>>>>) {
        let seen: Rc<RefCell<Vec<Option<FormValues>>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let cb: CloseCallback = Box::new(move |values| sink.borrow_mut().push(values));
        (cb, seen)
    }

    fn type_str(host: &mut PopupHost, text: &str) {
        for ch in text.chars() {
            host.handle(PopupMsg::TextKey(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn textfield_submit_carries_typed_value() {
        let mut host = PopupHost::new();
        let (cb, seen) = capture();
        host.present(
            TemplateRequest::TextfieldEntry {
                title: "New file".into(),
                placeholder: "name".into(),
                initial: String::new(),
            },
            PresentOptions::default(),
            cb,
        );
        type_str(&mut host, "Notes");
        assert_eq!(host.handle(PopupMsg::Submit), HostEvent::Completed);

        let values = seen.borrow_mut().remove(0).unwrap();
        assert_eq!(values["value"], Value::from("Notes"));
        assert!(!host.is_open());
    }

    #[test]
    fn cancel_reports_dismissal() {
        let mut host = PopupHost::new();
        let (cb, seen) = capture();
        host.present(
            TemplateRequest::FindReplace,
            PresentOptions::default(),
            cb,
        );
        assert_eq!(host.handle(PopupMsg::Cancel), HostEvent::Completed);
        assert_eq!(seen.borrow().as_slice(), &[None]);
    }

    #[test]
    fn persistent_popup_ignores_soft_dismissal() {
        let mut host = PopupHost::new();
        let (cb, seen) = capture();
        host.present(
            TemplateRequest::CustomCss { initial: String::new() },
            PresentOptions::persistent(),
            cb,
        );
        assert_eq!(host.handle(PopupMsg::Dismiss), HostEvent::None);
        assert!(host.is_open());
        assert_eq!(host.handle(PopupMsg::Cancel), HostEvent::Completed);
        assert_eq!(seen.borrow().as_slice(), &[None]);
    }

    #[test]
    fn presenting_over_an_open_popup_dismisses_it_first() {
        let mut host = PopupHost::new();
        let (first_cb, first_seen) = capture();
        host.present(
            TemplateRequest::FormattingMenu,
            PresentOptions::default(),
            first_cb,
        );
        let (second_cb, _) = capture();
        host.present(
            TemplateRequest::FindReplace,
            PresentOptions::default(),
            second_cb,
        );
        assert_eq!(first_seen.borrow().as_slice(), &[None]);
        assert!(host.is_open());
    }

    #[test]
    fn recent_pick_resolves_through_the_active_filter() {
        let mut host = PopupHost::new();
        let (cb, seen) = capture();
        host.present(
            TemplateRequest::RecentDocumentList {
                entries: vec![
                    RecentEntry::new(DocumentId(1), "Meeting notes"),
                    RecentEntry::new(DocumentId(2), "Groceries"),
                ],
            },
            PresentOptions::default(),
            cb,
        );
        type_str(&mut host, "groc");
        assert_eq!(host.handle(PopupMsg::Pick(0)), HostEvent::Completed);

        let values = seen.borrow_mut().remove(0).unwrap();
        assert_eq!(values["hash"], Value::from(2u64));
    }

    #[test]
    fn slash_wrapped_term_requests_regex_search() {
        let mut host = PopupHost::new();
        let (cb, _) = capture();
        host.present(TemplateRequest::FindReplace, PresentOptions::default(), cb);
        type_str(&mut host, "/foo+/");
        match host.handle(PopupMsg::FindNext) {
            HostEvent::Action(PopupAction::Search(SearchOp::Next { term, regex })) => {
                assert_eq!(term, "foo+");
                assert!(regex);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(host.is_open(), "find actions keep the popup open");
    }

    #[test]
    fn heading_pick_submits_atx_marker() {
        let mut host = PopupHost::new();
        let (cb, seen) = capture();
        host.present(
            TemplateRequest::FormattingMenu,
            PresentOptions::default(),
            cb,
        );
        host.handle(PopupMsg::PickHeading(3));
        let values = seen.borrow_mut().remove(0).unwrap();
        assert_eq!(values["marker"], Value::from("### "));
    }
}

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::ipc::{
    Channel, CustomCssPayload, DocumentId, ExportFormat, ExportPayload, InboundEvent, MessageBus,
    NewEntryPayload, RenamePayload, TagRecord, TargetMode, TargetPayload,
};

use super::editor::{DocumentInfo, Editor, SearchOp};
use super::notify::Notifier;
use super::overlay::{OverlayId, QuicklookHandle, QuicklookShelf, QuicklookSurface};
use super::popup::{CloseCallback, FormValues, PresentOptions, Presenter};
use super::recent::{RecentDocuments, RecentEntry};
use super::templates::TemplateRequest;

/// Session counters pushed by the core, shown in the statistics popup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub words_total: u64,
    pub chars_total: u64,
    pub documents: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOp {
    Minimise,
    Maximise,
    Close,
}

/// Floating document preview pinned to the shelf
pub struct QuicklookPanel {
    info: DocumentInfo,
    handle: QuicklookHandle<QuicklookPanel>,
}

impl QuicklookPanel {
    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn document(&self) -> DocumentId {
        self.info.id
    }
}

impl QuicklookSurface for QuicklookPanel {
    fn close(&mut self) {
        log::debug!("closing quicklook for {}", self.info.title);
        // Teardown splices the panel out of the shelf itself, the same path
        // an explicit per-panel close takes.
        self.handle.dismiss();
    }
}

fn to_payload<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

fn submitted_name(values: &FormValues) -> Option<String> {
    let name = values.get("value")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// The single entry point other layers call to request a UI action. Every
/// operation follows the same shape: precondition check, typed template
/// request, popup presentation, message send on submission. Dismissal sends
/// nothing; unmet preconditions are silent no-ops.
pub struct Dispatcher {
    bus: Rc<dyn MessageBus>,
    presenter: Rc<RefCell<dyn Presenter>>,
    editor: Rc<dyn Editor>,
    notifier: Notifier,
    recent: RefCell<RecentDocuments>,
    quicklooks: QuicklookShelf<QuicklookPanel>,
    selected_dir: Cell<Option<DocumentId>>,
    stats: Cell<SessionStats>,
}

impl Dispatcher {
    pub fn new(
        bus: Rc<dyn MessageBus>,
        presenter: Rc<RefCell<dyn Presenter>>,
        editor: Rc<dyn Editor>,
        notifier: Notifier,
        recent_capacity: usize,
    ) -> Self {
        Self {
            bus,
            presenter,
            editor,
            notifier,
            recent: RefCell::new(RecentDocuments::new(recent_capacity)),
            quicklooks: QuicklookShelf::new(),
            selected_dir: Cell::new(None),
            stats: Cell::new(SessionStats::default()),
        }
    }

    fn present(
        &self,
        request: TemplateRequest,
        options: PresentOptions,
        on_close: CloseCallback,
    ) -> OverlayId {
        self.presenter.borrow_mut().present(request, options, on_close)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.get()
    }

    pub fn recent_documents(&self) -> Vec<RecentEntry> {
        self.recent.borrow().snapshot()
    }

    pub fn select_directory(&self, dir: Option<DocumentId>) {
        self.selected_dir.set(dir);
    }

    pub fn quicklooks(&self) -> &QuicklookShelf<QuicklookPanel> {
        &self.quicklooks
    }

    /// Apply an unsolicited core event. A newly opened document is returned
    /// so the caller can hand it to the editor pane.
    pub fn handle_event(&self, event: InboundEvent) -> Option<DocumentInfo> {
        match event {
            InboundEvent::DocumentOpened {
                hash,
                title,
                words,
                chars,
            } => {
                self.recent
                    .borrow_mut()
                    .record(RecentEntry::new(hash, title.clone()));
                Some(DocumentInfo {
                    id: hash,
                    title,
                    words,
                    chars,
                })
            }
            InboundEvent::Stats {
                words_total,
                chars_total,
                documents,
            } => {
                self.stats.set(SessionStats {
                    words_total,
                    chars_total,
                    documents,
                });
                None
            }
            InboundEvent::Error {
                title,
                message,
                details,
            } => {
                self.notifier.error(title, message, details);
                None
            }
        }
    }

    /// Prompt for a file name; `file-new` on submit. A selected directory
    /// becomes the parent, otherwise the core picks its default.
    pub fn request_file_name(&self) {
        let bus = Rc::clone(&self.bus);
        let dir = self.selected_dir.get();
        self.present(
            TemplateRequest::TextfieldEntry {
                title: "New File".into(),
                placeholder: "Untitled.md".into(),
                initial: String::new(),
            },
            PresentOptions::default(),
            Box::new(move |values| {
                let Some(values) = values else { return };
                let Some(name) = submitted_name(&values) else { return };
                bus.send(
                    Channel::FileNew,
                    to_payload(&NewEntryPayload { name, hash: dir }),
                );
            }),
        );
    }

    pub fn request_dir_name(&self) {
        self.request_new_entry_in_dir(Channel::DirNew, "New Directory");
    }

    /// Virtual directories collect files without moving them on disk
    pub fn request_virtual_dir_name(&self) {
        self.request_new_entry_in_dir(Channel::DirNewVd, "New Virtual Directory");
    }

    fn request_new_entry_in_dir(&self, channel: Channel, title: &str) {
        let Some(dir) = self.selected_dir.get() else {
            log::debug!("{channel}: no directory selected");
            return;
        };
        let bus = Rc::clone(&self.bus);
        self.present(
            TemplateRequest::TextfieldEntry {
                title: title.into(),
                placeholder: "name".into(),
                initial: String::new(),
            },
            PresentOptions::default(),
            Box::new(move |values| {
                let Some(values) = values else { return };
                let Some(name) = submitted_name(&values) else { return };
                bus.send(
                    channel,
                    to_payload(&NewEntryPayload {
                        name,
                        hash: Some(dir),
                    }),
                );
            }),
        );
    }

    /// Prompt to rename a directory; `dir-rename` on submit
    pub fn request_new_dir_name(&self, dir: DocumentId, current_name: &str) {
        self.request_rename(Channel::DirRename, dir, current_name);
    }

    /// Prompt to rename the current file; `file-rename` on submit
    pub fn request_new_file_name(&self) {
        let Some(doc) = self.editor.current_document() else {
            log::debug!("file-rename: no open document");
            return;
        };
        self.request_rename(Channel::FileRename, doc.id, &doc.title);
    }

    fn request_rename(&self, channel: Channel, hash: DocumentId, current_name: &str) {
        let bus = Rc::clone(&self.bus);
        self.present(
            TemplateRequest::TextfieldEntry {
                title: "Rename".into(),
                placeholder: "name".into(),
                initial: current_name.into(),
            },
            PresentOptions::default(),
            Box::new(move |values| {
                let Some(values) = values else { return };
                let Some(name) = submitted_name(&values) else { return };
                bus.send(channel, to_payload(&RenamePayload { name, hash }));
            }),
        );
    }

    /// Prompt for a writing target on the current document
    pub fn set_target(&self) {
        let Some(doc) = self.editor.current_document() else {
            log::debug!("set-target: no open document");
            return;
        };
        let bus = Rc::clone(&self.bus);
        self.present(
            TemplateRequest::NumericTarget {
                document: doc.id,
                mode: TargetMode::Words,
                count: 0,
            },
            PresentOptions::default(),
            Box::new(move |values| {
                let Some(values) = values else { return };
                let count = values.get("count").and_then(Value::as_u64).unwrap_or(0);
                let mode = values
                    .get("mode")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or(TargetMode::Words);
                bus.send(
                    Channel::SetTarget,
                    to_payload(&TargetPayload {
                        hash: doc.id,
                        mode,
                        count,
                    }),
                );
            }),
        );
    }

    pub fn display_export(&self) {
        let Some(doc) = self.editor.current_document() else {
            log::debug!("export: no open document");
            return;
        };
        let bus = Rc::clone(&self.bus);
        let hash = doc.id;
        self.present(
            TemplateRequest::ExportOptions {
                document: doc.id,
                title: doc.title,
            },
            PresentOptions::default(),
            Box::new(move |values| {
                let Some(values) = values else { return };
                let Some(format) = values
                    .get("format")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<ExportFormat>(v).ok())
                else {
                    return;
                };
                bus.send(Channel::Export, to_payload(&ExportPayload { hash, format }));
            }),
        );
    }

    pub fn display_file_info(&self) {
        let Some(info) = self.editor.current_document() else {
            log::debug!("file-info: no open document");
            return;
        };
        self.present(
            TemplateRequest::FileInfoSummary { info },
            PresentOptions::default(),
            Box::new(|_| {}),
        );
    }

    /// List recently opened documents; selection routes back to the editor
    pub fn display_recent_documents(&self) {
        let entries = self.recent.borrow().snapshot();
        if entries.is_empty() {
            log::debug!("recent-documents: list is empty");
            return;
        }
        let editor = Rc::clone(&self.editor);
        self.present(
            TemplateRequest::RecentDocumentList { entries },
            PresentOptions::default(),
            Box::new(move |values| {
                let Some(values) = values else { return };
                if let Some(hash) = values.get("hash").and_then(Value::as_u64) {
                    editor.dispatch_command("open-file", Value::from(hash));
                }
            }),
        );
    }

    pub fn display_stats(&self) {
        self.present(
            TemplateRequest::StatisticsSummary { stats: self.stats.get() },
            PresentOptions::default(),
            Box::new(|_| {}),
        );
    }

    /// Open find/replace. Without an open document this does nothing at all:
    /// no popup, no send.
    pub fn display_find(&self) {
        if self.editor.current_document().is_none() {
            log::debug!("find: no open document");
            return;
        }
        self.present(
            TemplateRequest::FindReplace,
            PresentOptions::default(),
            Box::new(|_| {}),
        );
    }

    /// Route a live search action from the find popup to the editor
    pub fn run_search(&self, op: SearchOp) {
        if self.editor.current_document().is_none() {
            return;
        }
        self.editor.search(op);
    }

    pub fn display_formatting(&self) {
        if self.editor.current_document().is_none() {
            log::debug!("formatting: no open document");
            return;
        }
        let editor = Rc::clone(&self.editor);
        self.present(
            TemplateRequest::FormattingMenu,
            PresentOptions::default(),
            Box::new(move |values| {
                let Some(values) = values else { return };
                if let Some(marker) = values.get("marker").and_then(Value::as_str) {
                    editor.dispatch_command("insert-marker", Value::from(marker));
                }
            }),
        );
    }

    /// Fetch the tag database (reply-style), then show it; picking a tag
    /// starts a tag search in the editor.
    pub fn display_tag_cloud(&self) {
        let presenter = Rc::clone(&self.presenter);
        let editor = Rc::clone(&self.editor);
        self.bus.request(
            Channel::GetTagsDatabase,
            Value::Null,
            Box::new(move |reply| {
                let tags: Vec<TagRecord> = serde_json::from_value(reply).unwrap_or_default();
                let editor = Rc::clone(&editor);
                presenter.borrow_mut().present(
                    TemplateRequest::TagCloud { tags },
                    PresentOptions::default(),
                    Box::new(move |values| {
                        let Some(values) = values else { return };
                        if let Some(tag) = values.get("tag").and_then(Value::as_str) {
                            editor.dispatch_command("search", Value::from(format!("#{tag}")));
                        }
                    }),
                );
            }),
        );
    }

    /// Fetch the stylesheet (reply-style), edit it in a persistent popup,
    /// and write it back with `set-custom-css` on submit.
    pub fn display_custom_css(&self) {
        let presenter = Rc::clone(&self.presenter);
        let bus = Rc::clone(&self.bus);
        self.bus.request(
            Channel::GetCustomCss,
            Value::Null,
            Box::new(move |reply| {
                let initial = reply.as_str().unwrap_or("").to_string();
                let bus = Rc::clone(&bus);
                presenter.borrow_mut().present(
                    TemplateRequest::CustomCss { initial },
                    PresentOptions::persistent(),
                    Box::new(move |values| {
                        let Some(values) = values else { return };
                        let Some(css) = values.get("css").and_then(Value::as_str) else {
                            return;
                        };
                        bus.send(
                            Channel::SetCustomCss,
                            to_payload(&CustomCssPayload { css: css.into() }),
                        );
                    }),
                );
            }),
        );
    }

    pub fn window_control(&self, op: WindowOp) {
        let channel = match op {
            WindowOp::Minimise => Channel::WinMinimise,
            WindowOp::Maximise => Channel::WinMaximise,
            WindowOp::Close => Channel::WinClose,
        };
        self.bus.send(channel, Value::Null);
    }

    pub fn open_quicklook(&self, info: DocumentInfo) -> OverlayId {
        self.quicklooks.open(|handle| QuicklookPanel { info, handle })
    }

    pub fn close_quicklook(&self, id: OverlayId) -> bool {
        self.quicklooks.dismiss(id)
    }

    pub fn close_all_quicklooks(&self) {
        self.quicklooks.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::RecordingBus;
    use crate::shell::editor::EditorPane;
    use crate::shell::popup::ScriptedPresenter;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        dispatcher: Dispatcher,
        bus: Rc<RecordingBus>,
        presenter: Rc<RefCell<ScriptedPresenter>>,
        editor: Rc<EditorPane>,
    }

    fn fixture() -> Fixture {
        let bus = RecordingBus::new();
        let presenter = Rc::new(RefCell::new(ScriptedPresenter::new()));
        let editor = Rc::new(EditorPane::new());
        let dispatcher = Dispatcher::new(
            Rc::clone(&bus) as Rc<dyn MessageBus>,
            Rc::clone(&presenter) as Rc<RefCell<dyn Presenter>>,
            Rc::clone(&editor) as Rc<dyn Editor>,
            Notifier::new(Duration::from_secs(10)),
            10,
        );
        Fixture {
            dispatcher,
            bus,
            presenter,
            editor,
        }
    }

    fn open_document(f: &Fixture, id: u64, title: &str) {
        f.editor.set_current(Some(DocumentInfo {
            id: DocumentId(id),
            title: title.into(),
            words: 100,
            chars: 500,
        }));
    }

    fn values(v: Value) -> Option<FormValues> {
        match v {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn rename_submits_exactly_one_file_rename_message() {
        let f = fixture();
        open_document(&f, 42, "Old title");
        f.presenter
            .borrow_mut()
            .script(values(json!({"value": "Notes"})));

        f.dispatcher.request_new_file_name();

        let sent = f.bus.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Channel::FileRename);
        assert_eq!(sent[0].1, json!({"name": "Notes", "hash": 42}));
    }

    #[test]
    fn rename_dismissal_sends_nothing() {
        let f = fixture();
        open_document(&f, 42, "Old title");
        f.presenter.borrow_mut().script(None);

        f.dispatcher.request_new_file_name();

        assert!(f.bus.sent().is_empty());
    }

    #[test]
    fn find_without_open_document_is_a_silent_noop() {
        let f = fixture();
        f.dispatcher.display_find();
        assert!(f.presenter.borrow().presented().is_empty());
        assert!(f.bus.sent().is_empty());
    }

    #[test]
    fn dir_new_requires_a_selected_directory() {
        let f = fixture();
        f.dispatcher.request_dir_name();
        assert!(f.presenter.borrow().presented().is_empty());

        f.dispatcher.select_directory(Some(DocumentId(7)));
        f.presenter
            .borrow_mut()
            .script(values(json!({"value": "Projects"})));
        f.dispatcher.request_dir_name();

        let sent = f.bus.sent_on(Channel::DirNew);
        assert_eq!(sent, vec![json!({"name": "Projects", "hash": 7})]);
    }

    #[test]
    fn file_new_omits_parent_when_no_directory_selected() {
        let f = fixture();
        f.presenter
            .borrow_mut()
            .script(values(json!({"value": "Scratch.md"})));
        f.dispatcher.request_file_name();
        assert_eq!(
            f.bus.sent_on(Channel::FileNew),
            vec![json!({"name": "Scratch.md"})]
        );
    }

    #[test]
    fn export_sends_the_picked_format() {
        let f = fixture();
        open_document(&f, 11, "Essay");
        f.presenter
            .borrow_mut()
            .script(values(json!({"format": "pdf"})));
        f.dispatcher.display_export();
        assert_eq!(
            f.bus.sent_on(Channel::Export),
            vec![json!({"hash": 11, "format": "pdf"})]
        );
    }

    #[test]
    fn set_target_sends_mode_and_count() {
        let f = fixture();
        open_document(&f, 11, "Essay");
        f.presenter
            .borrow_mut()
            .script(values(json!({"count": 500, "mode": "words"})));
        f.dispatcher.set_target();
        assert_eq!(
            f.bus.sent_on(Channel::SetTarget),
            vec![json!({"hash": 11, "mode": "words", "count": 500})]
        );
    }

    #[test]
    fn tag_cloud_round_trip_routes_selection_to_the_editor() {
        let f = fixture();
        f.presenter
            .borrow_mut()
            .script(values(json!({"tag": "rust"})));

        f.dispatcher.display_tag_cloud();
        assert_eq!(f.bus.pending_requests(), vec![Channel::GetTagsDatabase]);

        assert!(f.bus.respond(
            Channel::GetTagsDatabase,
            json!([{"name": "rust", "count": 3}]),
        ));
        assert_eq!(
            f.editor.commands(),
            vec![("search".to_string(), Value::from("#rust"))]
        );
    }

    #[test]
    fn custom_css_submit_writes_the_stylesheet_back() {
        let f = fixture();
        f.presenter
            .borrow_mut()
            .script(values(json!({"css": "p { margin: 0 }"})));

        f.dispatcher.display_custom_css();
        assert!(f
            .bus
            .respond(Channel::GetCustomCss, Value::from("body {}")));

        assert_eq!(
            f.bus.sent_on(Channel::SetCustomCss),
            vec![json!({"css": "p { margin: 0 }"})]
        );
        assert_eq!(
            f.presenter.borrow().last_options(),
            Some(PresentOptions::persistent())
        );
    }

    #[test]
    fn window_controls_map_to_their_channels() {
        let f = fixture();
        f.dispatcher.window_control(WindowOp::Minimise);
        f.dispatcher.window_control(WindowOp::Maximise);
        f.dispatcher.window_control(WindowOp::Close);
        let channels: Vec<Channel> = f.bus.sent().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            channels,
            vec![Channel::WinMinimise, Channel::WinMaximise, Channel::WinClose]
        );
    }

    #[test]
    fn recent_list_selection_opens_the_document() {
        let f = fixture();
        f.dispatcher.display_recent_documents();
        assert!(f.presenter.borrow().presented().is_empty(), "empty list");

        f.dispatcher.handle_event(InboundEvent::DocumentOpened {
            hash: DocumentId(5),
            title: "Journal".into(),
            words: 0,
            chars: 0,
        });
        f.presenter.borrow_mut().script(values(json!({"hash": 5})));
        f.dispatcher.display_recent_documents();

        assert_eq!(
            f.editor.commands(),
            vec![("open-file".to_string(), Value::from(5u64))]
        );
    }

    #[test]
    fn core_error_event_raises_the_persistent_dialog() {
        let f = fixture();
        f.dispatcher.handle_event(InboundEvent::Error {
            title: "Export failed".into(),
            message: "pandoc missing".into(),
            details: None,
        });
        let notice = f.dispatcher.notifier().current_error().unwrap();
        assert_eq!(notice.title, "Export failed");
    }

    #[test]
    fn quicklook_shelf_empties_on_bulk_close() {
        let f = fixture();
        for id in 1..=3u64 {
            f.dispatcher.open_quicklook(DocumentInfo {
                id: DocumentId(id),
                title: format!("Doc {id}"),
                words: 0,
                chars: 0,
            });
        }
        assert_eq!(f.dispatcher.quicklooks().len(), 3);
        f.dispatcher.close_all_quicklooks();
        assert!(f.dispatcher.quicklooks().is_empty());
    }
}

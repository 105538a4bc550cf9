//! End-to-end facade flows over the recording bus and scripted presenter.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::{json, Value};

use vellum_shell::ipc::{Channel, DocumentId, InboundEvent, MessageBus, RecordingBus};
use vellum_shell::shell::popup::Presenter;
use vellum_shell::shell::{
    Dispatcher, DocumentInfo, Editor, EditorPane, Notifier, ScriptedPresenter, Template,
};

struct Harness {
    dispatcher: Dispatcher,
    bus: Rc<RecordingBus>,
    presenter: Rc<RefCell<ScriptedPresenter>>,
    editor: Rc<EditorPane>,
}

fn harness() -> Harness {
    let bus = RecordingBus::new();
    let presenter = Rc::new(RefCell::new(ScriptedPresenter::new()));
    let editor = Rc::new(EditorPane::new());
    let dispatcher = Dispatcher::new(
        Rc::clone(&bus) as Rc<dyn MessageBus>,
        Rc::clone(&presenter) as Rc<RefCell<dyn Presenter>>,
        Rc::clone(&editor) as Rc<dyn Editor>,
        Notifier::new(Duration::from_secs(10)),
        3,
    );
    Harness {
        dispatcher,
        bus,
        presenter,
        editor,
    }
}

fn submit(h: &Harness, values: Value) {
    match values {
        Value::Object(map) => h.presenter.borrow_mut().script(Some(map)),
        _ => panic!("scripted values must be an object"),
    }
}

fn open_document(h: &Harness, id: u64, title: &str) {
    h.dispatcher.handle_event(InboundEvent::DocumentOpened {
        hash: DocumentId(id),
        title: title.into(),
        words: 250,
        chars: 1400,
    });
    h.editor.set_current(Some(DocumentInfo {
        id: DocumentId(id),
        title: title.into(),
        words: 250,
        chars: 1400,
    }));
}

#[test]
fn a_full_session_of_dispatches() {
    let h = harness();

    // No document yet: find and export refuse silently
    h.dispatcher.display_find();
    h.dispatcher.display_export();
    assert!(h.presenter.borrow().presented().is_empty());
    assert!(h.bus.sent().is_empty());

    open_document(&h, 42, "Field notes");

    // Create a file under a selected directory
    h.dispatcher.select_directory(Some(DocumentId(9)));
    submit(&h, json!({"value": "Observations.md"}));
    h.dispatcher.request_file_name();

    // Rename the open document
    submit(&h, json!({"value": "Notes"}));
    h.dispatcher.request_new_file_name();

    // Export it as PDF
    submit(&h, json!({"format": "pdf"}));
    h.dispatcher.display_export();

    assert_eq!(
        h.bus.sent(),
        vec![
            (
                Channel::FileNew,
                json!({"name": "Observations.md", "hash": 9})
            ),
            (Channel::FileRename, json!({"name": "Notes", "hash": 42})),
            (Channel::Export, json!({"hash": 42, "format": "pdf"})),
        ]
    );
    assert_eq!(
        h.presenter.borrow().presented(),
        vec![
            Template::TextfieldEntry,
            Template::TextfieldEntry,
            Template::ExportOptions
        ]
    );
}

#[test]
fn dismissals_never_reach_the_bus() {
    let h = harness();
    open_document(&h, 42, "Field notes");
    h.dispatcher.select_directory(Some(DocumentId(9)));

    // No scripted responses: every popup is dismissed
    h.dispatcher.request_file_name();
    h.dispatcher.request_dir_name();
    h.dispatcher.request_new_file_name();
    h.dispatcher.set_target();
    h.dispatcher.display_export();

    assert_eq!(h.presenter.borrow().presented().len(), 5);
    assert!(h.bus.sent().is_empty());
}

#[test]
fn recent_documents_wrap_through_the_bounded_registry() {
    let h = harness();
    // Capacity 3: open A, B, C, A again, then D
    for (id, title) in [(1, "A"), (2, "B"), (3, "C"), (1, "A"), (4, "D")] {
        h.dispatcher.handle_event(InboundEvent::DocumentOpened {
            hash: DocumentId(id),
            title: title.into(),
            words: 0,
            chars: 0,
        });
    }
    let titles: Vec<String> = h
        .dispatcher
        .recent_documents()
        .into_iter()
        .map(|e| e.title)
        .collect();
    assert_eq!(titles, vec!["C", "A", "D"]);

    submit(&h, json!({"hash": 4}));
    h.dispatcher.display_recent_documents();
    assert_eq!(
        h.editor.commands(),
        vec![("open-file".to_string(), Value::from(4u64))]
    );
}

#[test]
fn reply_style_requests_fire_their_callback_exactly_once() {
    let h = harness();
    submit(&h, json!({"tag": "research"}));

    h.dispatcher.display_tag_cloud();
    assert!(h
        .bus
        .respond(Channel::GetTagsDatabase, json!([{"name": "research", "count": 7}])));
    // The request was consumed: answering again finds nothing pending
    assert!(!h.bus.respond(Channel::GetTagsDatabase, json!([])));

    assert_eq!(
        h.editor.commands(),
        vec![("search".to_string(), Value::from("#research"))]
    );
    assert_eq!(h.presenter.borrow().presented(), vec![Template::TagCloud]);
}

#[test]
fn core_errors_surface_as_a_persistent_notice_not_a_toast() {
    let h = harness();
    h.dispatcher.handle_event(InboundEvent::Error {
        title: "Sync failed".into(),
        message: "the core process went away".into(),
        details: Some("connection reset by peer".into()),
    });
    let notifier = h.dispatcher.notifier();
    assert_eq!(notifier.toast_count(), 0);
    let notice = notifier.current_error().expect("error dialog raised");
    assert_eq!(notice.title, "Sync failed");
    assert!(notifier.dismiss_error());
}

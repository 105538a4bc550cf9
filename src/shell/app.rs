use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::config::Settings;
use crate::ipc::{InboundEvent, MessageBus};
use crate::tui::widgets::ListState;
use crate::tui::{
    Alignment, App, Command, Element, FocusId, Layer, LayoutConstraint, Subscription, Theme,
};

use super::dispatch::{Dispatcher, WindowOp};
use super::editor::{Editor, EditorPane};
use super::notify::{Notifier, ToastLevel};
use super::overlay::OverlayId;
use super::popup::{FormState, HostEvent, PopupAction, PopupHost, PopupMsg, Presenter};
use super::templates::{BuiltinTemplates, TemplateRequest, Templates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    NewFile,
    NewDirectory,
    NewVirtualDirectory,
    RenameFile,
    SetTarget,
    Export,
    FileInfo,
    RecentDocuments,
    Statistics,
    FindReplace,
    Formatting,
    TagCloud,
    CustomCss,
    QuicklookCurrent,
    CloseQuicklooks,
    Minimise,
    Maximise,
    CloseWindow,
}

const MENU_ITEMS: [(&str, MenuAction); 18] = [
    ("New file", MenuAction::NewFile),
    ("New directory", MenuAction::NewDirectory),
    ("New virtual directory", MenuAction::NewVirtualDirectory),
    ("Rename current file", MenuAction::RenameFile),
    ("Set writing target", MenuAction::SetTarget),
    ("Export", MenuAction::Export),
    ("File info", MenuAction::FileInfo),
    ("Recent documents", MenuAction::RecentDocuments),
    ("Statistics", MenuAction::Statistics),
    ("Find & replace", MenuAction::FindReplace),
    ("Formatting", MenuAction::Formatting),
    ("Tag cloud", MenuAction::TagCloud),
    ("Custom CSS", MenuAction::CustomCss),
    ("Quicklook current file", MenuAction::QuicklookCurrent),
    ("Close all quicklooks", MenuAction::CloseQuicklooks),
    ("Minimise window", MenuAction::Minimise),
    ("Maximise window", MenuAction::Maximise),
    ("Close window", MenuAction::CloseWindow),
];

const MAIN_MENU: FocusId = FocusId::new("main-menu");
const MENU_VISIBLE_ROWS: usize = 12;

#[derive(Debug, Clone)]
pub enum ShellMsg {
    Menu(MenuAction),
    MenuPick(usize),
    MenuNav(KeyCode),
    Popup(PopupMsg),
    DismissError,
    CoreEvent(InboundEvent),
    SweepToasts,
}

pub struct ShellState {
    dispatcher: Rc<Dispatcher>,
    popups: Rc<RefCell<PopupHost>>,
    templates: Box<dyn Templates>,
    editor: Rc<EditorPane>,
    menu: ListState,
}

impl ShellState {
    pub fn new(bus: Rc<dyn MessageBus>, settings: &Settings) -> Self {
        let editor = Rc::new(EditorPane::new());
        let popups = Rc::new(RefCell::new(PopupHost::new()));
        let notifier = Notifier::new(Duration::from_secs(settings.toast_lifetime_secs));
        let dispatcher = Rc::new(Dispatcher::new(
            bus,
            Rc::clone(&popups) as Rc<RefCell<dyn Presenter>>,
            Rc::clone(&editor) as Rc<dyn Editor>,
            notifier,
            settings.recent_capacity,
        ));
        Self {
            dispatcher,
            popups,
            templates: Box::new(BuiltinTemplates),
            editor,
            menu: ListState::with_selection(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

pub struct ShellApp;

fn run_action(state: &mut ShellState, action: MenuAction) -> Command<ShellMsg> {
    let d = &state.dispatcher;
    match action {
        MenuAction::NewFile => d.request_file_name(),
        MenuAction::NewDirectory => d.request_dir_name(),
        MenuAction::NewVirtualDirectory => d.request_virtual_dir_name(),
        MenuAction::RenameFile => d.request_new_file_name(),
        MenuAction::SetTarget => d.set_target(),
        MenuAction::Export => d.display_export(),
        MenuAction::FileInfo => d.display_file_info(),
        MenuAction::RecentDocuments => d.display_recent_documents(),
        MenuAction::Statistics => d.display_stats(),
        MenuAction::FindReplace => d.display_find(),
        MenuAction::Formatting => d.display_formatting(),
        MenuAction::TagCloud => d.display_tag_cloud(),
        MenuAction::CustomCss => d.display_custom_css(),
        MenuAction::QuicklookCurrent => {
            if let Some(doc) = state.editor.current_document() {
                d.open_quicklook(doc);
            }
        }
        MenuAction::CloseQuicklooks => d.close_all_quicklooks(),
        MenuAction::Minimise => d.window_control(WindowOp::Minimise),
        MenuAction::Maximise => d.window_control(WindowOp::Maximise),
        MenuAction::CloseWindow => {
            d.window_control(WindowOp::Close);
            return Command::Quit;
        }
    }
    match state.popups.borrow_mut().take_pending_focus() {
        Some(focus) => Command::set_focus(focus),
        None => Command::None,
    }
}

fn popup_size(request: &TemplateRequest) -> (u16, u16) {
    match request {
        TemplateRequest::TextfieldEntry { .. } | TemplateRequest::CustomCss { .. } => (56, 9),
        TemplateRequest::NumericTarget { .. } => (44, 13),
        TemplateRequest::FileInfoSummary { .. } => (44, 7),
        TemplateRequest::StatisticsSummary { .. } => (44, 7),
        TemplateRequest::RecentDocumentList { .. } => (56, 16),
        TemplateRequest::ExportOptions { .. } => (44, 10),
        TemplateRequest::FindReplace => (56, 14),
        TemplateRequest::FormattingMenu => (60, 16),
        TemplateRequest::TagCloud { .. } => (44, 14),
        TemplateRequest::ErrorDetail { notice } => {
            let detail_lines = notice
                .details
                .as_deref()
                .map(|d| d.lines().count() as u16 + 1)
                .unwrap_or(0);
            (64, 9 + detail_lines)
        }
    }
}

fn toast_view(toasts: &[(OverlayId, ToastLevel, String)], theme: &Theme) -> Element<ShellMsg> {
    let rows: Vec<Element<ShellMsg>> = toasts
        .iter()
        .map(|(_, level, message)| {
            let style = match level {
                ToastLevel::Info => Style::default().fg(theme.text),
                ToastLevel::Warning => Style::default().fg(theme.yellow),
                ToastLevel::Error => Style::default().fg(theme.red),
            };
            Element::styled(message.clone(), style)
        })
        .collect();
    Element::panel(Element::column(rows).build()).build()
}

fn base_view(state: &ShellState, theme: &Theme) -> Element<ShellMsg> {
    let doc_line = match state.editor.current_document() {
        Some(doc) => Element::styled(
            format!("Editing: {} ({} words)", doc.title, doc.words),
            Style::default().fg(theme.green),
        ),
        None => Element::styled("No document open", theme.dimmed()),
    };

    let rows: Vec<Element<ShellMsg>> = MENU_ITEMS
        .iter()
        .map(|(label, _)| Element::text(*label))
        .collect();
    let menu = Element::list(MAIN_MENU, rows, &state.menu)
        .on_activate(|i| ShellMsg::MenuPick(i))
        .on_navigate(|key| ShellMsg::MenuNav(key))
        .build();

    let mut column = crate::tui::element::ColumnBuilder::new()
        .add(doc_line, LayoutConstraint::Length(1))
        .add(menu, LayoutConstraint::Fill(1));

    let mut shelf_rows: Vec<Element<ShellMsg>> = Vec::new();
    state.dispatcher.quicklooks().for_each(|_, _, panel| {
        shelf_rows.push(Element::styled(
            format!("  {}", panel.title()),
            Style::default().fg(theme.sky),
        ));
    });
    if !shelf_rows.is_empty() {
        let count = shelf_rows.len() as u16;
        let mut section = vec![Element::styled("Quicklook", theme.dimmed())];
        section.extend(shelf_rows);
        column = column.add(
            Element::column(section).build(),
            LayoutConstraint::Length(count + 1),
        );
    }

    Element::panel(column.build()).title("Vellum").build()
}

impl App for ShellApp {
    type State = ShellState;
    type Msg = ShellMsg;

    fn update(state: &mut ShellState, msg: ShellMsg) -> Command<ShellMsg> {
        match msg {
            ShellMsg::Menu(action) => run_action(state, action),
            ShellMsg::MenuPick(index) => match MENU_ITEMS.get(index) {
                Some((_, action)) => run_action(state, *action),
                None => Command::None,
            },
            ShellMsg::MenuNav(key) => {
                state.menu.handle_key(key, MENU_ITEMS.len(), MENU_VISIBLE_ROWS);
                Command::None
            }
            ShellMsg::Popup(popup_msg) => {
                // The error dialog sits above any popup; Escape takes it
                // down first.
                if popup_msg == PopupMsg::Dismiss && state.dispatcher.notifier().dismiss_error() {
                    return Command::None;
                }
                match state.popups.borrow_mut().handle(popup_msg) {
                    HostEvent::Action(PopupAction::Search(op)) => {
                        state.dispatcher.run_search(op);
                        Command::None
                    }
                    HostEvent::Completed => Command::clear_focus(),
                    HostEvent::None => Command::None,
                }
            }
            ShellMsg::DismissError => {
                state.dispatcher.notifier().dismiss_error();
                Command::None
            }
            ShellMsg::CoreEvent(event) => {
                if let Some(doc) = state.dispatcher.handle_event(event) {
                    state.editor.set_current(Some(doc));
                }
                Command::None
            }
            ShellMsg::SweepToasts => {
                state.dispatcher.notifier().sweep_expired(Instant::now());
                Command::None
            }
        }
    }

    fn view(state: &ShellState, theme: &Theme) -> Element<ShellMsg> {
        let mut layers = vec![Layer::new(base_view(state, theme))];

        let notifier = state.dispatcher.notifier();
        let toasts = notifier.visible_toasts();
        if !toasts.is_empty() {
            layers.push(
                Layer::new(toast_view(&toasts, theme))
                    .align(Alignment::BottomRight)
                    .size(40, toasts.len() as u16 + 2),
            );
        }

        let popups = state.popups.borrow();
        if let Some((request, form, _)) = popups.active() {
            let (width, height) = popup_size(request);
            layers.push(
                Layer::new(state.templates.render(request, form, theme))
                    .center()
                    .size(width, height)
                    .dim(true),
            );
        }

        if let Some(notice) = notifier.current_error() {
            let request = TemplateRequest::ErrorDetail { notice };
            let (width, height) = popup_size(&request);
            layers.push(
                Layer::new(state.templates.render(&request, &FormState::empty(), theme))
                    .center()
                    .size(width, height)
                    .dim(true),
            );
        }

        Element::stack(layers)
    }

    fn subscriptions(state: &ShellState) -> Vec<Subscription<ShellMsg>> {
        let mut subs = vec![
            Subscription::keyboard(
                KeyCode::Esc,
                "Close popup",
                ShellMsg::Popup(PopupMsg::Dismiss),
            ),
            Subscription::timer(Duration::from_secs(1), ShellMsg::SweepToasts),
        ];
        // Single-letter shortcuts only make sense while no popup is up
        if !state.popups.borrow().is_open() {
            let bindings: [(char, &str, MenuAction); 10] = [
                ('n', "New file", MenuAction::NewFile),
                ('d', "New directory", MenuAction::NewDirectory),
                ('r', "Rename file", MenuAction::RenameFile),
                ('o', "Recent documents", MenuAction::RecentDocuments),
                ('f', "Find & replace", MenuAction::FindReplace),
                ('e', "Export", MenuAction::Export),
                ('m', "Formatting", MenuAction::Formatting),
                ('g', "Tag cloud", MenuAction::TagCloud),
                ('l', "Quicklook", MenuAction::QuicklookCurrent),
                ('w', "Close window", MenuAction::CloseWindow),
            ];
            for (key, description, action) in bindings {
                subs.push(Subscription::keyboard(
                    KeyCode::Char(key),
                    description,
                    ShellMsg::Menu(action),
                ));
            }
        }
        subs
    }

    fn title() -> &'static str {
        "Vellum"
    }

    fn status(state: &ShellState, theme: &Theme) -> Option<Line<'static>> {
        let stats = state.dispatcher.stats();
        let mut spans = vec![Span::styled(
            format!(" {} words today ", stats.words_total),
            Style::default().fg(theme.subtext0),
        )];
        let recent = state.dispatcher.recent_documents().len();
        if recent > 0 {
            spans.push(Span::styled(
                format!(" {recent} recent "),
                Style::default().fg(theme.overlay1),
            ));
        }
        let quicklooks = state.dispatcher.quicklooks().len();
        if quicklooks > 0 {
            spans.push(Span::styled(
                format!(" {quicklooks} quicklook "),
                Style::default().fg(theme.sky),
            ));
        }
        spans.push(Span::styled(
            chrono::Local::now().format(" %H:%M ").to_string(),
            Style::default().fg(theme.overlay0),
        ));
        Some(Line::from(spans))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{Channel, DocumentId, RecordingBus};
    use crate::shell::templates::POPUP_INPUT;
    use serde_json::json;

    fn state_with_bus() -> (ShellState, Rc<RecordingBus>) {
        let bus = RecordingBus::new();
        let state = ShellState::new(
            Rc::clone(&bus) as Rc<dyn MessageBus>,
            &Settings::default(),
        );
        (state, bus)
    }

    fn open_document(state: &mut ShellState, id: u64, title: &str) {
        let opened = ShellApp::update(
            state,
            ShellMsg::CoreEvent(InboundEvent::DocumentOpened {
                hash: DocumentId(id),
                title: title.into(),
                words: 10,
                chars: 50,
            }),
        );
        assert!(matches!(opened, Command::None));
    }

    #[test]
    fn menu_pick_presents_a_popup_and_claims_focus() {
        let (mut state, _bus) = state_with_bus();
        let command = ShellApp::update(&mut state, ShellMsg::MenuPick(0));
        assert!(matches!(command, Command::SetFocus(ref id) if *id == POPUP_INPUT));
        assert!(state.popups.borrow().is_open());
    }

    #[test]
    fn rename_flow_sends_exactly_one_message() {
        let (mut state, bus) = state_with_bus();
        open_document(&mut state, 42, "Old title");

        ShellApp::update(&mut state, ShellMsg::Menu(MenuAction::RenameFile));
        // Clear the prefilled title, then type the new one
        for _ in 0.."Old title".len() {
            ShellApp::update(
                &mut state,
                ShellMsg::Popup(PopupMsg::TextKey(KeyCode::Backspace)),
            );
        }
        for ch in "Notes".chars() {
            ShellApp::update(
                &mut state,
                ShellMsg::Popup(PopupMsg::TextKey(KeyCode::Char(ch))),
            );
        }
        let done = ShellApp::update(&mut state, ShellMsg::Popup(PopupMsg::Submit));
        assert!(matches!(done, Command::ClearFocus));

        assert_eq!(
            bus.sent_on(Channel::FileRename),
            vec![json!({"name": "Notes", "hash": 42})]
        );
        assert!(!state.popups.borrow().is_open());
    }

    #[test]
    fn escape_takes_down_the_error_dialog_before_the_popup() {
        let (mut state, _bus) = state_with_bus();
        ShellApp::update(&mut state, ShellMsg::Menu(MenuAction::NewFile));
        state
            .dispatcher
            .notifier()
            .error("Boom", "core failure", None);

        ShellApp::update(&mut state, ShellMsg::Popup(PopupMsg::Dismiss));
        assert!(state.dispatcher.notifier().current_error().is_none());
        assert!(state.popups.borrow().is_open(), "popup survives the first Escape");

        ShellApp::update(&mut state, ShellMsg::Popup(PopupMsg::Dismiss));
        assert!(!state.popups.borrow().is_open());
    }

    #[test]
    fn document_opened_event_lands_in_editor_and_recent_list() {
        let (mut state, _bus) = state_with_bus();
        open_document(&mut state, 5, "Journal");
        assert_eq!(state.editor.current_document().unwrap().title, "Journal");
        assert_eq!(state.dispatcher.recent_documents().len(), 1);
    }

    #[test]
    fn close_window_sends_and_quits() {
        let (mut state, bus) = state_with_bus();
        let command = ShellApp::update(&mut state, ShellMsg::Menu(MenuAction::CloseWindow));
        assert!(matches!(command, Command::Quit));
        assert_eq!(bus.sent_on(Channel::WinClose).len(), 1);
    }

    #[test]
    fn shortcuts_are_suspended_while_a_popup_is_open() {
        let (mut state, _bus) = state_with_bus();
        let before = ShellApp::subscriptions(&state).len();
        ShellApp::update(&mut state, ShellMsg::Menu(MenuAction::NewFile));
        let during = ShellApp::subscriptions(&state).len();
        assert!(during < before);
    }
}

pub mod app;
pub mod dispatch;
pub mod editor;
pub mod notify;
pub mod overlay;
pub mod popup;
pub mod recent;
pub mod templates;

pub use app::{ShellApp, ShellMsg, ShellState};
pub use dispatch::{Dispatcher, SessionStats, WindowOp};
pub use editor::{DocumentInfo, Editor, EditorPane, SearchOp};
pub use notify::{ErrorNotice, Notifier, ToastLevel};
pub use overlay::{
    NotificationStack, NotificationSurface, OverlayId, OverlayStack, QuicklookShelf,
    QuicklookSurface,
};
pub use popup::{FormValues, PopupHost, PresentOptions, Presenter, ScriptedPresenter};
pub use recent::{RecentDocuments, RecentEntry, DEFAULT_RECENT_CAPACITY};
pub use templates::{BuiltinTemplates, Template, TemplateRequest, Templates};

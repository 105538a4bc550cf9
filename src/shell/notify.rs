use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::overlay::{NotificationStack, NotificationSurface, OverlayId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

/// Short-lived corner notification. Slot 0 sits at the bottom of the stack;
/// the stack repositions survivors whenever one goes away.
pub struct Toast {
    message: String,
    level: ToastLevel,
    slot: usize,
    expires_at: Instant,
}

impl Toast {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn level(&self) -> ToastLevel {
        self.level
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl NotificationSurface for Toast {
    fn reposition(&mut self, slot: usize) {
        self.slot = slot;
    }
}

/// Persistent error dialog. Unlike a toast it stays until the user closes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub title: String,
    pub message: String,
    pub details: Option<String>,
}

/// Handle for surfacing feedback to the user. Cloned into every collaborator
/// that needs to report something; all clones share the same stack.
#[derive(Clone)]
pub struct Notifier {
    toasts: NotificationStack<Toast>,
    error: Rc<RefCell<Option<ErrorNotice>>>,
    lifetime: Duration,
}

impl Notifier {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            toasts: NotificationStack::new(),
            error: Rc::new(RefCell::new(None)),
            lifetime,
        }
    }

    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) -> OverlayId {
        self.toast_at(level, message, Instant::now())
    }

    fn toast_at(&self, level: ToastLevel, message: impl Into<String>, now: Instant) -> OverlayId {
        let message = message.into();
        log::debug!("toast [{level:?}]: {message}");
        let expires_at = now + self.lifetime;
        let slot = self.toasts.len();
        self.toasts.open(move |_| Toast {
            message,
            level,
            slot,
            expires_at,
        })
    }

    pub fn info(&self, message: impl Into<String>) -> OverlayId {
        self.toast(ToastLevel::Info, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> OverlayId {
        self.toast(ToastLevel::Warning, message)
    }

    pub fn dismiss_toast(&self, id: OverlayId) -> bool {
        self.toasts.dismiss(id)
    }

    /// Drop every toast whose lifetime has run out
    pub fn sweep_expired(&self, now: Instant) -> usize {
        self.toasts.dismiss_where(|toast| toast.expires_at <= now)
    }

    pub fn visible_toasts(&self) -> Vec<(OverlayId, ToastLevel, String)> {
        let mut out = Vec::new();
        self.toasts.for_each(|_, id, toast| {
            out.push((id, toast.level, toast.message.clone()));
        });
        out
    }

    pub fn toast_count(&self) -> usize {
        self.toasts.len()
    }

    /// Raise the persistent error dialog, replacing any prior one
    pub fn error(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        details: Option<String>,
    ) {
        let notice = ErrorNotice {
            title: title.into(),
            message: message.into(),
            details,
        };
        log::error!("{}: {}", notice.title, notice.message);
        *self.error.borrow_mut() = Some(notice);
    }

    pub fn dismiss_error(&self) -> bool {
        self.error.borrow_mut().take().is_some()
    }

    pub fn current_error(&self) -> Option<ErrorNotice> {
        self.error.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> Notifier {
        Notifier::new(Duration::from_secs(10))
    }

    #[test]
    fn toasts_expire_in_order_of_age() {
        let n = notifier();
        let t0 = Instant::now();
        n.toast_at(ToastLevel::Info, "first", t0);
        n.toast_at(ToastLevel::Info, "second", t0 + Duration::from_secs(5));

        assert_eq!(n.sweep_expired(t0 + Duration::from_secs(11)), 1);
        let remaining = n.visible_toasts();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].2, "second");

        assert_eq!(n.sweep_expired(t0 + Duration::from_secs(16)), 1);
        assert_eq!(n.toast_count(), 0);
    }

    #[test]
    fn error_dialog_is_persistent_until_dismissed() {
        let n = notifier();
        n.error("Export failed", "pandoc not found", Some("exit code 127".into()));

        assert_eq!(n.sweep_expired(Instant::now() + Duration::from_secs(3600)), 0);
        let notice = n.current_error().unwrap();
        assert_eq!(notice.title, "Export failed");
        assert_eq!(notice.details.as_deref(), Some("exit code 127"));

        assert!(n.dismiss_error());
        assert!(!n.dismiss_error());
        assert!(n.current_error().is_none());
    }

    #[test]
    fn new_error_replaces_the_old_dialog() {
        let n = notifier();
        n.error("A", "first", None);
        n.error("B", "second", None);
        assert_eq!(n.current_error().unwrap().title, "B");
    }

    #[test]
    fn clones_share_one_stack() {
        let n = notifier();
        let other = n.clone();
        let id = n.info("hello");
        assert_eq!(other.toast_count(), 1);
        assert!(other.dismiss_toast(id));
        assert_eq!(n.toast_count(), 0);
    }
}

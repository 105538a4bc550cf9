use crossterm::event::KeyCode;

use crate::tui::{Element, Theme};

/// Items that can be displayed in a list element
pub trait ListItem {
    type Msg: Clone;

    fn to_element(&self, theme: &Theme, is_selected: bool) -> Element<Self::Msg>;

    fn height(&self) -> u16 {
        1
    }
}

/// Selection and scrolling state for list elements
#[derive(Debug, Clone)]
pub struct ListState {
    selected: Option<usize>,
    scroll_offset: usize,
    scroll_off: usize,
    wrap_around: bool,
}

impl Default for ListState {
    fn default() -> Self {
        Self::new()
    }
}

impl ListState {
    pub fn new() -> Self {
        Self {
            selected: None,
            scroll_offset: 0,
            scroll_off: 2,
            wrap_around: true,
        }
    }

    pub fn with_selection() -> Self {
        Self {
            selected: Some(0),
            ..Self::new()
        }
    }

    pub fn with_wrap_around(mut self, wrap_around: bool) -> Self {
        self.wrap_around = wrap_around;
        self
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index;
    }

    /// Clamp selection and scroll after the item count changed (e.g. filtering)
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = None;
            self.scroll_offset = 0;
            return;
        }
        if let Some(sel) = self.selected {
            self.selected = Some(sel.min(len - 1));
        }
        self.scroll_offset = self.scroll_offset.min(len.saturating_sub(1));
    }

    /// Handle a navigation key; returns true if the key was consumed
    pub fn handle_key(&mut self, key: KeyCode, len: usize, visible_height: usize) -> bool {
        if len == 0 {
            return false;
        }
        let last = len - 1;
        let current = self.selected.unwrap_or(0);

        let next = match key {
            KeyCode::Up => {
                if current == 0 {
                    if self.wrap_around { last } else { 0 }
                } else {
                    current - 1
                }
            }
            KeyCode::Down => {
                if current >= last {
                    if self.wrap_around { 0 } else { last }
                } else {
                    current + 1
                }
            }
            KeyCode::PageUp => current.saturating_sub(visible_height.max(1)),
            KeyCode::PageDown => (current + visible_height.max(1)).min(last),
            KeyCode::Home => 0,
            KeyCode::End => last,
            _ => return false,
        };

        self.selected = Some(next);
        self.ensure_visible(len, visible_height);
        true
    }

    fn ensure_visible(&mut self, len: usize, visible_height: usize) {
        let Some(sel) = self.selected else { return };
        if visible_height == 0 || len <= visible_height {
            self.scroll_offset = 0;
            return;
        }
        let off = self.scroll_off.min(visible_height / 2);
        let top = self.scroll_offset + off;
        let bottom = self.scroll_offset + visible_height - 1 - off;
        if sel < top {
            self.scroll_offset = sel.saturating_sub(off);
        } else if sel > bottom {
            self.scroll_offset = (sel + off + 1).saturating_sub(visible_height);
        }
        self.scroll_offset = self.scroll_offset.min(len - visible_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_wraps_at_edges() {
        let mut state = ListState::with_selection();
        assert!(state.handle_key(KeyCode::Up, 3, 10));
        assert_eq!(state.selected(), Some(2));
        assert!(state.handle_key(KeyCode::Down, 3, 10));
        assert_eq!(state.selected(), Some(0));
    }

    #[test]
    fn no_wrap_clamps_at_edges() {
        let mut state = ListState::with_selection().with_wrap_around(false);
        assert!(state.handle_key(KeyCode::Up, 3, 10));
        assert_eq!(state.selected(), Some(0));
    }

    #[test]
    fn empty_list_consumes_nothing() {
        let mut state = ListState::new();
        assert!(!state.handle_key(KeyCode::Down, 0, 10));
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn clamp_after_shrink() {
        let mut state = ListState::with_selection();
        state.select(Some(7));
        state.clamp(3);
        assert_eq!(state.selected(), Some(2));
        state.clamp(0);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn scrolls_to_keep_selection_visible() {
        let mut state = ListState::with_selection();
        for _ in 0..9 {
            state.handle_key(KeyCode::Down, 10, 4);
        }
        assert_eq!(state.selected(), Some(9));
        assert_eq!(state.scroll_offset(), 6);
    }
}

use crossterm::event::KeyCode;

/// Cursor and horizontal-scroll state for a single-line text input. The
/// value itself lives in app state; `apply_key` edits it in place.
#[derive(Debug, Clone, Default)]
pub struct TextInputState {
    cursor: usize,
    scroll: usize,
}

impl TextInputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Horizontal scroll offset in characters
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Place the cursor after the last character
    pub fn move_to_end(&mut self, value: &str) {
        self.cursor = value.chars().count();
    }

    /// Apply a key to the value, returns true if the value changed
    pub fn apply_key(&mut self, key: KeyCode, value: &mut String) -> bool {
        let len = value.chars().count();
        self.cursor = self.cursor.min(len);

        match key {
            KeyCode::Char(c) => {
                let at = byte_index(value, self.cursor);
                value.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor == 0 {
                    return false;
                }
                let at = byte_index(value, self.cursor - 1);
                value.remove(at);
                self.cursor -= 1;
                true
            }
            KeyCode::Delete => {
                if self.cursor >= len {
                    return false;
                }
                let at = byte_index(value, self.cursor);
                value.remove(at);
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = len;
                false
            }
            _ => false,
        }
    }

    /// Keep the cursor inside the visible window of `width` characters
    pub fn scroll_into_view(&mut self, width: usize) {
        if width == 0 {
            return;
        }
        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + width {
            self.scroll = self.cursor + 1 - width;
        }
    }
}

fn byte_index(value: &str, char_pos: usize) -> usize {
    value
        .char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(value.len())
}

use ratatui::layout::Rect;

/// Maps screen regions to the messages their mouse interactions produce.
/// Rebuilt on every frame while the element tree is rendered.
pub struct InteractionRegistry<Msg> {
    click_handlers: Vec<(Rect, Msg)>,
    hover_handlers: Vec<(Rect, Msg)>,
    hover_exit_handlers: Vec<(Rect, Msg)>,
}

impl<Msg: Clone> InteractionRegistry<Msg> {
    pub fn new() -> Self {
        Self {
            click_handlers: Vec::new(),
            hover_handlers: Vec::new(),
            hover_exit_handlers: Vec::new(),
        }
    }

    pub fn register_click(&mut self, rect: Rect, msg: Msg) {
        self.click_handlers.push((rect, msg));
    }

    pub fn register_hover(&mut self, rect: Rect, msg: Msg) {
        self.hover_handlers.push((rect, msg));
    }

    pub fn register_hover_exit(&mut self, rect: Rect, msg: Msg) {
        self.hover_exit_handlers.push((rect, msg));
    }

    // Handlers are scanned back-to-front so the topmost layer wins.

    pub fn find_click(&self, x: u16, y: u16) -> Option<Msg> {
        Self::find(&self.click_handlers, x, y)
    }

    pub fn find_hover(&self, x: u16, y: u16) -> Option<Msg> {
        Self::find(&self.hover_handlers, x, y)
    }

    pub fn find_hover_exit(&self, x: u16, y: u16) -> Option<Msg> {
        Self::find(&self.hover_exit_handlers, x, y)
    }

    fn find(handlers: &[(Rect, Msg)], x: u16, y: u16) -> Option<Msg> {
        handlers
            .iter()
            .rev()
            .find(|(rect, _)| point_in_rect(x, y, *rect))
            .map(|(_, msg)| msg.clone())
    }

    pub fn clear(&mut self) {
        self.click_handlers.clear();
        self.hover_handlers.clear();
        self.hover_exit_handlers.clear();
    }
}

impl<Msg: Clone> Default for InteractionRegistry<Msg> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topmost_handler_wins() {
        let mut registry: InteractionRegistry<u8> = InteractionRegistry::new();
        let rect = Rect::new(0, 0, 10, 10);
        registry.register_click(rect, 1);
        registry.register_click(rect, 2);
        assert_eq!(registry.find_click(5, 5), Some(2));
    }

    #[test]
    fn miss_returns_none() {
        let mut registry: InteractionRegistry<u8> = InteractionRegistry::new();
        registry.register_click(Rect::new(0, 0, 2, 2), 1);
        assert_eq!(registry.find_click(5, 5), None);
    }
}

use crossterm::event::KeyCode;
use ratatui::layout::Rect;

use super::interaction_registry::point_in_rect;
use crate::tui::element::FocusId;

/// A focusable element captured during rendering
pub struct FocusableInfo<Msg> {
    pub id: FocusId,
    pub rect: Rect,
    pub on_key: Box<dyn Fn(KeyCode) -> Option<Msg> + Send>,
    pub on_focus: Option<Msg>,
    pub on_blur: Option<Msg>,
}

/// Focusables grouped by overlay layer; only the topmost layer is reachable,
/// so a modal traps Tab and click focus while it is open.
pub struct FocusRegistry<Msg> {
    layers: Vec<Vec<FocusableInfo<Msg>>>,
}

impl<Msg: Clone> FocusRegistry<Msg> {
    pub fn new() -> Self {
        Self {
            layers: vec![Vec::new()],
        }
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.layers.push(Vec::new());
    }

    pub fn push_layer(&mut self) {
        self.layers.push(Vec::new());
    }

    pub fn register_focusable(&mut self, info: FocusableInfo<Msg>) {
        let layer = self
            .layers
            .last_mut()
            .expect("focus registry always has a base layer");
        if layer.iter().any(|f| f.id == info.id) {
            log::warn!("duplicate FocusId {:?}; last registration wins", info.id);
            layer.retain(|f| f.id != info.id);
        }
        layer.push(info);
    }

    fn active_layer(&self) -> &[FocusableInfo<Msg>] {
        self.layers.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_in_active_layer(&self, id: &FocusId) -> Option<&FocusableInfo<Msg>> {
        self.active_layer().iter().find(|f| &f.id == id)
    }

    pub fn contains(&self, id: &FocusId) -> bool {
        self.find_in_active_layer(id).is_some()
    }

    pub fn focusable_ids_in_active_layer(&self) -> Vec<FocusId> {
        self.active_layer().iter().map(|f| f.id.clone()).collect()
    }

    pub fn find_at_position(&self, x: u16, y: u16) -> Option<FocusId> {
        self.active_layer()
            .iter()
            .rev()
            .find(|f| point_in_rect(x, y, f.rect))
            .map(|f| f.id.clone())
    }
}

impl<Msg: Clone> Default for FocusRegistry<Msg> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &'static str, rect: Rect) -> FocusableInfo<u8> {
        FocusableInfo {
            id: FocusId::new(id),
            rect,
            on_key: Box::new(|_| None),
            on_focus: None,
            on_blur: None,
        }
    }

    #[test]
    fn only_topmost_layer_is_reachable() {
        let mut registry: FocusRegistry<u8> = FocusRegistry::new();
        registry.register_focusable(info("base", Rect::new(0, 0, 5, 5)));
        registry.push_layer();
        registry.register_focusable(info("modal", Rect::new(0, 0, 5, 5)));

        assert!(registry.contains(&FocusId::new("modal")));
        assert!(!registry.contains(&FocusId::new("base")));
        assert_eq!(
            registry.find_at_position(1, 1),
            Some(FocusId::new("modal"))
        );
    }

    #[test]
    fn clear_resets_to_base_layer() {
        let mut registry: FocusRegistry<u8> = FocusRegistry::new();
        registry.push_layer();
        registry.register_focusable(info("modal", Rect::new(0, 0, 5, 5)));
        registry.clear();
        assert!(registry.focusable_ids_in_active_layer().is_empty());
    }
}

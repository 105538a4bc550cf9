use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment as TextAlignment, Constraint, Direction, Layout, Rect},
    style::{Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

mod focus_registry;
mod interaction_registry;

pub use focus_registry::{FocusRegistry, FocusableInfo};
pub use interaction_registry::InteractionRegistry;

use crate::tui::element::{Alignment, FocusId, Layer, LayoutConstraint};
use crate::tui::{Element, Theme};

/// Walks the element tree, drawing ratatui widgets and filling the
/// interaction and focus registries for this frame.
pub struct Renderer;

impl Renderer {
    pub fn render<Msg: Clone + Send + 'static>(
        frame: &mut Frame,
        theme: &Theme,
        registry: &mut InteractionRegistry<Msg>,
        focus_registry: &mut FocusRegistry<Msg>,
        focused_id: Option<&FocusId>,
        element: &Element<Msg>,
        area: Rect,
    ) {
        Self::render_element(frame, theme, registry, focus_registry, focused_id, element, area, false);
    }

    fn element_contains_focus<Msg>(element: &Element<Msg>, focused_id: &FocusId) -> bool {
        match element {
            Element::Button { id, .. }
            | Element::List { id, .. }
            | Element::TextInput { id, .. } => id == focused_id,
            Element::Column { items, .. } | Element::Row { items, .. } => items
                .iter()
                .any(|(_, child)| Self::element_contains_focus(child, focused_id)),
            Element::Container { child, .. } | Element::Panel { child, .. } => {
                Self::element_contains_focus(child, focused_id)
            }
            Element::Stack { layers } => layers
                .iter()
                .any(|layer| Self::element_contains_focus(&layer.element, focused_id)),
            _ => false,
        }
    }

    fn button_on_key<Msg: Clone + Send + 'static>(
        on_press: Option<Msg>,
    ) -> Box<dyn Fn(KeyCode) -> Option<Msg> + Send> {
        Box::new(move |key| match key {
            KeyCode::Enter | KeyCode::Char(' ') => on_press.clone(),
            _ => None,
        })
    }

    fn list_on_key<Msg: Clone + Send + 'static>(
        selected: Option<usize>,
        on_navigate: Option<fn(KeyCode) -> Msg>,
        on_activate: Option<fn(usize) -> Msg>,
    ) -> Box<dyn Fn(KeyCode) -> Option<Msg> + Send> {
        Box::new(move |key| match key {
            KeyCode::Up
            | KeyCode::Down
            | KeyCode::PageUp
            | KeyCode::PageDown
            | KeyCode::Home
            | KeyCode::End => on_navigate.map(|f| f(key)),
            KeyCode::Enter => match (selected, on_activate) {
                (Some(idx), Some(activate)) => Some(activate(idx)),
                _ => None,
            },
            _ => None,
        })
    }

    fn text_input_on_key<Msg: Clone + Send + 'static>(
        on_change: Option<fn(KeyCode) -> Msg>,
        on_submit: Option<Msg>,
    ) -> Box<dyn Fn(KeyCode) -> Option<Msg> + Send> {
        Box::new(move |key| match key {
            KeyCode::Enter => on_submit.clone(),
            _ => on_change.map(|f| f(key)),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn render_element<Msg: Clone + Send + 'static>(
        frame: &mut Frame,
        theme: &Theme,
        registry: &mut InteractionRegistry<Msg>,
        focus_registry: &mut FocusRegistry<Msg>,
        focused_id: Option<&FocusId>,
        element: &Element<Msg>,
        area: Rect,
        inside_panel: bool,
    ) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        match element {
            Element::None => {}

            Element::Text { content, style } => {
                let widget = Paragraph::new(content.as_str())
                    .style(style.unwrap_or_else(|| Style::default().fg(theme.text)));
                frame.render_widget(widget, area);
            }

            Element::StyledText { line, background } => {
                let mut widget = Paragraph::new(line.clone());
                if let Some(bg) = background {
                    widget = widget.style(*bg);
                }
                frame.render_widget(widget, area);
            }

            Element::Button {
                id,
                label,
                on_press,
                on_hover,
                on_hover_exit,
                on_focus,
                on_blur,
                style,
            } => {
                focus_registry.register_focusable(FocusableInfo {
                    id: id.clone(),
                    rect: area,
                    on_key: Self::button_on_key(on_press.clone()),
                    on_focus: on_focus.clone(),
                    on_blur: on_blur.clone(),
                });
                if let Some(msg) = on_press {
                    registry.register_click(area, msg.clone());
                }
                if let Some(msg) = on_hover {
                    registry.register_hover(area, msg.clone());
                }
                if let Some(msg) = on_hover_exit {
                    registry.register_hover_exit(area, msg.clone());
                }

                let is_focused = focused_id == Some(id);
                let border_style = if is_focused {
                    Style::default().fg(theme.lavender)
                } else {
                    Style::default().fg(theme.overlay0)
                };
                let widget = Paragraph::new(label.as_str())
                    .block(Block::default().borders(Borders::ALL).border_style(border_style))
                    .alignment(TextAlignment::Center)
                    .style(style.unwrap_or_else(|| Style::default().fg(theme.text)));
                frame.render_widget(widget, area);
            }

            Element::Column { items, spacing } => {
                Self::render_sequence(
                    frame, theme, registry, focus_registry, focused_id,
                    items, *spacing, area, inside_panel, Direction::Vertical,
                );
            }

            Element::Row { items, spacing } => {
                Self::render_sequence(
                    frame, theme, registry, focus_registry, focused_id,
                    items, *spacing, area, inside_panel, Direction::Horizontal,
                );
            }

            Element::Container { child, padding } => {
                let inner = shrink(area, *padding);
                Self::render_element(frame, theme, registry, focus_registry, focused_id, child, inner, inside_panel);
            }

            Element::Panel { child, title } => {
                let child_has_focus = focused_id
                    .map(|fid| Self::element_contains_focus(child, fid))
                    .unwrap_or(false);
                let border_color = if child_has_focus {
                    theme.lavender
                } else {
                    theme.overlay0
                };

                let mut block = Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border_color))
                    .style(Style::default().bg(theme.base));
                if let Some(title_text) = title {
                    block = block.title(title_text.as_str());
                }

                let inner_area = block.inner(area);
                frame.render_widget(block, area);
                Self::render_element(frame, theme, registry, focus_registry, focused_id, child, inner_area, true);
            }

            Element::Stack { layers } => {
                for (i, layer) in layers.iter().enumerate() {
                    let layer_area = layer_rect(layer, area);
                    if i > 0 {
                        // Modal layers trap focus until dismissed
                        focus_registry.push_layer();
                        if layer.dim_below {
                            let dim = Block::default().style(Style::default().bg(theme.crust));
                            frame.render_widget(dim, area);
                        }
                        frame.render_widget(Clear, layer_area);
                    }
                    Self::render_element(
                        frame, theme, registry, focus_registry, focused_id,
                        &layer.element, layer_area, inside_panel,
                    );
                }
            }

            Element::List {
                id,
                items,
                selected,
                scroll_offset,
                on_activate,
                on_navigate,
                on_focus,
                on_blur,
            } => {
                focus_registry.register_focusable(FocusableInfo {
                    id: id.clone(),
                    rect: area,
                    on_key: Self::list_on_key(*selected, *on_navigate, *on_activate),
                    on_focus: on_focus.clone(),
                    on_blur: on_blur.clone(),
                });

                let visible_height = area.height as usize;
                let start = (*scroll_offset).min(items.len());
                let end = (start + visible_height).min(items.len());

                for (row, item) in items[start..end].iter().enumerate() {
                    let item_area = Rect {
                        x: area.x,
                        y: area.y + row as u16,
                        width: area.width.saturating_sub(1),
                        height: 1,
                    };
                    if let Some(activate) = on_activate {
                        registry.register_click(item_area, activate(start + row));
                    }
                    Self::render_element(frame, theme, registry, focus_registry, focused_id, item, item_area, inside_panel);
                }

                if items.len() > visible_height && visible_height > 0 {
                    Self::render_scrollbar(frame, theme, area, items.len(), visible_height, start);
                }

                if focused_id == Some(id) && !inside_panel {
                    let border = Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(theme.lavender));
                    frame.render_widget(border, area);
                }
            }

            Element::TextInput {
                id,
                value,
                cursor_pos,
                scroll_offset,
                placeholder,
                on_change,
                on_submit,
                on_focus,
                on_blur,
            } => {
                focus_registry.register_focusable(FocusableInfo {
                    id: id.clone(),
                    rect: area,
                    on_key: Self::text_input_on_key(*on_change, on_submit.clone()),
                    on_focus: on_focus.clone(),
                    on_blur: on_blur.clone(),
                });

                let is_focused = focused_id == Some(id);
                let width = area.width as usize;
                let line = if value.is_empty() && !is_focused {
                    Line::from(Span::styled(
                        placeholder.clone().unwrap_or_default(),
                        Style::default().fg(theme.overlay0),
                    ))
                } else {
                    input_line(value, *cursor_pos, *scroll_offset, width, is_focused, theme)
                };
                let widget = Paragraph::new(line)
                    .style(Style::default().fg(theme.text).bg(theme.surface0));
                frame.render_widget(widget, area);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn render_sequence<Msg: Clone + Send + 'static>(
        frame: &mut Frame,
        theme: &Theme,
        registry: &mut InteractionRegistry<Msg>,
        focus_registry: &mut FocusRegistry<Msg>,
        focused_id: Option<&FocusId>,
        items: &[(LayoutConstraint, Element<Msg>)],
        spacing: u16,
        area: Rect,
        inside_panel: bool,
        direction: Direction,
    ) {
        if items.is_empty() {
            return;
        }
        let constraints: Vec<Constraint> = items
            .iter()
            .map(|(constraint, _)| match constraint {
                LayoutConstraint::Length(n) => Constraint::Length(*n),
                LayoutConstraint::Min(n) => Constraint::Min(*n),
                LayoutConstraint::Fill(weight) => Constraint::Fill(*weight),
            })
            .collect();

        let chunks = Layout::default()
            .direction(direction)
            .constraints(constraints)
            .spacing(spacing)
            .split(area);

        for ((_, child), chunk) in items.iter().zip(chunks.iter()) {
            Self::render_element(frame, theme, registry, focus_registry, focused_id, child, *chunk, inside_panel);
        }
    }

    fn render_scrollbar(
        frame: &mut Frame,
        theme: &Theme,
        area: Rect,
        total: usize,
        visible: usize,
        scroll_offset: usize,
    ) {
        let track_x = area.x + area.width.saturating_sub(1);
        let denom = (total - visible).max(1);
        let thumb_y = (scroll_offset as f32 / denom as f32 * (area.height - 1) as f32) as u16;
        let thumb_area = Rect {
            x: track_x,
            y: area.y + thumb_y.min(area.height - 1),
            width: 1,
            height: 1,
        };
        let thumb = Paragraph::new("█").style(Style::default().fg(theme.overlay1));
        frame.render_widget(thumb, thumb_area);
    }
}

/// Compute a layer's rect inside `area` from its alignment and size
fn layer_rect<Msg>(layer: &Layer<Msg>, area: Rect) -> Rect {
    let width = layer.width.unwrap_or(area.width).min(area.width);
    let height = layer.height.unwrap_or(area.height).min(area.height);
    let slack_x = area.width - width;
    let slack_y = area.height - height;

    let (x, y) = match layer.alignment {
        Alignment::TopLeft => (0, 0),
        Alignment::TopCenter => (slack_x / 2, 0),
        Alignment::TopRight => (slack_x, 0),
        Alignment::Center => (slack_x / 2, slack_y / 2),
        Alignment::BottomLeft => (0, slack_y),
        Alignment::BottomCenter => (slack_x / 2, slack_y),
        Alignment::BottomRight => (slack_x, slack_y),
    };

    Rect {
        x: area.x + x,
        y: area.y + y,
        width,
        height,
    }
}

fn shrink(area: Rect, padding: u16) -> Rect {
    let pad_x = padding.min(area.width / 2);
    let pad_y = padding.min(area.height / 2);
    Rect {
        x: area.x + pad_x,
        y: area.y + pad_y,
        width: area.width - pad_x * 2,
        height: area.height - pad_y * 2,
    }
}

fn input_line(
    value: &str,
    cursor_pos: usize,
    scroll_offset: usize,
    width: usize,
    is_focused: bool,
    theme: &Theme,
) -> Line<'static> {
    let chars: Vec<char> = value.chars().collect();
    let end = (scroll_offset + width.saturating_sub(1)).min(chars.len());
    let visible = &chars[scroll_offset.min(chars.len())..end];

    if !is_focused {
        return Line::from(visible.iter().collect::<String>());
    }

    let cursor = cursor_pos.saturating_sub(scroll_offset).min(visible.len());
    let before: String = visible[..cursor].iter().collect();
    let at: String = visible
        .get(cursor)
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = visible.get(cursor + 1..).unwrap_or(&[]).iter().collect();

    Line::from(vec![
        Span::raw(before),
        Span::styled(at, Style::default().fg(theme.base).bg(theme.text).bold()),
        Span::raw(after),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::element::Layer;

    #[test]
    fn layer_rect_centers_sized_layers() {
        let layer: Layer<()> = Layer::new(Element::text("x")).center().size(10, 4);
        let rect = layer_rect(&layer, Rect::new(0, 0, 40, 20));
        assert_eq!(rect, Rect::new(15, 8, 10, 4));
    }

    #[test]
    fn layer_rect_clamps_to_area() {
        let layer: Layer<()> = Layer::new(Element::text("x")).center().size(100, 100);
        let rect = layer_rect(&layer, Rect::new(0, 0, 20, 10));
        assert_eq!(rect, Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn unsized_layer_fills_area() {
        let layer: Layer<()> = Layer::new(Element::text("x"));
        let area = Rect::new(2, 3, 8, 5);
        assert_eq!(layer_rect(&layer, area), area);
    }

    #[test]
    fn shrink_never_underflows() {
        let rect = shrink(Rect::new(0, 0, 3, 1), 4);
        assert_eq!(rect.width, 1);
        assert_eq!(rect.height, 1);
    }
}

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use serde_json::Value;

use crate::tui::element::FocusId;
use crate::tui::renderer::{FocusRegistry, InteractionRegistry};
use crate::tui::{Command, Element, Renderer, Subscription, Theme};

/// An Elm-style application: immutable view of state, message-driven updates,
/// commands for side effects.
pub trait App {
    type State;
    type Msg: Clone + Send + 'static;

    fn update(state: &mut Self::State, msg: Self::Msg) -> Command<Self::Msg>;
    fn view(state: &Self::State, theme: &Theme) -> Element<Self::Msg>;
    fn subscriptions(state: &Self::State) -> Vec<Subscription<Self::Msg>>;
    fn title() -> &'static str;

    fn status(_state: &Self::State, _theme: &Theme) -> Option<ratatui::text::Line<'static>> {
        None
    }
}

/// Drives one app: event routing, focus, timers, async commands.
pub struct Runtime<A: App> {
    state: A::State,
    theme: Theme,
    registry: InteractionRegistry<A::Msg>,
    focus_registry: FocusRegistry<A::Msg>,
    focused_id: Option<FocusId>,
    key_subscriptions: HashMap<KeyCode, A::Msg>,
    event_bus: HashMap<String, Vec<Box<dyn Fn(Value) -> Option<A::Msg> + Send>>>,
    timers: Vec<(Duration, Instant, A::Msg)>,
    last_hover_pos: Option<(u16, u16)>,
    pending_async: Vec<std::pin::Pin<Box<dyn std::future::Future<Output = A::Msg> + Send>>>,
    pending_publishes: Vec<(String, Value)>,
    running: bool,
}

impl<A: App> Runtime<A> {
    pub fn new(state: A::State, theme: Theme) -> Self {
        let mut runtime = Self {
            state,
            theme,
            registry: InteractionRegistry::new(),
            focus_registry: FocusRegistry::new(),
            focused_id: None,
            key_subscriptions: HashMap::new(),
            event_bus: HashMap::new(),
            timers: Vec::new(),
            last_hover_pos: None,
            pending_async: Vec::new(),
            pending_publishes: Vec::new(),
            running: true,
        };
        runtime.update_subscriptions();
        runtime
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> &A::State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut A::State {
        &mut self.state
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn take_publishes(&mut self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.pending_publishes)
    }

    pub fn key_bindings(&self) -> Vec<(KeyCode, String)> {
        A::subscriptions(&self.state)
            .into_iter()
            .filter_map(|sub| match sub {
                Subscription::Keyboard { key, description, .. } => Some((key, description)),
                _ => None,
            })
            .collect()
    }

    /// Feed an externally produced message through the update cycle
    pub fn dispatch(&mut self, msg: A::Msg) -> Result<()> {
        let command = A::update(&mut self.state, msg);
        self.execute_command(command)?;
        self.update_subscriptions();
        Ok(())
    }

    pub fn focus_next(&mut self) -> Result<()> {
        self.cycle_focus(true)
    }

    pub fn focus_previous(&mut self) -> Result<()> {
        self.cycle_focus(false)
    }

    fn cycle_focus(&mut self, forward: bool) -> Result<()> {
        let ids = self.focus_registry.focusable_ids_in_active_layer();
        if ids.is_empty() {
            return Ok(());
        }
        let next = match &self.focused_id {
            Some(current) => match ids.iter().position(|id| id == current) {
                Some(pos) if forward => ids[(pos + 1) % ids.len()].clone(),
                Some(pos) => ids[(pos + ids.len() - 1) % ids.len()].clone(),
                None => ids[0].clone(),
            },
            None if forward => ids[0].clone(),
            None => ids[ids.len() - 1].clone(),
        };
        self.execute_command(Command::set_focus(next))?;
        Ok(())
    }

    /// Fire timer subscriptions whose interval has elapsed
    pub fn poll_timers(&mut self) -> Result<()> {
        let now = Instant::now();
        let mut messages = Vec::new();
        for (interval, last_tick, msg) in &mut self.timers {
            if now.duration_since(*last_tick) >= *interval {
                messages.push(msg.clone());
                *last_tick = now;
            }
        }
        for msg in messages {
            self.dispatch(msg)?;
        }
        Ok(())
    }

    /// Poll pending async commands without blocking the event loop
    pub async fn poll_async(&mut self) -> Result<()> {
        use std::task::{Context, Poll};

        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut completed = Vec::new();
        for (i, future) in self.pending_async.iter_mut().enumerate() {
            if let Poll::Ready(msg) = future.as_mut().poll(&mut cx) {
                completed.push((i, msg));
            }
        }
        completed.sort_by(|a, b| b.0.cmp(&a.0));
        for (i, msg) in completed {
            self.pending_async.remove(i);
            self.dispatch(msg)?;
        }
        Ok(())
    }

    fn update_subscriptions(&mut self) {
        self.key_subscriptions.clear();
        self.event_bus.clear();

        let mut intervals = Vec::new();
        for sub in A::subscriptions(&self.state) {
            match sub {
                Subscription::Keyboard { key, msg, .. } => {
                    self.key_subscriptions.insert(key, msg);
                }
                Subscription::Subscribe { topic, handler } => {
                    self.event_bus.entry(topic).or_default().push(handler);
                }
                Subscription::Timer { interval, msg } => intervals.push((interval, msg)),
            }
        }

        // Keep existing tick anchors so re-subscribing doesn't reset timers
        let old: Vec<(Duration, Instant)> =
            self.timers.iter().map(|(d, t, _)| (*d, *t)).collect();
        self.timers = intervals
            .into_iter()
            .map(|(interval, msg)| {
                let last_tick = old
                    .iter()
                    .find(|(d, _)| *d == interval)
                    .map(|(_, t)| *t)
                    .unwrap_or_else(Instant::now);
                (interval, last_tick, msg)
            })
            .collect();
    }

    pub fn handle_key(&mut self, key_event: KeyEvent) -> Result<()> {
        if key_event.kind != KeyEventKind::Press {
            return Ok(());
        }

        if key_event.code == KeyCode::Tab {
            return self.focus_next();
        }
        if key_event.code == KeyCode::BackTab {
            return self.focus_previous();
        }

        // Escape blurs the focused element before anything else sees it
        if key_event.code == KeyCode::Esc {
            if let Some(focused_id) = self.focused_id.take() {
                if let Some(focusable) = self.focus_registry.find_in_active_layer(&focused_id) {
                    if let Some(on_blur) = focusable.on_blur.clone() {
                        self.dispatch(on_blur)?;
                    }
                }
            }
            // Fall through: apps may subscribe to Esc (e.g. popup dismissal)
        }

        if let Some(focused_id) = &self.focused_id {
            if let Some(focusable) = self.focus_registry.find_in_active_layer(focused_id) {
                if let Some(msg) = (focusable.on_key)(key_event.code) {
                    return self.dispatch(msg);
                }
            }
        }

        if let Some(msg) = self.key_subscriptions.get(&key_event.code).cloned() {
            return self.dispatch(msg);
        }

        Ok(())
    }

    pub fn handle_mouse(&mut self, mouse_event: MouseEvent) -> Result<()> {
        let pos = (mouse_event.column, mouse_event.row);

        match mouse_event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                match self.focus_registry.find_at_position(pos.0, pos.1) {
                    Some(clicked_id) => {
                        if self.focused_id.as_ref() != Some(&clicked_id) {
                            self.execute_command(Command::set_focus(clicked_id))?;
                        }
                    }
                    None => {
                        if self.focused_id.is_some() {
                            self.execute_command(Command::clear_focus())?;
                        }
                    }
                }

                if let Some(msg) = self.registry.find_click(pos.0, pos.1) {
                    self.dispatch(msg)?;
                }
            }
            MouseEventKind::Moved => {
                if let Some(last_pos) = self.last_hover_pos {
                    if last_pos != pos {
                        if let Some(msg) = self.registry.find_hover_exit(last_pos.0, last_pos.1) {
                            self.dispatch(msg)?;
                        }
                    }
                }
                if let Some(msg) = self.registry.find_hover(pos.0, pos.1) {
                    self.dispatch(msg)?;
                }
                self.last_hover_pos = Some(pos);
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                let key = if mouse_event.kind == MouseEventKind::ScrollUp {
                    KeyCode::Up
                } else {
                    KeyCode::Down
                };
                if let Some(focused_id) = &self.focused_id {
                    if let Some(focusable) = self.focus_registry.find_in_active_layer(focused_id) {
                        let over = pos.0 >= focusable.rect.x
                            && pos.0 < focusable.rect.x + focusable.rect.width
                            && pos.1 >= focusable.rect.y
                            && pos.1 < focusable.rect.y + focusable.rect.height;
                        if over {
                            if let Some(msg) = (focusable.on_key)(key) {
                                self.dispatch(msg)?;
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    pub fn handle_publish(&mut self, topic: &str, data: Value) -> Result<()> {
        let messages: Vec<A::Msg> = self
            .event_bus
            .get(topic)
            .map(|handlers| handlers.iter().filter_map(|h| h(data.clone())).collect())
            .unwrap_or_default();
        for msg in messages {
            self.dispatch(msg)?;
        }
        Ok(())
    }

    fn execute_command(&mut self, command: Command<A::Msg>) -> Result<()> {
        match command {
            Command::None => {}

            Command::Batch(commands) => {
                for cmd in commands {
                    self.execute_command(cmd)?;
                }
            }

            Command::Quit => {
                self.running = false;
            }

            Command::Publish { topic, data } => {
                self.handle_publish(&topic, data.clone())?;
                self.pending_publishes.push((topic, data));
            }

            Command::Perform(future) => {
                self.pending_async.push(future);
            }

            Command::SetFocus(id) => {
                if let Some(old_id) = self.focused_id.take() {
                    if let Some(focusable) = self.focus_registry.find_in_active_layer(&old_id) {
                        if let Some(on_blur) = focusable.on_blur.clone() {
                            let cmd = A::update(&mut self.state, on_blur);
                            self.execute_command(cmd)?;
                        }
                    }
                }
                self.focused_id = Some(id.clone());
                if let Some(focusable) = self.focus_registry.find_in_active_layer(&id) {
                    if let Some(on_focus) = focusable.on_focus.clone() {
                        let cmd = A::update(&mut self.state, on_focus);
                        self.execute_command(cmd)?;
                    }
                }
            }

            Command::ClearFocus => {
                if let Some(old_id) = self.focused_id.take() {
                    if let Some(focusable) = self.focus_registry.find_in_active_layer(&old_id) {
                        if let Some(on_blur) = focusable.on_blur.clone() {
                            let cmd = A::update(&mut self.state, on_blur);
                            self.execute_command(cmd)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.registry.clear();
        self.focus_registry.clear();

        let view = A::view(&self.state, &self.theme);
        Renderer::render(
            frame,
            &self.theme,
            &mut self.registry,
            &mut self.focus_registry,
            self.focused_id.as_ref(),
            &view,
            area,
        );

        // Element gone from the tree while focused: drop focus
        if let Some(focused_id) = &self.focused_id {
            if !self.focus_registry.contains(focused_id) {
                self.focused_id = None;
            }
        }
    }
}

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::tui::element::FocusId;

/// Side effects an app wants the runtime to perform. Returned from `update()`
/// and executed by the runtime after the state mutation has been applied.
pub enum Command<Msg> {
    /// Do nothing
    None,

    /// Execute multiple commands in sequence
    Batch(Vec<Command<Msg>>),

    /// Perform an async operation and feed the result back as a message
    Perform(Pin<Box<dyn Future<Output = Msg> + Send>>),

    /// Publish an event to the event bus
    Publish { topic: String, data: Value },

    /// Set keyboard focus to a specific element
    SetFocus(FocusId),

    /// Clear focus from all elements
    ClearFocus,

    /// Quit the application
    Quit,
}

impl<Msg> Command<Msg> {
    pub fn perform<F, T>(future: F, to_msg: impl Fn(T) -> Msg + Send + 'static) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        Msg: Send + 'static,
    {
        Command::Perform(Box::pin(async move {
            let result = future.await;
            to_msg(result)
        }))
    }

    pub fn publish<T: serde::Serialize>(topic: impl Into<String>, data: T) -> Self {
        Command::Publish {
            topic: topic.into(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    pub fn batch(commands: Vec<Command<Msg>>) -> Self {
        Command::Batch(commands)
    }

    pub fn set_focus(id: FocusId) -> Self {
        Command::SetFocus(id)
    }

    pub fn clear_focus() -> Self {
        Command::ClearFocus
    }
}

impl<Msg> Default for Command<Msg> {
    fn default() -> Self {
        Command::None
    }
}

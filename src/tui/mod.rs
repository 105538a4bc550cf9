pub mod command;
pub mod element;
pub mod renderer;
pub mod runtime;
pub mod subscription;
pub mod theme;
pub mod widgets;

pub use command::Command;
pub use element::{Alignment, Element, FocusId, Layer, LayoutConstraint};
pub use renderer::{FocusRegistry, InteractionRegistry, Renderer};
pub use runtime::{App, Runtime};
pub use subscription::Subscription;
pub use theme::{Theme, ThemeVariant};

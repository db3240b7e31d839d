//! Admin-side dispatch: decoded button actions and the console that applies them.

pub mod action;
pub mod console;
pub mod view;

pub use action::{ActionKind, CallbackAction};
pub use console::{AdminConsole, InputStep};
pub use view::{admin_tree, public_view};

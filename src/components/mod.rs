//! Maud HTML template components for the web UI.
//!
//! - `layout`: Base page layout and navigation
//! - `button`: Buttons, links styled as buttons, and form submit actions
//! - `alert`: Alert messages

pub mod alert;
pub mod button;
pub mod layout;

pub use alert::{Alert, AlertVariant};
pub use button::{Button, ButtonVariant};
pub use layout::BaseLayout;

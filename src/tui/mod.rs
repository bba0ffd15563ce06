mod form;
pub mod theme;
pub mod widgets;

pub use form::run_app;
pub use theme::Theme;
pub use widgets::{FieldPath, FormField, FormState};

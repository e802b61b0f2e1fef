//! HTTP handlers for cwa-annotate

pub mod health;
pub mod pages;
pub mod progress;
pub mod session_cookie;
pub mod ui;

pub use health::health_routes;
pub use pages::{annotate, login, logout, show_page};
pub use progress::progress;
pub use ui::serve_annotate_js;

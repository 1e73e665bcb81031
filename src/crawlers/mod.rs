pub mod crawler;
pub mod scroll;
pub mod web;

pub use crawler::{PageDriver, ScrollPosition, with_session};
pub use scroll::{ScrollState, collect_images};
pub use web::WebSession;

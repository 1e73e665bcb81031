pub mod html;

pub use html::image_sources;

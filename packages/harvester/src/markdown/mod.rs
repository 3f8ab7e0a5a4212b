//! Markdown output: front matter, escaping and document rendering.

pub mod escape;
mod frontmatter;
mod render;

pub use frontmatter::front_matter;
pub use render::render;

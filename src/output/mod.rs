//! Output artifacts: rendering and writing

pub mod renderer;
pub mod writer;

pub use renderer::{RenderOptions, RenderedArtifacts, Renderer};
pub use writer::{ArtifactWriter, WrittenArtifacts};

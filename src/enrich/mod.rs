// src/enrich/mod.rs
pub mod image;
pub mod summary;

pub use image::{resolve_image, ImageResolver, ImageSource};
pub use summary::{summarize, DynSummarizer, Summarizer};

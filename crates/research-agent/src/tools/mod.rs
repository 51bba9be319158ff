//! The tools the research agent can use.

mod reasoning;
mod web_search;
mod wikipedia;

pub use reasoning::{AnalyzeTool, NextAction, ThinkTool};
pub use web_search::WebSearchTool;
pub use wikipedia::WikipediaTool;

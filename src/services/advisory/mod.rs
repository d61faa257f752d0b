pub mod client;
pub mod prompt;

pub use client::AdvisoryService;
pub use prompt::{format_prompt, format_prompt_json};

use std::future::Future;

/// Anything that turns a prompt into a short radio message.
///
/// Errors of any kind are treated the same by the engine: no response, use
/// the fallback.
pub trait AdvisoryGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = anyhow::Result<String>> + Send;
}

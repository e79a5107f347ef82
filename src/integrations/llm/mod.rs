pub mod client;

#[cfg(test)]
pub use client::MockTextGenerator;
pub use client::{OpenAiCompatibleClient, TextGenerator};

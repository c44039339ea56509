// LLM abstraction layer

pub mod provider;
pub mod groq;

pub use provider::*;
pub use groq::GroqAdapter;

pub mod gemini_provider;
pub mod huggingface_provider;
pub mod ollama_provider;
pub mod openai_provider;
pub mod provider;
pub mod types;


pub use gemini_provider::GeminiProvider;
pub use huggingface_provider::HuggingFaceProvider;
pub use ollama_provider::OllamaProvider;
pub use openai_provider::OpenAIProvider;
pub use provider::{AdapterFactory, BackendAdapter, BackendDescriptor, deadline_after, run_bounded};
pub use types::*;

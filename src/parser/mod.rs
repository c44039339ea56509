// Hosted document parsing

pub mod llama_cloud;

pub use llama_cloud::LlamaCloudParser;

//! Agent System
//!
//! One agent per request type. The only request today is "answer this prompt
//! about this file":
//!
//! ```text
//! Upload ──► DocumentProcessor ──► PreparedContent
//!                                        │
//!                                        ▼
//!                                 FileUploadAgent ──► LLMAdapter
//!                                        │
//!                                        ▼
//!                                  output text
//! ```

pub mod file_upload;

pub use file_upload::FileUploadAgent;

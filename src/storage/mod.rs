//! Upload Storage
//!
//! Request-scoped files on local disk. Every file the service writes (the
//! upload itself and any rasterized page) is owned by a [`ScratchFile`],
//! whose drop is the single point where the file is removed.

pub mod scratch;
pub mod uploads;

pub use scratch::ScratchFile;
pub use uploads::{sanitize_filename, StoredUpload, UploadDir};

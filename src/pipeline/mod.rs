//! Pipeline stages for fetching and converting specification archives.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a stub remote source) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! list ──▶ download ──▶ extract ──▶ convert
//! (FTP)    (FTP→disk)   (unzip)     (HTTP→PDF)
//! ```
//!
//! 1. [`list`]     — resolve the ordered archive listing for a release
//! 2. [`download`] — stage each archive locally; partial files are removed
//! 3. [`extract`]  — unzip staged archives; runs in `spawn_blocking`
//!    because zip decompression is CPU-bound
//! 4. [`convert`]  — POST each document to the conversion service; the only
//!    stage with HTTP I/O
//!
//! Each stage consumes only what the previous stage produced; none of them
//! reaches back to an earlier stage's inputs.

pub mod convert;
pub mod download;
pub mod extract;
pub mod list;

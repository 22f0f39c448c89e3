//! Legacy-encoding and escape-aware text primitives.
//!
//! - `codec`: CP437 byte/code-point tables and transcoding.
//! - `escape`: escape-sequence boundary scanning shared with the render crate.
//! - `width`: visible length, truncate, pad and aligned fixed-width fields.
//! - `sauce`: trailing metadata record stripping for art files.
//!
//! Everything here is pure and synchronous; the only shared state is the
//! constant code page tables.

pub mod codec;
pub mod escape;
pub mod sauce;
pub mod width;

pub use codec::{Target, decode, encode, encode_str, transcode_to_utf8};
pub use width::{
    Alignment, apply_width_constraint, apply_width_constraint_aligned, pad, truncate,
    visible_length,
};

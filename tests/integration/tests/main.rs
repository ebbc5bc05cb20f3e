//! End-to-end tests over the public `samlmd` API.
//!
//! Documents are parsed from text, rebuilt, signed and verified the way a
//! consumer of the crate would do it.

mod assertions;
mod common;
mod dispatch;
mod metadata_roundtrip;
mod signatures;

//! FRB-facing FFI crate for the Inkpad core.
//!
//! Generated bridge glue is produced by `flutter_rust_bridge_codegen` into
//! the Flutter workspace; this crate only carries the stable API surface.

pub mod api;

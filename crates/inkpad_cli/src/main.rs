//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `inkpad_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    // Tiny probe to validate core crate wiring independently from the
    // Flutter/FFI runtime setup.
    println!("inkpad_core ping={}", inkpad_core::ping());
    println!("inkpad_core version={}", inkpad_core::core_version());
}

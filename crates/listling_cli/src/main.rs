//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `listling_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("listling_core ping={}", listling_core::ping());
    println!("listling_core version={}", listling_core::core_version());
}

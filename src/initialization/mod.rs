//! Process and loader resource setup.
//!
//! - HTTP clients for the direct strategy
//! - Logger (binary only)
//! - TLS crypto provider

mod client;
mod logger;

use rustls::crypto::{ring::default_provider, CryptoProvider};

// Re-export public API
pub use client::init_client;
pub use logger::init_logger_with;

/// Installs `ring` as the process-wide `rustls` crypto provider.
///
/// The SSL verifier builds its config with an explicit provider, so this is
/// only needed by code that relies on the process default.
pub fn init_crypto_provider() {
    // Reinstalling is harmless; the error only reports an existing provider.
    let _ = CryptoProvider::install_default(default_provider());
}

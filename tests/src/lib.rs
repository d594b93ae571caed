//! # NAKT Overlay Test Suite
//!
//! Cross-crate flows that no single crate can test on its own.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── nakt_benchmarks.rs      # criterion: derivation and routing cost
//! └── src/integration/
//!     ├── key_distribution_flow.rs  # KDC service against raw HMAC chains
//!     ├── routing_flow.rs           # runtime messages through the gate
//!     └── simulation_flow.rs        # whole runs from JSON configuration
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p nk-tests
//! cargo test -p nk-tests integration::routing_flow
//! cargo bench -p nk-tests
//! ```

pub mod integration;

//! The Conformance Harness (§4.6): fixture-driven differential and golden
//! testing across adapters.
//!
//! No teacher counterpart exists for a golden-fixture harness; this is
//! grounded in the way `angular-compiler-cli`'s golden-file compiler tests
//! and `pax-compiler`'s manifest-snapshot tests structure theirs, expressed
//! here as plain `assert_eq!` comparisons against normalized HTML strings
//! rather than a snapshot-testing crate.

pub mod bless;
pub mod fixture;
pub mod normalize;
pub mod runner;

pub use fixture::Fixture;
pub use normalize::normalize_html;
pub use runner::{run_adapter_conformance, run_client_script_conformance, run_differential, RunOutcome};

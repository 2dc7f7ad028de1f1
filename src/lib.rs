// -- Lint policy ---------------------------------------------------------
// Crate-wide lints. Levels for the rustc lints live in Cargo.toml.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Live transit map engine: snapshot reconciliation and smooth vehicle
//! motion.
//!
//! Metro-live keeps a set of map markers ("proxies") in step with a polled
//! feed of vehicle positions. Each snapshot is diffed against what is on the
//! map: new vehicles appear where they are reported, moved vehicles glide to
//! their new position over a fixed number of frames, and vanished vehicles
//! are removed. Route lines and stations are synced the same way on every
//! full refresh.
//!
//! # Key entry points
//!
//! - [`engine::LiveMap`] - the engine; call [`engine::LiveMap::tick`] once
//!   per frame
//! - [`surface::VisualSurface`] - what the engine draws on
//! - [`feed::TransitFeed`] - where routes, stations and positions come from
//! - [`poll::FetchWorker`] - background fetching with lock-free hand-off
//! - [`options::Options`] - runtime configuration (animation, polling, feed,
//!   display)
//!
//! # Architecture
//!
//! All map state lives on one thread. Fetches run either inline or on a
//! background [`poll::FetchWorker`] that publishes results through triple
//! buffers, so animation frames keep advancing while a request is in flight.
//! A failed or unavailable fetch leaves the map exactly as it was.

pub mod animation;
pub mod engine;
pub mod error;
pub mod feed;
pub mod geo;
pub mod options;
pub mod poll;
pub mod reconcile;
pub mod registry;
pub mod statics;
pub mod surface;
pub mod util;

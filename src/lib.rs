// -- Lint policy ---------------------------------------------------------
// Crate-wide lints. Groups and thresholds live in Cargo.toml.

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
// Tests assert with unwrap on known-good fixtures
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Animation core for phylogenetic tree movies.
//!
//! A movie is an ordered sequence of trees: full trees (`T`), pre-baked
//! intermediates (`IT`) and consensus trees (`C`). This crate turns that
//! sequence into a smoothly animated radial tree, frame by frame, and hands
//! the result to a renderer as declarative layer descriptors.
//!
//! # Key entry points
//!
//! - [`keyframes::KeyframeStore`] - the immutable movie and its
//!   per-transition metadata
//! - [`resolver::TransitionIndexResolver`] - position to transition index
//!   mapping
//! - [`layout::LayoutWorker`](layout::worker::LayoutWorker) - background
//!   radial layout of keyframes
//! - [`interpolation::interpolate`] - blends two keyframe layouts
//! - [`style::LayerStyleResolver`] - per-element colors, widths and dashes
//! - [`layers::LayerFactory`] - builds and diffs the layer set
//! - [`controller::AnimationController`] - owns the timeline and runs the
//!   frame loop
//! - [`options::Options`] - runtime configuration with TOML presets
//!
//! # Architecture
//!
//! Layouts are computed off the frame thread by a [`layout::worker`]
//! reached through a [`layout::worker::LayoutTransport`]; results land in
//! a [`layout::LayoutCache`]. Each frame the controller picks the keyframe
//! pair around the playhead, publishes the highlight sets for the visible
//! transition to the [`style::ColorManager`], interpolates in polar space
//! and rebuilds only the layers whose inputs changed.

pub mod controller;
pub mod error;
pub mod interpolation;
pub mod keyframes;
pub mod layers;
pub mod layout;
pub mod options;
pub mod resolver;
pub mod style;
pub mod util;

pub use controller::{AnimationController, FrameHandle, FrameScheduler, LayerSink};
pub use error::MovieError;
pub use interpolation::{interpolate, Frame, InterpolationOptions};
pub use keyframes::{KeyframeStore, MovieData, TreeData};
pub use layers::{LayerFactory, LayerSet};
pub use layout::worker::{InlineLayoutWorker, LayoutTransport, LayoutWorker};
pub use layout::{Layout, LayoutCache, LayoutCalculator, LayoutOptions, RadialLayout};
pub use options::Options;
pub use resolver::TransitionIndexResolver;
pub use style::{ColorManager, LayerStyleResolver, RenderStateCache};

//! Rendering
//!
//! - [`graph`]: render-graph interfaces and the in-memory recording executor
//! - [`gbuffer`]: the deferred G-Buffer stage
//! - [`backend`]: wgpu implementations of the graph interfaces

pub mod backend;
pub mod gbuffer;
pub mod graph;

//! # l1000geom - Monte Carlo geometry generator for LEGEND-1000
//!
//! This library resolves the hierarchical LEGEND-1000 geometry configuration
//! into a named, placed volume tree that Geant4/remage simulations consume.
//!
//! ## Overview
//!
//! A build starts from a base configuration (string layout, detail table, PMT
//! rows, dummy detector templates), optionally merged with an override
//! document. A detail level, optionally narrowed by an assembly allow-list,
//! resolves to one construction directive per assembly. Channelmap and special
//! metadata are either synthesized from the configuration or read from files.
//! The assemblies are then composed, all-or-nothing, into a
//! [`VolumeRegistry`](geometry::VolumeRegistry).
//!
//! ## Architecture
//!
//! - `config`, `config_loader`: configuration model, override merging and file loading
//! - `detail`: detail levels, assemblies and directives
//! - `placement`: polar placement and thermal contraction
//! - `naming`: the volume naming grammar and per-build uniqueness tracking
//! - `metadata`: channelmap and special metadata, the generator and detector providers
//! - `materials`: material and optical surface catalog
//! - `geometry`: shapes, transforms and the volume registry
//! - `assembly`: the per-assembly builders
//! - `export`: GDML, Geant4 macros, overlap check and viewer scenes
//! - `orchestrator`: one build from request to registry
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use l1000geom::detail::DetailLevel;
//! use l1000geom::export;
//! use l1000geom::orchestrator::{construct, GeometryRequest};
//! use std::path::Path;
//!
//! let request = GeometryRequest {
//!     detail: DetailLevel::Radiogenic,
//!     assemblies: Some("cryo,hpge_strings".to_string()),
//!     ..GeometryRequest::default()
//! };
//! let geometry = construct(&request)?;
//! export::write_gdml(&geometry.registry, &geometry.catalog, Path::new("l1000.gdml"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`error::Result`] with a [`error::GeometryError`].
//! The binaries report these through `color_eyre`.

pub mod assembly;
pub mod config;
pub mod config_loader;
pub mod detail;
pub mod error;
pub mod export;
pub mod geometry;
pub mod materials;
pub mod metadata;
pub mod naming;
pub mod orchestrator;
pub mod placement;

//! Epinetix — tenant-scoped analytics and personalization core for a
//! multi-tenant hypermedia content server.
//!
//! # Module Organization
//!
//! - `config`: Application configuration from environment variables
//! - `infrastructure`: Effect implementations (tenant locating, metrics, content lookup)
//! - `presentation`: HTTP handlers for the operational surface (health, metrics)
//! - `state`: Application state container with `FromRef` implementations
//!
//! Content-serving and caching logic itself lives in the library crates this
//! binary composes: `epinetix-cache`, `epinetix-events`, `epinetix-warming`,
//! `epinetix-analytics`, `epinetix-beliefs`, `epinetix-fanout`, `epinetix-tenant`.

pub mod config;
pub mod infrastructure;
pub mod presentation;
pub mod state;

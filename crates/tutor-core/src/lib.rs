//! tutor-core
//!
//! Domain types, engine traits, configuration and text chunking shared by the
//! lexical, vector and hybrid retrieval crates.
#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

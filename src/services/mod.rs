// src/services/mod.rs

//! Business rules. Handlers stay thin and call into these.

pub mod activity;
pub mod content;
pub mod identity;
pub mod progression;
pub mod roster;
pub mod scoring;

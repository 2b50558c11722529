//! # stereo-host
//!
//! Resolves the machine's display topology, picks a presentation backend
//! from it and drives the acquire/draw/submit cycle on a dedicated render
//! thread until stopped.
//!
//! ## Modes
//!
//! - **Live**: enumerate monitors and adapters from the running system.
//! - **Fixture**: resolve against a TOML machine description (`--fixture`).
//! - **Report**: print the resolved topology as JSON and exit (`--report`).
//!
//! Presentation surfaces are headless: frames go through the full handoff
//! and deadline monitoring but nothing is drawn on screen.

pub mod config;
pub mod headless;
pub mod render;
pub mod startup;

//! UI module root: exposes drawing functions for individual panels.

pub mod bar;
pub mod header;
pub mod stats;
pub mod theme;
pub mod windows;

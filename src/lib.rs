//! Road Traffic Library
//!
//! Editable Bézier roads with two-lane traffic that can run headless or be
//! embedded in an editor.

pub mod simulation;

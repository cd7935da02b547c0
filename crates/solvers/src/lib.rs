//! Time-stepping schemes for Hawser.
//!
//! The [`transient`] module holds the stepping engine: a closed set of
//! explicit and implicit schemes that advance any [`hawser_core::Dynamics`]
//! implementation one step at a time.

pub mod transient;

//! Low-level plumbing shared by the sheet readers: ZIP member access,
//! XML event handling, and monetary text parsing.

pub(crate) mod money;
pub mod xml;
pub(crate) mod zip;

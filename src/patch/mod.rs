//! Two-pass rewrite of LWJGL imports: a prescan collects calls that must stay
//! fully qualified, then each line is rewritten against the static imports.

pub mod apply;
pub mod imports;
pub mod prescan;
pub mod rewrite;

pub use apply::{PatchSummary, Patcher};

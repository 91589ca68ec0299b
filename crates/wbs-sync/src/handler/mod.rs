//! The per-node-type sync actions and the placement machinery they share.

mod component;
mod probe;
mod psp;
mod resolve;
mod root;
mod task;

pub(crate) use component::ComponentSync;
pub(crate) use probe::ProbeTaskSync;
pub(crate) use psp::PspTaskSync;
pub(crate) use root::sync_root;
pub(crate) use task::TaskSync;

pub(crate) mod common;
mod decisions;
mod sweep;

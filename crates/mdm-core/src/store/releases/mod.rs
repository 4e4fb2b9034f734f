//! Movie and release operations on [`ReleaseDb`](super::ReleaseDb).

mod read;
mod write;

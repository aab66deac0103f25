//! Wire types shared between the dashboard client and the solver demo backends.

pub mod domain;
pub mod error;
pub mod protocol;

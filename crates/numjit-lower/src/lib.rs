//! Lowering passes that run after type setting.
//!
//! - [`iterable`]: `for` loops become counted loops over an index
//! - [`specialize`]: value representation, object temporaries, runtime
//!   calls and the error return
//!
//! Both passes expect every node to carry its final `ty`.

pub mod iterable;
pub mod specialize;

pub use iterable::lower_iterables;
pub use specialize::{specialize, BAD_INT};

//! Pure, side-effect-free log decoding and subject filtering (`spec.md`
//! §4.1, §4.2). Neither module performs I/O, so both are exercised by
//! plain unit tests with no broker or registry in the loop.

mod decode;
mod filter;

pub use decode::decode;
pub use filter::Glob;

//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the engine and something it
//! does not own (time, the filesystem). Implementations live in
//! `src/adapters/`. Storage strategies have their own boundary in
//! [`crate::store`].

pub mod clock;
pub mod filesystem;

pub use clock::Clock;
pub use filesystem::FileSystem;

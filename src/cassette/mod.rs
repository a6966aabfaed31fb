//! Recordings: the persisted format, the per-test call buffer, the replay
//! cursor, and the session that ties them to a test's lifecycle.

pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;

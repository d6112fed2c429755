//! Level math
//!
//! Pure helpers shared by the playback engine: gain unit conversion and the
//! linear ramp used by music fades.

mod gain;
mod ramp;

pub use gain::{db_to_linear, linear_to_db, MAX_GAIN_DB, SILENCE_DB};
pub use ramp::LinearRamp;

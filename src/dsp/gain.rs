//! Gain Units
//!
//! Conversions between linear amplitude (the unit every channel volume is
//! expressed in) and decibels, for hosts whose mixers speak dB.

// ============================================================================
// Constants
// ============================================================================

/// Level reported for silence (linear 0.0)
pub const SILENCE_DB: f32 = -80.0;

/// Maximum level in dB accepted by [`db_to_linear`] (+24 dB)
pub const MAX_GAIN_DB: f32 = 24.0;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// Anything at or below [`SILENCE_DB`] maps to exactly 0.0 so that a fully
/// attenuated mixer group is silent rather than merely very quiet.
///
/// # Example
/// ```
/// use resound::dsp::db_to_linear;
/// assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
/// assert_eq!(db_to_linear(-80.0), 0.0);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    if db <= SILENCE_DB {
        return 0.0;
    }
    10.0_f32.powf(db.min(MAX_GAIN_DB) / 20.0)
}

/// Convert linear amplitude to decibels
///
/// # Arguments
/// * `linear` - Amplitude multiplier; values <= 0 are treated as silence
///
/// # Returns
/// Level in dB, never lower than [`SILENCE_DB`]
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * linear.log10()).max(SILENCE_DB)
}

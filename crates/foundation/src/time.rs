/// Engine time primitives
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Time(pub f64); // seconds

/// Milliseconds to seconds, for timer delays expressed in ms constants.
pub fn ms(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

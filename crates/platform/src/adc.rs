//! ADC sampling traits.

/// Error from a single ADC conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("ADC channel {0} does not exist")]
    NoSuchChannel(u32),

    #[error("ADC conversion on channel {channel} failed: {reason}")]
    Conversion { channel: u32, reason: String },
}

/// Source of raw integer samples, one per call, addressed by channel id.
///
/// Reads are expected to complete in bounded time; implementations that
/// talk to hardware should not block indefinitely.
pub trait AdcSource: Send + Sync {
    /// Take one conversion on `channel`.
    fn read(&self, channel: u32) -> Result<i32, SampleError>;
}

//! Running mean over the most recent ADC samples.

/// Number of voltage samples averaged by default.
pub const SAMPLE_WINDOW: usize = 4;

/// Fixed-size circular buffer that keeps a running sum.
///
/// `N` must be a power of two so the modulo and the division reduce to a
/// mask and a shift. The buffer starts zeroed, so the first `N - 1`
/// averages are pulled towards zero until the window is primed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWindow<const N: usize = SAMPLE_WINDOW> {
    samples: [i32; N],
    cursor: usize,
    sum: i64,
}

impl<const N: usize> Default for SampleWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SampleWindow<N> {
    pub fn new() -> Self {
        const { assert!(N > 0 && N.is_power_of_two(), "window size must be a power of two") };
        Self {
            samples: [0; N],
            cursor: 0,
            sum: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Replace the oldest sample and return the new average.
    pub fn push(&mut self, sample: i32) -> i32 {
        self.sum -= i64::from(self.samples[self.cursor]);
        self.samples[self.cursor] = sample;
        self.sum += i64::from(sample);
        self.cursor = (self.cursor + 1) % N;
        self.average()
    }

    /// Mean of the window, truncated toward zero.
    pub fn average(&self) -> i32 {
        (self.sum / N as i64) as i32
    }

    pub fn sum(&self) -> i64 {
        self.sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_average_truncates() {
        let mut window = SampleWindow::<4>::new();
        let averages: Vec<i32> = [10, 20, 30, 40].iter().map(|&s| window.push(s)).collect();
        assert_eq!(averages, vec![2, 7, 15, 25]);
    }

    #[test]
    fn test_evicts_oldest_sample() {
        let mut window = SampleWindow::<4>::new();
        for sample in [10, 20, 30, 40] {
            window.push(sample);
        }
        assert_eq!(window.push(100), 47);
        assert_eq!(window.sum(), 190);
    }

    #[test]
    fn test_sum_tracks_buffer() {
        let mut window = SampleWindow::<8>::new();
        for sample in (0..100).map(|i| (i * 37) % 101 - 50) {
            window.push(sample);
            assert_eq!(window.sum(), window.samples.iter().map(|&s| i64::from(s)).sum());
        }
    }

    #[test]
    fn test_extreme_samples_do_not_overflow() {
        let mut window = SampleWindow::<4>::new();
        for _ in 0..4 {
            window.push(i32::MAX);
        }
        assert_eq!(window.average(), i32::MAX);

        for _ in 0..4 {
            window.push(i32::MIN);
        }
        assert_eq!(window.average(), i32::MIN);
    }

    #[test]
    fn test_negative_average_truncates_toward_zero() {
        let mut window = SampleWindow::<4>::new();
        assert_eq!(window.push(-10), -2);
    }

    #[test]
    fn test_default_capacity() {
        let window: SampleWindow = SampleWindow::default();
        assert_eq!(window.capacity(), SAMPLE_WINDOW);
        assert_eq!(window.average(), 0);
    }
}

//! Fixed-length sliding window over the inertial stream.

/// Oldest-first window of `size` values, shifted left by one on every push.
///
/// The window starts zero-filled. It becomes eligible for inference once
/// `size` values have been pushed and stays eligible from then on, so a
/// classifier runs once per push after the initial fill.
#[derive(Debug, Clone)]
pub struct StreamWindow {
    values: Vec<f32>,
    pushes: u64,
}

impl StreamWindow {
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![0.0; size],
            pushes: 0,
        }
    }

    /// Drop the oldest value and append `value` at the end.
    pub fn push(&mut self, value: f32) {
        let Some(last) = self.values.len().checked_sub(1) else {
            return;
        };
        self.values.copy_within(1.., 0);
        self.values[last] = value;
        self.pushes += 1;
    }

    /// True once at least `size` values have been pushed.
    pub fn is_full(&self) -> bool {
        self.pushes >= self.values.len() as u64
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Values pushed since creation.
    pub fn pushes(&self) -> u64 {
        self.pushes
    }
}

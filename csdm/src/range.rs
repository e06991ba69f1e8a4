use ndarray::Array1;

/// An evenly spaced sequence of `steps` values, `(first_index + k) * step + offset` for `k` in
/// `0..steps`.
///
/// Values are computed from their index rather than accumulated, so the `k`th value is exact to
/// within one rounding of the multiply and add.
///
#[derive(Debug, Clone, PartialEq)]
pub struct FloatRange {
    pub offset: f64,
    pub step: f64,
    pub steps: usize,
    pub first_index: i64,

    // Iteration state
    front: usize,
    back: usize,
}

impl FloatRange {
    pub fn new(offset: f64, step: f64, steps: usize, first_index: i64) -> Self {
        Self {
            offset,
            step,
            steps,
            first_index,
            front: 0,
            back: steps,
        }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        if index < self.steps {
            Some((self.first_index + index as i64) as f64 * self.step + self.offset)
        } else {
            None
        }
    }

    /// Values in `start..stop`, clamped to the length of the range
    pub fn slice(&self, start: usize, stop: usize) -> Array1<f64> {
        let stop = stop.min(self.steps);
        let start = start.min(stop);

        Array1::from_iter((start..stop).filter_map(|i| self.get(i)))
    }

    pub fn values(&self) -> Array1<f64> {
        self.slice(0, self.steps)
    }

    pub fn len(&self) -> usize {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }
}

impl Iterator for FloatRange {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let next = self.get(self.front);
            self.front += 1;

            next
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for FloatRange {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            self.back -= 1;
            self.get(self.back)
        } else {
            None
        }
    }
}

impl ExactSizeIterator for FloatRange {}

//! Fixed-size circular sample storage backing the rolling graphs.

/// `points` slots of `series` parallel values each.
///
/// Pushing overwrites the oldest slot in place, so a push costs one copy of
/// `series` values no matter how long the window is. Slots that have never
/// been written hold the `fill` value given at construction (for graphs that
/// is [`NO_DATA`](crate::types::NO_DATA)); the ring does not hide them,
/// consumers skip them.
#[derive(Debug, Clone)]
pub struct SampleRing<T> {
    data: Vec<T>,
    points: usize,
    series: usize,
    fill: T,
    newest: usize,
}

impl<T: Copy> SampleRing<T> {
    pub fn new(points: usize, series: usize, fill: T) -> Self {
        let points = points.max(1);
        Self {
            data: vec![fill; points * series],
            points,
            series,
            fill,
            // the first push lands on slot 0
            newest: points - 1,
        }
    }

    pub fn points(&self) -> usize {
        self.points
    }

    pub fn series(&self) -> usize {
        self.series
    }

    /// Evicts the oldest slot and stores `values` as the newest one.
    ///
    /// Missing trailing values are stored as the fill value; extra ones are
    /// ignored.
    pub fn push(&mut self, values: &[T]) {
        self.newest = (self.newest + 1) % self.points;
        let fill = self.fill;
        let slot = self.slot_mut(self.newest);
        for (i, dst) in slot.iter_mut().enumerate() {
            *dst = values.get(i).copied().unwrap_or(fill);
        }
    }

    /// Values recorded `age` pushes ago (`0` is the newest).
    pub fn slot(&self, age: usize) -> Option<&[T]> {
        if age >= self.points {
            return None;
        }
        let index = (self.newest + self.points - age) % self.points;
        let start = index * self.series;
        Some(&self.data[start..start + self.series])
    }

    pub fn get(&self, age: usize, series: usize) -> Option<T> {
        self.slot(age).and_then(|slot| slot.get(series).copied())
    }

    /// Walks all slots from newest to oldest, yielding `(values, age)`.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { ring: self, age: 0 }
    }

    /// Every slot, in storage order. Used for in-place rescaling where the
    /// order does not matter.
    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut [T]> {
        // chunks_mut panics on a zero chunk size
        let series = self.series.max(1);
        self.data.chunks_mut(series)
    }

    /// Forgets every sample.
    pub fn clear(&mut self) {
        let fill = self.fill;
        self.data.iter_mut().for_each(|v| *v = fill);
        self.newest = self.points - 1;
    }

    fn slot_mut(&mut self, index: usize) -> &mut [T] {
        let start = index * self.series;
        &mut self.data[start..start + self.series]
    }
}

/// Newest-to-oldest iterator over a [`SampleRing`].
#[derive(Debug, Clone)]
pub struct Iter<'a, T> {
    ring: &'a SampleRing<T>,
    age: usize,
}

impl<'a, T: Copy> Iterator for Iter<'a, T> {
    type Item = (&'a [T], usize);

    fn next(&mut self) -> Option<Self::Item> {
        let age = self.age;
        let slot = self.ring.slot(age)?;
        self.age += 1;
        Some((slot, age))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.ring.points.saturating_sub(self.age);
        (left, Some(left))
    }
}

impl<T: Copy> ExactSizeIterator for Iter<'_, T> {}

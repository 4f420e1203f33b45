/// Fixed resolution 1D hash table over a real valued key.
///
/// The table has `2 * half + 1` buckets of width `scale`; bucket `half` sits at
/// `center_key`. Votes are split over the two nearest buckets by linear interpolation.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram1D {
    data: Vec<f64>,
    scale: f64,
    offset: f64,
}

impl Histogram1D {
    pub fn new(scale: f64, half: usize, center_key: f64) -> Self {
        Histogram1D {
            data: vec![0.0; 2 * half + 1],
            scale,
            offset: center_key - half as f64 * scale,
        }
    }

    /// Table for log-scalings up to `max_scaling` (and down to its reciprocal).
    pub fn for_log_scaling(max_scaling: f64, bucket_size: f64) -> Self {
        Histogram1D::new(bucket_size, scaling_half_count(max_scaling, bucket_size), 0.0)
    }

    /// Table for the image of an RT boundary located at `boundary`.
    pub fn for_boundary(boundary: f64, max_shift: f64, max_scaling: f64, bucket_size: f64) -> Self {
        Histogram1D::new(
            bucket_size,
            shift_half_count(max_shift, max_scaling, bucket_size),
            boundary,
        )
    }

    #[inline]
    pub fn key_to_index(&self, key: f64) -> f64 {
        (key - self.offset) / self.scale
    }

    #[inline]
    pub fn index_to_key(&self, index: f64) -> f64 {
        self.offset + index * self.scale
    }

    /// Add `weight` at `key`, split between the two neighbouring buckets.
    ///
    /// Shares that fall outside the table are dropped; keys between the first and last
    /// bucket keep their full weight.
    pub fn add_value(&mut self, key: f64, weight: f64) {
        let pos = self.key_to_index(key);
        if !pos.is_finite() {
            return;
        }

        let left = pos.floor();
        let frac = pos - left;
        let len = self.data.len() as f64;

        if left >= 0.0 && left < len {
            self.data[left as usize] += weight * (1.0 - frac);
        }
        let right = left + 1.0;
        if frac > 0.0 && right >= 0.0 && right < len {
            self.data[right as usize] += weight * frac;
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.data[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: f64) {
        self.data[index] = value;
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Swap in a filtered copy of the buckets, which must have the same length.
    pub fn replace_data(&mut self, data: Vec<f64>) {
        debug_assert_eq!(data.len(), self.data.len());
        self.data = data;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Key range covered by the bucket centres.
    pub fn key_range(&self) -> (f64, f64) {
        (
            self.index_to_key(0.0),
            self.index_to_key((self.data.len() - 1) as f64),
        )
    }
}

/// Half bucket count of the log-scaling table (generous over-estimate).
pub fn scaling_half_count(max_scaling: f64, bucket_size: f64) -> usize {
    (max_scaling.ln() / bucket_size).ceil() as usize + 1
}

/// Half bucket count of a boundary image table (generous over-estimate).
pub fn shift_half_count(max_shift: f64, max_scaling: f64, bucket_size: f64) -> usize {
    4 + 2 * (max_shift * max_scaling / bucket_size).ceil() as usize
}

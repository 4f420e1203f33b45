use std::collections::VecDeque;

/// Running extremum over the window `[i - half, i + half]`, clamped to the data.
///
/// `replaces(new, old)` decides whether `new` makes `old` obsolete as a window extremum.
fn sliding_extremum(data: &[f64], half: usize, replaces: impl Fn(f64, f64) -> bool) -> Vec<f64> {
    let n = data.len();
    let mut out = Vec::with_capacity(n);
    let mut candidates: VecDeque<usize> = VecDeque::with_capacity(2 * half + 1);
    let mut next = 0;

    for i in 0..n {
        let hi = (i + half).min(n - 1);
        while next <= hi {
            while let Some(&back) = candidates.back() {
                if replaces(data[next], data[back]) {
                    candidates.pop_back();
                } else {
                    break;
                }
            }
            candidates.push_back(next);
            next += 1;
        }

        let lo = i.saturating_sub(half);
        while let Some(&front) = candidates.front() {
            if front < lo {
                candidates.pop_front();
            } else {
                break;
            }
        }

        // the window always holds `i`, so at least one candidate is left
        out.push(data[candidates[0]]);
    }

    out
}

/// Grey-level erosion with a flat structuring element of `length` data points.
pub fn erosion(data: &[f64], length: usize) -> Vec<f64> {
    sliding_extremum(data, length / 2, |new, old| new <= old)
}

/// Grey-level dilation with a flat structuring element of `length` data points.
pub fn dilation(data: &[f64], length: usize) -> Vec<f64> {
    sliding_extremum(data, length / 2, |new, old| new >= old)
}

/// Morphological opening (erosion followed by dilation).
pub fn opening(data: &[f64], length: usize) -> Vec<f64> {
    dilation(&erosion(data, length), length)
}

/// Tophat filter: the signal minus its opening.
///
/// Removes a slowly varying baseline and keeps features narrower than the structuring
/// element.
///
/// # Arguments
/// * `data` - equally spaced signal (e.g. histogram buckets)
/// * `length` - structuring element length in data points
///
/// # Returns
/// Filtered signal of the same length, every value `>= 0`
pub fn tophat(data: &[f64], length: usize) -> Vec<f64> {
    let opened = opening(data, length);
    data.iter()
        .zip(opened.iter())
        .map(|(&x, &o)| (x - o).max(0.0))
        .collect()
}

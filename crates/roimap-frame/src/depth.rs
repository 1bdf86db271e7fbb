/// Row-major float32 depth samples; `≤ 0` or non-finite means "no measurement".
#[derive(Clone, Debug, PartialEq)]
pub struct DepthMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

/// Mean and population standard deviation of a set of depth samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthStats {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl DepthStats {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std_dev: var.sqrt(),
            count: samples.len(),
        })
    }
}

#[inline]
fn is_valid(d: f32) -> bool {
    d.is_finite() && d > 0.0
}

impl DepthMap {
    /// `None` if `data.len() != width * height`.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        (width.checked_mul(height) == Some(data.len())).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Raw sample at `(x, y)`, `None` outside the map.
    pub fn raw(&self, x: i64, y: i64) -> Option<f32> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.data[y as usize * self.width + x as usize])
    }

    /// Valid measurement at `(x, y)`.
    pub fn get(&self, x: i64, y: i64) -> Option<f32> {
        self.raw(x, y).filter(|d| is_valid(*d))
    }

    /// Mean of valid samples in the square window of half-size `radius`
    /// around `(x, y)`, clipped to the map.
    pub fn neighborhood_mean(&self, x: i64, y: i64, radius: u32) -> Option<f64> {
        let r = radius as i64;
        let mut sum = 0.0;
        let mut count = 0usize;
        for yy in (y - r)..=(y + r) {
            for xx in (x - r)..=(x + r) {
                if let Some(d) = self.get(xx, yy) {
                    sum += d as f64;
                    count += 1;
                }
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Exact sample when valid, otherwise the neighbourhood mean.
    ///
    /// The second tuple field is `true` when the fallback was used.
    pub fn sample_or_neighborhood(&self, x: i64, y: i64, radius: u32) -> Option<(f64, bool)> {
        if let Some(d) = self.get(x, y) {
            return Some((d as f64, false));
        }
        self.neighborhood_mean(x, y, radius).map(|d| (d, true))
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|d| is_valid(**d)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> DepthMap {
        let data = (0..25).map(|i| i as f32).collect();
        DepthMap::new(5, 5, data).expect("sized")
    }

    #[test]
    fn zero_nan_and_negative_are_invalid() {
        let m = DepthMap::new(3, 1, vec![0.0, f32::NAN, -3.0]).unwrap();
        assert_eq!(m.valid_count(), 0);
        assert_eq!(m.get(0, 0), None);
        assert_eq!(m.raw(0, 0), Some(0.0));
        assert_eq!(m.get(5, 0), None);
    }

    #[test]
    fn neighborhood_skips_invalid_and_clips_to_bounds() {
        let m = ramp();
        // pixel (0,0) is 0.0 (invalid); window radius 1 keeps 1, 5, 6
        let mean = m.neighborhood_mean(0, 0, 1).expect("some valid");
        assert!((mean - 4.0).abs() < 1e-12);
        let (d, fallback) = m.sample_or_neighborhood(0, 0, 1).unwrap();
        assert!(fallback);
        assert!((d - 4.0).abs() < 1e-12);
        let (d, fallback) = m.sample_or_neighborhood(2, 2, 1).unwrap();
        assert!(!fallback);
        assert_eq!(d, 12.0);
    }

    #[test]
    fn empty_neighborhood_is_none() {
        let m = DepthMap::filled(4, 4, 0.0);
        assert!(m.neighborhood_mean(1, 1, 5).is_none());
    }

    #[test]
    fn stats_report_mean_and_spread() {
        let s = DepthStats::from_samples(&[990.0, 1010.0]).unwrap();
        assert_eq!(s.mean, 1000.0);
        assert_eq!(s.std_dev, 10.0);
        assert!(DepthStats::from_samples(&[]).is_none());
    }
}

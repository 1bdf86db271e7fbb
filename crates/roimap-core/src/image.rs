/// Borrowed 8-bit grayscale image, row-major with `len = width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned 8-bit grayscale image.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Wrap a buffer; `None` if its length does not match the dimensions.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

impl GrayImageView<'_> {
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// Pixel value with coordinates clamped to the image border.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> u8 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let x = x.clamp(0, self.width as i64 - 1);
        let y = y.clamp(0, self.height as i64 - 1);
        self.data[y as usize * self.width + x as usize]
    }
}

/// Bilinear sample with replicated borders.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f64, y: f64) -> f64 {
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.get_clamped(x0, y0) as f64;
    let p10 = src.get_clamped(x0 + 1, y0) as f64;
    let p01 = src.get_clamped(x0, y0 + 1) as f64;
    let p11 = src.get_clamped(x0 + 1, y0 + 1) as f64;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = GrayImage::from_raw(2, 2, vec![0, 100, 100, 200]).expect("sized");
        let v = img.view();
        assert_eq!(sample_bilinear(&v, 0.0, 0.0), 0.0);
        assert!((sample_bilinear(&v, 0.5, 0.5) - 100.0).abs() < 1e-12);
        assert_eq!(sample_bilinear(&v, 5.0, 5.0), 200.0);
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(GrayImage::from_raw(3, 2, vec![0; 5]).is_none());
        assert!(GrayImage::from_raw(3, 2, vec![0; 6]).is_some());
    }
}

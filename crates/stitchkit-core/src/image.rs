//! Planar floating-point image buffer.
//!
//! Pixels are stored channel-major, then row-major:
//! `data[c * width * height + y * width + x]`. Intensities are nominally in
//! `[0, 1]`. Reads through [`Image::get`] clamp coordinates to the border;
//! writes through [`Image::set`] outside the image are dropped.

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl Image {
    /// Zero-filled image.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self::filled(width, height, channels, 0.0)
    }

    pub fn filled(width: usize, height: usize, channels: usize, value: f32) -> Self {
        assert!(channels > 0, "an image needs at least one channel");
        Self {
            width,
            height,
            channels,
            data: vec![value; width * height * channels],
        }
    }

    /// Wrap an existing planar buffer. Returns `None` if the length does not
    /// match `width * height * channels`.
    pub fn from_planar(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Option<Self> {
        let expected = width.checked_mul(height)?.checked_mul(channels)?;
        if channels == 0 || data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// True when the image has no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize, c: usize) -> usize {
        c * self.width * self.height + y * self.width + x
    }

    /// Whether `(x, y)` addresses a pixel inside the image.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Clamp-to-border read.
    #[inline]
    pub fn get(&self, x: i64, y: i64, c: usize) -> f32 {
        assert!(
            c < self.channels,
            "channel {c} out of range for a {}-channel image",
            self.channels
        );
        if self.is_empty() {
            return 0.0;
        }
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[self.offset(x, y, c)]
    }

    /// Direct in-bounds read. Panics when out of range.
    #[inline]
    pub fn at(&self, x: usize, y: usize, c: usize) -> f32 {
        self.data[self.offset(x, y, c)]
    }

    /// Write that ignores coordinates outside the image.
    #[inline]
    pub fn set(&mut self, x: i64, y: i64, c: usize, value: f32) {
        if c >= self.channels || !self.contains(x, y) {
            return;
        }
        let idx = self.offset(x as usize, y as usize, c);
        self.data[idx] = value;
    }

    /// Unchecked (no clamping) mutable access; panics when out of range.
    #[inline]
    pub fn pixel_mut(&mut self, x: usize, y: usize, c: usize) -> &mut f32 {
        let idx = self.offset(x, y, c);
        &mut self.data[idx]
    }

    /// The whole plane of channel `c`.
    pub fn plane(&self, c: usize) -> &[f32] {
        let n = self.width * self.height;
        &self.data[c * n..(c + 1) * n]
    }

    /// Copy of a single channel as a 1-channel image.
    pub fn channel(&self, c: usize) -> Image {
        assert!(c < self.channels, "channel {c} out of range");
        Image {
            width: self.width,
            height: self.height,
            channels: 1,
            data: self.plane(c).to_vec(),
        }
    }

    /// Overwrite channel `c` with a 1-channel image of the same size.
    pub fn set_channel(&mut self, c: usize, src: &Image) {
        assert!(c < self.channels, "channel {c} out of range");
        assert!(
            src.channels == 1 && src.width == self.width && src.height == self.height,
            "set_channel expects a 1-channel {}x{} image",
            self.width,
            self.height
        );
        let n = self.width * self.height;
        self.data[c * n..(c + 1) * n].copy_from_slice(&src.data);
    }

    /// True when every channel at `(x, y)` is exactly zero.
    pub fn is_empty_pixel(&self, x: usize, y: usize) -> bool {
        (0..self.channels).all(|c| self.at(x, y, c) == 0.0)
    }

    /// Sum over channels at an in-bounds pixel.
    pub fn channel_sum(&self, x: usize, y: usize) -> f32 {
        (0..self.channels).map(|c| self.at(x, y, c)).sum()
    }

    /// Luma conversion with Rec. 601 weights. A 1-channel image is returned
    /// as a copy; extra channels past the third (e.g. alpha) are ignored.
    pub fn to_grayscale(&self) -> Image {
        if self.channels == 1 {
            return self.clone();
        }
        assert!(
            self.channels >= 3,
            "grayscale conversion needs 1 or at least 3 channels, got {}",
            self.channels
        );
        let (r, g, b) = (self.plane(0), self.plane(1), self.plane(2));
        let data = r
            .iter()
            .zip(g)
            .zip(b)
            .map(|((&r, &g), &b)| 0.299 * r + 0.587 * g + 0.114 * b)
            .collect();
        Image {
            width: self.width,
            height: self.height,
            channels: 1,
            data,
        }
    }

    /// Nearest-neighbour sample in pixel-index coordinates (pixel `i` covers
    /// `[i - 0.5, i + 0.5)`), clamped to the border.
    #[inline]
    pub fn sample_nearest(&self, x: f32, y: f32, c: usize) -> f32 {
        self.get(x.round() as i64, y.round() as i64, c)
    }

    /// Bilinear sample in pixel-index coordinates, clamped to the border.
    #[inline]
    pub fn sample_bilinear(&self, x: f32, y: f32, c: usize) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let p00 = self.get(x0, y0, c);
        let p10 = self.get(x0 + 1, y0, c);
        let p01 = self.get(x0, y0 + 1, c);
        let p11 = self.get(x0 + 1, y0 + 1, c);

        let a = p00 + fx * (p10 - p00);
        let b = p01 + fx * (p11 - p01);
        a + fy * (b - a)
    }

    pub fn resize_nearest(&self, width: usize, height: usize) -> Image {
        self.resize_with(width, height, Image::sample_nearest)
    }

    pub fn resize_bilinear(&self, width: usize, height: usize) -> Image {
        self.resize_with(width, height, Image::sample_bilinear)
    }

    fn resize_with(
        &self,
        width: usize,
        height: usize,
        sample: fn(&Image, f32, f32, usize) -> f32,
    ) -> Image {
        let mut out = Image::new(width, height, self.channels);
        if width == 0 || height == 0 || self.is_empty() {
            return out;
        }
        // Pixel centres of the output map onto pixel centres of the input.
        let sx = self.width as f32 / width as f32;
        let sy = self.height as f32 / height as f32;
        for c in 0..self.channels {
            for y in 0..height {
                let src_y = sy * (y as f32 + 0.5) - 0.5;
                for x in 0..width {
                    let src_x = sx * (x as f32 + 0.5) - 0.5;
                    *out.pixel_mut(x, y, c) = sample(self, src_x, src_y, c);
                }
            }
        }
        out
    }
}

// RGBA pixel buffers produced by the host renderer, plus the post-capture
// resize and PNG encoding steps.

/// Row-major RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A buffer filled with one color
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Downscale so neither side exceeds `max_dim`, keeping the aspect ratio.
    /// Images already within bounds are returned unchanged.
    pub fn resize_to_fit(&self, max_dim: u32) -> PixelBuffer {
        let max_dim = max_dim.max(1);
        if self.width <= max_dim && self.height <= max_dim {
            return self.clone();
        }

        let (width, height) = if self.width >= self.height {
            let h = (self.height as u64 * max_dim as u64 / self.width as u64).max(1) as u32;
            (max_dim, h)
        } else {
            let w = (self.width as u64 * max_dim as u64 / self.height as u64).max(1) as u32;
            (w, max_dim)
        };

        // Box filter: average every source pixel that falls inside the target pixel
        let mut out = PixelBuffer::filled(width, height, [0, 0, 0, 0]);
        for ty in 0..height {
            let y0 = (ty as u64 * self.height as u64 / height as u64) as u32;
            let y1 = (((ty + 1) as u64 * self.height as u64 / height as u64) as u32).max(y0 + 1);
            for tx in 0..width {
                let x0 = (tx as u64 * self.width as u64 / width as u64) as u32;
                let x1 = (((tx + 1) as u64 * self.width as u64 / width as u64) as u32).max(x0 + 1);

                let mut sum = [0u64; 4];
                let mut count = 0u64;
                for sy in y0..y1.min(self.height) {
                    for sx in x0..x1.min(self.width) {
                        let p = self.pixel(sx, sy);
                        for c in 0..4 {
                            sum[c] += p[c] as u64;
                        }
                        count += 1;
                    }
                }
                let count = count.max(1);
                out.set_pixel(
                    tx,
                    ty,
                    [
                        (sum[0] / count) as u8,
                        (sum[1] / count) as u8,
                        (sum[2] / count) as u8,
                        (sum[3] / count) as u8,
                    ],
                );
            }
        }
        out
    }

    /// Encode as an 8-bit RGBA PNG
    pub fn encode_png(&self) -> Result<Vec<u8>, png::EncodingError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.data)?;
            writer.finish()?;
        }
        Ok(out)
    }
}

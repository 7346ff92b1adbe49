use super::pixel::Pixel;

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Pixel>, // starting at top left pixel of the image, pos = y * width + x
}

impl Image {

    pub fn new(width: usize, height: usize) -> Self {
        Image {
            width,
            height,
            pixels: vec![Pixel::black(); width * height],
        }
    }

    /// Builds an image from a raw capture buffer, 3 bytes per pixel, row-major.
    /// Returns None if the buffer does not match the expected dimensions.
    pub fn from_rgb24(data: &[u8], width: usize, height: usize) -> Option<Self> {
        if data.len() != width * height * 3 {
            return None;
        }

        let pixels = data.chunks_exact(3)
            .map(|rgb| Pixel::from_rgb(rgb[0], rgb[1], rgb[2]))
            .collect();

        Some(Image {
            width,
            height,
            pixels,
        })
    }

    pub fn test_image() -> Self {
        let mut image = Self::new(4, 4);

        let sky = Pixel::from_rgb(96, 170, 255);
        let sun = Pixel::from_rgb(250, 200, 30);
        let ground = Pixel::from_rgb(40, 120, 40);

        image.fill(sky);
        image.set_pixel(2, 0, sun);
        image.set_pixel(3, 0, sun);
        for x in 0..4 {
            image.set_pixel(x, 3, ground);
        }

        image
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, pixel: Pixel) {
        self.pixels[y * self.width + x] = pixel;
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Pixel {
        self.pixels[y * self.width + x]
    }

    pub fn fill(&mut self, color: Pixel) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.set_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb24() {
        let data = vec![
            1, 2, 3, 4, 5, 6,
            7, 8, 9, 10, 11, 12,
        ];

        let image = Image::from_rgb24(&data, 2, 2).expect("expected a valid 2x2 frame");

        assert_eq!(image.get_pixel(0, 0), Pixel::from_rgb(1, 2, 3));
        assert_eq!(image.get_pixel(1, 0), Pixel::from_rgb(4, 5, 6));
        assert_eq!(image.get_pixel(0, 1), Pixel::from_rgb(7, 8, 9));
        assert_eq!(image.get_pixel(1, 1), Pixel::from_rgb(10, 11, 12));
    }

    #[test]
    fn test_from_rgb24_rejects_short_buffer() {
        let data = vec![0; 11];

        assert!(Image::from_rgb24(&data, 2, 2).is_none());
    }
}

use timelapse_core::models::Pixel;

pub const MAX_COLORS: usize = 256;

/// Global color table for one encoding session. Always holds exactly
/// `MAX_COLORS` entries; entries past `used` are black filler.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {

    pub colors: Vec<Pixel>,
    pub used: usize,
}

impl Palette {

    pub fn from_colors(mut colors: Vec<Pixel>) -> Self {
        colors.truncate(MAX_COLORS);
        let used = colors.len();
        colors.resize(MAX_COLORS, Pixel::black());

        Palette {
            colors,
            used,
        }
    }

    /// Bits per pixel needed to index every used entry, clamped to the
    /// [2, 8] range the GIF descriptor can express.
    pub fn color_depth(&self) -> u8 {
        let mut depth = 2;
        while (1usize << depth) < self.used && depth < 8 {
            depth += 1;
        }

        depth
    }

    /// Serializes the first `2^depth` entries as global color table bytes.
    pub fn table_bytes(&self, depth: u8) -> Vec<u8> {
        let entries = 1usize << depth;
        let mut data = Vec::with_capacity(entries * 3);

        for color in &self.colors[..entries] {
            data.push(color.red);
            data.push(color.green);
            data.push(color.blue);
        }

        data
    }
}

/// One frame with pixels replaced by palette indices, one byte per pixel,
/// same order and dimensions as the source image.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedImage {

    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>, // pos = y * width + x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_zero_filled() {
        let palette = Palette::from_colors(vec![Pixel::white(), Pixel::from_rgb(10, 20, 30)]);

        assert_eq!(palette.colors.len(), MAX_COLORS);
        assert_eq!(palette.used, 2);
        assert_eq!(palette.colors[1], Pixel::from_rgb(10, 20, 30));
        assert_eq!(palette.colors[2], Pixel::black());
        assert_eq!(palette.colors[255], Pixel::black());
    }

    #[test]
    fn test_color_depth_is_clamped() {
        assert_eq!(Palette::from_colors(vec![Pixel::black(); 2]).color_depth(), 2);
        assert_eq!(Palette::from_colors(vec![Pixel::black(); 4]).color_depth(), 2);
        assert_eq!(Palette::from_colors(vec![Pixel::black(); 5]).color_depth(), 3);
        assert_eq!(Palette::from_colors(vec![Pixel::black(); 17]).color_depth(), 5);
        assert_eq!(Palette::from_colors(vec![Pixel::black(); 256]).color_depth(), 8);
    }

    #[test]
    fn test_table_bytes_length_follows_depth() {
        let palette = Palette::from_colors(vec![Pixel::from_rgb(1, 2, 3); 4]);

        assert_eq!(palette.table_bytes(2), vec![1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 2, 3]);
        assert_eq!(palette.table_bytes(8).len(), 256 * 3);
    }
}

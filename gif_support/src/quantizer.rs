use custom_error::custom_error;

use timelapse_core::models::{Image, Pixel};

use crate::common::{IndexedImage, Palette, MAX_COLORS};

// see https://en.wikipedia.org/wiki/Median_cut

custom_error! {pub QuantizeError
    InvalidInput {description: String} = "Invalid input: {description}",
    AllocationFailed {description: String} = "Failed to allocate quantizer buffers: {description}",
}

// Comparison order matters for ties: red wins over green, green over blue.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Channel {
    Red,
    Green,
    Blue,
}

fn channel_value(pixel: Pixel, channel: Channel) -> u8 {
    match channel {
        Channel::Red => pixel.red,
        Channel::Green => pixel.green,
        Channel::Blue => pixel.blue,
    }
}

/// A partition of the flattened color population, tracked as a range of the
/// index permutation plus per-channel bounds over its members.
struct ColorBox {
    start: usize,
    count: usize,
    min: [u8; 3],
    max: [u8; 3],
}

const CHANNELS: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

impl ColorBox {

    fn new(start: usize, count: usize, population: &[Pixel], permutation: &[usize]) -> Self {
        let mut color_box = ColorBox {
            start,
            count,
            min: [0; 3],
            max: [0; 3],
        };
        color_box.recompute_bounds(population, permutation);

        color_box
    }

    // Bounds must be refreshed every time the member range changes.
    fn recompute_bounds(&mut self, population: &[Pixel], permutation: &[usize]) {
        let mut min = [255u8; 3];
        let mut max = [0u8; 3];

        for &index in &permutation[self.start..self.start + self.count] {
            let pixel = population[index];
            for (slot, &channel) in CHANNELS.iter().enumerate() {
                let value = channel_value(pixel, channel);
                min[slot] = min[slot].min(value);
                max[slot] = max[slot].max(value);
            }
        }

        self.min = min;
        self.max = max;
    }

    fn range(&self, slot: usize) -> u8 {
        self.max[slot] - self.min[slot]
    }

    fn widest_range(&self) -> u8 {
        (0..3).map(|slot| self.range(slot)).max().unwrap_or(0)
    }

    fn longest_axis(&self) -> Channel {
        if self.range(0) >= self.range(1) && self.range(0) >= self.range(2) {
            Channel::Red
        } else if self.range(1) >= self.range(2) {
            Channel::Green
        } else {
            Channel::Blue
        }
    }
}

/// Builds a global palette over all frames with median cut and maps every
/// pixel to its palette index. All frames must share the same nonzero
/// dimensions. The result is deterministic for a given input.
pub fn quantize(frames: &[Image], max_colors: usize) -> Result<(Palette, Vec<IndexedImage>), QuantizeError> {
    let (width, height) = validate_frames(frames)?;
    let max_colors = max_colors.max(1).min(MAX_COLORS);

    let frame_pixels = width * height;
    let total = frame_pixels * frames.len();

    // The population is the single large allocation of a session, so its
    // failure is reported instead of aborting.
    let mut population: Vec<Pixel> = Vec::new();
    population.try_reserve_exact(total).map_err(|err| QuantizeError::AllocationFailed {
        description: format!("color population of {} pixels: {}", total, err),
    })?;
    for frame in frames {
        population.extend_from_slice(&frame.pixels);
    }

    // The population itself is never reordered; only this permutation is,
    // so every entry keeps its (frame, pixel) provenance.
    let mut permutation: Vec<usize> = Vec::new();
    permutation.try_reserve_exact(total).map_err(|err| QuantizeError::AllocationFailed {
        description: format!("index permutation of {} entries: {}", total, err),
    })?;
    permutation.extend(0..total);

    let mut boxes = vec![ColorBox::new(0, total, &population, &permutation)];

    while boxes.len() < max_colors {
        let chosen = match select_box_to_split(&boxes) {
            Some(v) => v,
            None => break,
        };

        let axis = boxes[chosen].longest_axis();
        let start = boxes[chosen].start;
        let count = boxes[chosen].count;
        let half = count / 2;

        // Selection, not a sort: everything left of the midpoint compares
        // <= everything right of it on the chosen axis.
        permutation[start..start + count]
            .select_nth_unstable_by_key(half, |&index| channel_value(population[index], axis));

        boxes[chosen] = ColorBox::new(start, half, &population, &permutation);
        boxes.push(ColorBox::new(start + half, count - half, &population, &permutation));
    }

    debug!("median cut produced {} boxes over {} pixels in {} frames", boxes.len(), total, frames.len());

    let palette = palette_from_boxes(&boxes, &population, &permutation);

    let mut indices = vec![0u8; total];
    for (box_index, color_box) in boxes.iter().enumerate() {
        for &entry in &permutation[color_box.start..color_box.start + color_box.count] {
            indices[entry] = box_index as u8;
        }
    }

    let indexed = indices.chunks_exact(frame_pixels)
        .map(|chunk| IndexedImage {
            width,
            height,
            pixels: chunk.to_vec(),
        })
        .collect();

    Ok((palette, indexed))
}

fn validate_frames(frames: &[Image]) -> Result<(usize, usize), QuantizeError> {
    let first = frames.first().ok_or_else(|| QuantizeError::InvalidInput {
        description: "no frames to quantize".to_string(),
    })?;

    if first.width == 0 || first.height == 0 {
        return Err(QuantizeError::InvalidInput {
            description: format!("frame dimensions are {}x{}", first.width, first.height),
        });
    }

    for (index, frame) in frames.iter().enumerate() {
        if frame.width != first.width || frame.height != first.height {
            return Err(QuantizeError::InvalidInput {
                description: format!(
                    "frame {} is {}x{}, expected {}x{}",
                    index, frame.width, frame.height, first.width, first.height
                ),
            });
        }
    }

    Ok((first.width, first.height))
}

// First box encountered with the maximum range wins; boxes with one member
// or a zero-width range are never split, so an all-one-color population
// stays a single box.
fn select_box_to_split(boxes: &[ColorBox]) -> Option<usize> {
    let mut chosen = None;
    let mut widest = 0u8;

    for (index, color_box) in boxes.iter().enumerate() {
        if color_box.count < 2 {
            continue;
        }

        let range = color_box.widest_range();
        if range > widest {
            widest = range;
            chosen = Some(index);
        }
    }

    chosen
}

fn palette_from_boxes(boxes: &[ColorBox], population: &[Pixel], permutation: &[usize]) -> Palette {
    let colors = boxes.iter()
        .map(|color_box| {
            let mut sums = [0u64; 3];
            for &index in &permutation[color_box.start..color_box.start + color_box.count] {
                let pixel = population[index];
                sums[0] += pixel.red as u64;
                sums[1] += pixel.green as u64;
                sums[2] += pixel.blue as u64;
            }

            let count = color_box.count as u64;
            Pixel::from_rgb(
                (sums[0] / count) as u8,
                (sums[1] / count) as u8,
                (sums[2] / count) as u8,
            )
        })
        .collect();

    Palette::from_colors(colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: usize, height: usize, color: Pixel) -> Image {
        let mut image = Image::new(width, height);
        image.fill(color);
        image
    }

    #[test]
    fn test_palette_shape_and_frame_dimensions() {
        let frames = vec![Image::test_image(), Image::test_image()];

        let (palette, indexed) = quantize(&frames, 256).expect("failed to quantize");

        assert_eq!(palette.colors.len(), MAX_COLORS);
        assert_eq!(indexed.len(), frames.len());
        for frame in &indexed {
            assert_eq!(frame.width, 4);
            assert_eq!(frame.height, 4);
            assert_eq!(frame.pixels.len(), 16);
        }
    }

    #[test]
    fn test_every_index_is_valid() {
        let (palette, indexed) = quantize(&[Image::test_image()], 256)
            .expect("failed to quantize");

        for frame in &indexed {
            for &index in &frame.pixels {
                assert!((index as usize) < palette.used);
            }
        }
    }

    #[test]
    fn test_single_color_collapses_to_one_entry() {
        let color = Pixel::from_rgb(17, 130, 201);
        let frames = vec![solid_frame(3, 2, color), solid_frame(3, 2, color)];

        let (palette, indexed) = quantize(&frames, 256).expect("failed to quantize");

        assert_eq!(palette.used, 1);
        assert_eq!(palette.colors[0], color);
        assert_eq!(palette.colors[1], Pixel::black());
        for frame in &indexed {
            assert!(frame.pixels.iter().all(|&index| index == 0));
        }
    }

    #[test]
    fn test_two_colors_split_into_exact_entries() {
        let red = Pixel::from_rgb(200, 0, 0);
        let blue = Pixel::from_rgb(0, 0, 200);

        let mut image = Image::new(2, 2);
        image.set_pixel(0, 0, red);
        image.set_pixel(1, 0, red);
        image.set_pixel(0, 1, blue);
        image.set_pixel(1, 1, blue);

        let (palette, indexed) = quantize(&[image.clone()], 256).expect("failed to quantize");

        assert_eq!(palette.used, 2);
        assert!(palette.colors[..2].contains(&red));
        assert!(palette.colors[..2].contains(&blue));

        // each pixel must map back to its exact color
        for (pos, &index) in indexed[0].pixels.iter().enumerate() {
            assert_eq!(palette.colors[index as usize], image.pixels[pos]);
        }
    }

    #[test]
    fn test_few_distinct_colors_are_preserved_exactly() {
        // with fewer distinct colors than palette slots every box ends up
        // uniform, so quantization loses nothing
        let frames = vec![Image::test_image()];

        let (palette, indexed) = quantize(&frames, 256).expect("failed to quantize");

        assert!(palette.used >= 3);
        for (pos, &index) in indexed[0].pixels.iter().enumerate() {
            assert_eq!(palette.colors[index as usize], frames[0].pixels[pos]);
        }
    }

    #[test]
    fn test_max_colors_caps_box_count() {
        let mut image = Image::new(4, 1);
        image.set_pixel(0, 0, Pixel::from_rgb(10, 0, 0));
        image.set_pixel(1, 0, Pixel::from_rgb(80, 0, 0));
        image.set_pixel(2, 0, Pixel::from_rgb(160, 0, 0));
        image.set_pixel(3, 0, Pixel::from_rgb(250, 0, 0));

        let (palette, _) = quantize(&[image], 2).expect("failed to quantize");

        assert_eq!(palette.used, 2);
        // midpoint split: two darkest reds average against two brightest
        assert_eq!(palette.colors[0], Pixel::from_rgb(45, 0, 0));
        assert_eq!(palette.colors[1], Pixel::from_rgb(205, 0, 0));
    }

    #[test]
    fn test_population_is_covered_exactly_once() {
        let frames = vec![Image::test_image(), Image::test_image()];

        let (_, indexed) = quantize(&frames, 256).expect("failed to quantize");

        let assigned: usize = indexed.iter().map(|frame| frame.pixels.len()).sum();
        assert_eq!(assigned, 4 * 4 * 2);
    }

    #[test]
    fn test_quantize_is_deterministic() {
        let frames = vec![Image::test_image(), Image::test_image()];

        let first = quantize(&frames, 16).expect("failed to quantize");
        let second = quantize(&frames, 16).expect("failed to quantize");

        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(quantize(&[], 256).is_err());
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(quantize(&[Image::new(0, 4)], 256).is_err());
    }

    #[test]
    fn test_rejects_mismatched_dimensions() {
        let frames = vec![Image::new(4, 4), Image::new(4, 3)];

        assert!(quantize(&frames, 256).is_err());
    }
}

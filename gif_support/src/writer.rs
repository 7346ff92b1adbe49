use std::cmp::min;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use bit_vec::BitVec;
use byteorder::{ByteOrder, LittleEndian};
use custom_error::custom_error;

use crate::common::Palette;

// see https://www.fileformat.info/format/gif/egff.htm

custom_error! {pub GIFWriteError
    FailedToOpen {description: String} = "Failed to open gif destination: {description}",
    FailedToWrite {description: String} = "Failed to write gif data: {description}",
    AllocationFailed {description: String} = "Failed to allocate frame buffers: {description}",
}

/// An open GIF89a encoding session. Created by `open` (which writes the
/// header and global color table immediately), fed one frame at a time
/// through the `frame_mut` scratch buffer and `add_frame`, and finished by
/// `close`, which consumes the stream so nothing can be appended afterwards.
pub struct GIFStream<W: Write> {
    sink: W,
    width: u16,
    height: u16,
    depth: u8,
    frame: Vec<u8>,
    back: Vec<u8>,
    frames_written: usize,
}

impl GIFStream<BufWriter<File>> {

    /// Opens `path` for truncating write and starts a session on it.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: u16,
        height: u16,
        palette: &Palette,
        depth: u8,
        background_index: u8,
        loop_count: Option<u16>,
    ) -> Result<Self, GIFWriteError> {
        let file = File::create(path.as_ref()).map_err(|err| GIFWriteError::FailedToOpen {
            description: format!("{}: {}", path.as_ref().display(), err),
        })?;

        GIFStream::open(BufWriter::new(file), width, height, palette, depth, background_index, loop_count)
    }
}

impl<W: Write> GIFStream<W> {

    /// Starts a session on an arbitrary sink: writes the header, the global
    /// color table (`2^depth` entries taken from the palette) and, when
    /// `loop_count` is set, the Netscape looping extension. A count of 0
    /// is passed through literally and means "loop forever".
    pub fn open(
        mut sink: W,
        width: u16,
        height: u16,
        palette: &Palette,
        depth: u8,
        background_index: u8,
        loop_count: Option<u16>,
    ) -> Result<Self, GIFWriteError> {
        let depth = depth.max(2).min(8);

        let total_pixels = width as usize * height as usize;
        let frame = allocate_scratch(total_pixels)?;
        let back = allocate_scratch(total_pixels)?;

        let mut header = vec![0u8; 13];
        header[0..6].copy_from_slice(b"GIF89a");
        LittleEndian::write_u16(&mut header[6..8], width);
        LittleEndian::write_u16(&mut header[8..10], height);

        let mut packed = (depth - 1) & 0b111; // size of global color table
        packed |= ((depth - 1) & 0b111) << 4; // color resolution
        packed |= 0b10000000; // use global color table
        header[10] = packed;
        header[11] = background_index;
        // header[12] is the pixel aspect ratio, zero means unspecified

        sink.write_all(&header).map_err(write_failed)?;
        sink.write_all(&palette.table_bytes(depth)).map_err(write_failed)?;

        if let Some(loops) = loop_count {
            let mut extension = vec![0x21, 0xFF, 0x0B];
            extension.extend_from_slice(b"NETSCAPE2.0");
            extension.push(0x03);
            extension.push(0x01);
            let mut count = [0u8; 2];
            LittleEndian::write_u16(&mut count, loops);
            extension.extend_from_slice(&count);
            extension.push(0x00);
            sink.write_all(&extension).map_err(write_failed)?;
        }

        debug!("opened {}x{} gif stream, depth {}", width, height, depth);

        Ok(GIFStream {
            sink,
            width,
            height,
            depth,
            frame,
            back,
            frames_written: 0,
        })
    }

    /// Scratch buffer for the next frame: one palette index per pixel,
    /// row-major, `width * height` bytes. Fill it before calling `add_frame`.
    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.frame
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Appends one self-contained image block for whatever is currently in
    /// the frame scratch buffer.
    pub fn add_frame(&mut self, delay_cs: u16) -> Result<(), GIFWriteError> {
        let mut control = vec![0u8; 8];
        control[0] = 0x21;
        control[1] = 0xF9;
        control[2] = 0x04;
        control[3] = 0x00; // no transparency, no disposal preference
        LittleEndian::write_u16(&mut control[4..6], delay_cs);
        control[6] = 0x00; // transparent color index, unused
        control[7] = 0x00;
        self.sink.write_all(&control).map_err(write_failed)?;

        let mut descriptor = vec![0u8; 10];
        descriptor[0] = 0x2C;
        // left and top stay zero, every frame covers the full canvas
        LittleEndian::write_u16(&mut descriptor[5..7], self.width);
        LittleEndian::write_u16(&mut descriptor[7..9], self.height);
        // descriptor[9]: no local color table, not interlaced
        self.sink.write_all(&descriptor).map_err(write_failed)?;

        self.sink.write_all(&[self.depth]).map_err(write_failed)?;

        let compressed = compress_frame(&self.frame, self.depth);

        let mut remaining: &[u8] = &compressed;
        while remaining.len() > 0 {
            let block_size = min(remaining.len(), 255);
            self.sink.write_all(&[block_size as u8]).map_err(write_failed)?;
            self.sink.write_all(&remaining[..block_size]).map_err(write_failed)?;
            remaining = &remaining[block_size..];
        }
        self.sink.write_all(&[0]).map_err(write_failed)?;

        self.frames_written += 1;
        // back now holds the frame just written, kept for frame differencing
        std::mem::swap(&mut self.frame, &mut self.back);

        Ok(())
    }

    /// Writes the trailer and hands the sink back. Consuming the stream is
    /// what makes "no frames after close" hold.
    pub fn close(mut self) -> Result<W, GIFWriteError> {
        self.sink.write_all(&[0x3B]).map_err(write_failed)?;
        self.sink.flush().map_err(write_failed)?;

        debug!("closed gif stream after {} frames", self.frames_written);

        Ok(self.sink)
    }
}

fn write_failed(err: io::Error) -> GIFWriteError {
    GIFWriteError::FailedToWrite {
        description: err.to_string(),
    }
}

fn allocate_scratch(total_pixels: usize) -> Result<Vec<u8>, GIFWriteError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(total_pixels).map_err(|err| GIFWriteError::AllocationFailed {
        description: format!("scratch buffer of {} bytes: {}", total_pixels, err),
    })?;
    buffer.resize(total_pixels, 0);

    Ok(buffer)
}

/// Compresses one frame of palette indices with the fixed-width LZW variant:
/// the code width never grows and no multi-symbol dictionary entries are
/// built, only literal indices plus Clear and Stop. A decoder still grows
/// its dictionary by one entry per literal, so a Clear is forced before its
/// next code-size boundary would be reached.
fn compress_frame(pixels: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear_code = 1u16 << min_code_size;
    let stop_code = clear_code + 1;
    let code_size = min_code_size + 1; // fixed for the whole frame

    let clear_interval = clear_interval(min_code_size);

    let mut bits = BitVec::new();
    append_bits(&mut bits, clear_code, code_size);

    let mut codes_since_clear = 0;
    for &index in pixels {
        append_bits(&mut bits, index as u16, code_size);

        codes_since_clear += 1;
        if codes_since_clear >= clear_interval {
            append_bits(&mut bits, clear_code, code_size);
            codes_since_clear = 0;
        }
    }

    append_bits(&mut bits, stop_code, code_size);

    // the final partial byte comes out zero-padded in its high bits
    bits.to_bytes().iter()
        .map(|v| mirror_bits(*v))
        .collect()
}

// A decoder's dictionary holds 2^depth + 2 entries after a Clear and gains
// one per literal that follows; it widens its code reads once the count hits
// 2^(depth + 1). The interval keeps every run strictly below that boundary,
// capped at the 240 the full 8-bit depth uses.
fn clear_interval(min_code_size: u8) -> usize {
    min(240, (1usize << min_code_size) - 2)
}

// pushes the low `code_size` bits of `code`, least significant first
fn append_bits(bits: &mut BitVec, code: u16, code_size: u8) {
    for i in 0..code_size {
        bits.push(((code >> i) & 0b1) == 1);
    }
}

// 0b10000000 -> 0b00000001
fn mirror_bits(v: u8) -> u8 {
    let mut v = v;
    let mut result = 0;

    for _ in 0..8 {
        result = (result << 1) | (v & 0b1);
        v = v >> 1;
    }

    result
}

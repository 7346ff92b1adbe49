#[macro_use]
extern crate log;

use std::env;
use std::path::Path;

use env_logger::Env;

use gif_support::quantizer::quantize;
use gif_support::writer::GIFStream;
use timelapse_core::models::{FrameSource, Image, Storage, UploadSink};

mod source;
mod storage;
mod upload;

use source::DirFrameSource;
use storage::DirStorage;
use upload::MultipartUploadSink;

const DEFAULT_LOGGING_LEVEL: &str = "info";
const DEFAULT_DELAY_CS: u16 = 50;
const DEFAULT_LOOP_COUNT: u16 = 0; // loop forever
const DEFAULT_MAX_COLORS: usize = 256;
const GIF_CONTENT_TYPE: &str = "image/gif";
const READ_CHUNK: usize = 64 * 1024;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_LOGGING_LEVEL)).init();
    let args: Vec<String> = env::args().collect();
    debug!("args are: {:?}", args);

    let required = ["frames-dir", "width", "height", "output"];
    if !required.iter().all(|name| argument_present(&args, name)) {
        error!("usage: timelapse --frames-dir=frames --width=320 --height=240 --output=out.gif [--delay-cs=50] [--loop-count=0] [--max-colors=256] [--upload-url=https://example.com/upload]");
        return;
    }

    let frames_dir = argument_value(&args, "frames-dir")
        .expect("expected frames dir to be present because checked that argument is present");
    let output = argument_value(&args, "output")
        .expect("expected output to be present because checked that argument is present");

    let width = match parse_argument::<usize>(&args, "width") {
        Some(v) if v > 0 => v,
        _ => {
            error!("--width must be a positive number");
            return;
        }
    };
    let height = match parse_argument::<usize>(&args, "height") {
        Some(v) if v > 0 => v,
        _ => {
            error!("--height must be a positive number");
            return;
        }
    };
    let delay_cs = parse_argument::<u16>(&args, "delay-cs").unwrap_or(DEFAULT_DELAY_CS);
    let loop_count = parse_argument::<u16>(&args, "loop-count").unwrap_or(DEFAULT_LOOP_COUNT);
    let max_colors = parse_argument::<usize>(&args, "max-colors").unwrap_or(DEFAULT_MAX_COLORS);

    let frames = match collect_frames(&frames_dir, width, height) {
        Some(v) => v,
        None => return,
    };

    if !encode_sequence(&frames, width, height, &output, delay_cs, loop_count, max_colors) {
        return;
    }

    if let Some(url) = argument_value(&args, "upload-url") {
        upload_result(&output, &url);
    }
}

fn collect_frames(frames_dir: &str, width: usize, height: usize) -> Option<Vec<Image>> {
    let mut source = match DirFrameSource::new(frames_dir, width, height) {
        Ok(v) => v,
        Err(err) => {
            error!("failed to open frame source: {}", err);
            return None;
        }
    };

    let mut frames = Vec::new();
    loop {
        match source.next_frame() {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => break,
            Err(err) => {
                error!("failed to capture frame: {}", err);
                return None;
            }
        }
    }

    if frames.is_empty() {
        error!("no frames found in {}", frames_dir);
        return None;
    }

    info!("captured {} frames of {}x{}", frames.len(), width, height);
    Some(frames)
}

fn encode_sequence(
    frames: &[Image],
    width: usize,
    height: usize,
    output: &str,
    delay_cs: u16,
    loop_count: u16,
    max_colors: usize,
) -> bool {
    let (palette, indexed) = match quantize(frames, max_colors) {
        Ok(v) => v,
        Err(err) => {
            error!("failed to quantize frames: {}", err);
            return false;
        }
    };
    info!("global palette ready, {} colors used", palette.used);

    let depth = palette.color_depth();
    let mut gif = match GIFStream::create(output, width as u16, height as u16, &palette, depth, 0, Some(loop_count)) {
        Ok(v) => v,
        Err(err) => {
            error!("failed to open {}: {}", output, err);
            return false;
        }
    };

    for frame in &indexed {
        gif.frame_mut().copy_from_slice(&frame.pixels);
        if let Err(err) = gif.add_frame(delay_cs) {
            error!("failed to encode frame: {}", err);
            return false;
        }
    }

    match gif.close() {
        Ok(_) => {
            info!("wrote {} frames to {}", indexed.len(), output);
            true
        }
        Err(err) => {
            error!("failed to finish {}: {}", output, err);
            false
        }
    }
}

fn upload_result(output: &str, url: &str) {
    let path = Path::new(output);
    let parent = path.parent()
        .filter(|v| !v.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = match path.file_name() {
        Some(v) => v.to_string_lossy().to_string(),
        None => {
            error!("{} has no file name to upload under", output);
            return;
        }
    };

    let storage = DirStorage::new(parent);
    let mut data = Vec::new();
    loop {
        let chunk = match storage.read_range(&name, data.len() as u64, READ_CHUNK) {
            Ok(v) => v,
            Err(err) => {
                error!("failed to read {} back: {}", output, err);
                return;
            }
        };
        let done = chunk.len() < READ_CHUNK;
        data.extend_from_slice(&chunk);
        if done {
            break;
        }
    }

    info!("uploading {} ({} bytes) to {}", name, data.len(), url);
    let sink = MultipartUploadSink::new(url);
    match sink.upload(&name, GIF_CONTENT_TYPE, &data) {
        Ok(_) => info!("upload finished"),
        Err(err) => error!("failed to upload {}: {}", name, err),
    }
}

fn argument_value(args: &[String], argument_name: &str) -> Option<String> {
    args.iter()
        .find(|s| s.starts_with(&format!("--{}=", argument_name)))
        .map(|s| s[s.find('=').expect("expected equals sign to be present because checked for that in filter") + 1..].to_string())
}

fn argument_present(args: &[String], argument_name: &str) -> bool {
    args.iter().any(|s| s.starts_with(&format!("--{}=", argument_name)))
}

fn parse_argument<T: std::str::FromStr>(args: &[String], argument_name: &str) -> Option<T> {
    argument_value(args, argument_name).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_parsing() {
        let args: Vec<String> = vec!["timelapse", "--width=320", "--frames-dir=shots"]
            .into_iter()
            .map(|v| v.to_string())
            .collect();

        assert!(argument_present(&args, "width"));
        assert!(!argument_present(&args, "height"));
        assert_eq!(argument_value(&args, "frames-dir"), Some("shots".to_string()));
        assert_eq!(parse_argument::<usize>(&args, "width"), Some(320));
        assert_eq!(parse_argument::<usize>(&args, "height"), None);
    }
}

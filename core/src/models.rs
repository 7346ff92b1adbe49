pub mod image;
pub mod io;
pub mod pixel;

pub use image::Image;
pub use io::{CaptureError, FrameSource, Storage, StorageError, UploadError, UploadSink};
pub use pixel::Pixel;

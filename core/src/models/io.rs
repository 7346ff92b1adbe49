use custom_error::custom_error;

use super::image::Image;

custom_error! {pub CaptureError
    Failed {description: String} = "Failed to capture frame: {description}",
    InvalidFrame {description: String} = "Captured frame is invalid: {description}",
}

custom_error! {pub UploadError
    Failed {description: String} = "Failed to upload: {description}",
    Rejected {status: u16} = "Upload rejected by remote host: status {status}",
}

custom_error! {pub StorageError
    FailedToCreate {description: String} = "Failed to create object: {description}",
    FailedToWrite {description: String} = "Failed to write object: {description}",
    FailedToRead {description: String} = "Failed to read object: {description}",
    FailedToDelete {description: String} = "Failed to delete object: {description}",
}

/// Produces RGB24 frames of fixed dimensions on demand. Implemented by the
/// camera glue; the encoding pipeline only ever sees this trait.
pub trait FrameSource {

    fn dimensions(&self) -> (usize, usize);

    /// Next frame, or None once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Image>, CaptureError>;
}

/// Pushes a finished byte buffer to a remote host.
pub trait UploadSink {

    fn upload(&self, filename: &str, content_type: &str, data: &[u8]) -> Result<(), UploadError>;
}

/// A place to materialize encoded byte streams before (or instead of)
/// holding them fully in memory.
pub trait Storage {

    fn create(&self, name: &str) -> Result<(), StorageError>;

    fn append(&self, name: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Reads up to `length` bytes starting at `offset`. A short result means
    /// the object ends inside the requested range.
    fn read_range(&self, name: &str, offset: u64, length: usize) -> Result<Vec<u8>, StorageError>;

    fn delete(&self, name: &str) -> Result<(), StorageError>;
}

use reqwest::blocking::{multipart, Client};

use timelapse_core::models::{UploadError, UploadSink};

/// Pushes finished clips to a remote image host as a multipart form POST.
pub struct MultipartUploadSink {
    url: String,
    client: Client,
}

impl MultipartUploadSink {

    pub fn new(url: &str) -> Self {
        MultipartUploadSink {
            url: url.to_string(),
            client: Client::new(),
        }
    }
}

impl UploadSink for MultipartUploadSink {

    fn upload(&self, filename: &str, content_type: &str, data: &[u8]) -> Result<(), UploadError> {
        let part = multipart::Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|err| UploadError::Failed {
                description: format!("invalid content type {}: {}", content_type, err),
            })?;
        let form = multipart::Form::new().part("file", part);

        let response = self.client.post(&self.url)
            .multipart(form)
            .send()
            .map_err(|err| UploadError::Failed {
                description: format!("failed to send request: {}", err),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("upload of {} accepted with status {}", filename, status);
        Ok(())
    }
}

use crate::config::{HttpProfile, LookupConfig};
use crate::http::{redact_url_for_log, HttpTransport};
use crate::Result;

/// Multipart body ready to send.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Builds the search-by-image form: the encoded image plus empty `image_url`/`filename`
/// fields and the `hl` language selector.
pub fn build_upload_form(file_name: &str, image_bytes: &[u8], language: &str) -> MultipartForm {
    let boundary = format!("----HiresLookupBoundary{}", uuid::Uuid::new_v4().simple());
    let file_name = file_name.replace(['"', '\r', '\n'], "_");
    let mut body = Vec::with_capacity(image_bytes.len() + 512);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"encoded_image\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(image_bytes);
    body.extend_from_slice(b"\r\n");

    for (name, value) in [("image_url", ""), ("filename", ""), ("hl", language)] {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    MultipartForm {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        body,
    }
}

pub struct Uploader<'a> {
    transport: &'a dyn HttpTransport,
    profile: HttpProfile,
    upload_url: String,
    language: String,
}

impl<'a> Uploader<'a> {
    pub fn new(transport: &'a dyn HttpTransport, config: &LookupConfig) -> Self {
        Self {
            transport,
            profile: config.http_profile(),
            upload_url: config.upload_url.trim().to_string(),
            language: config.language.trim().to_string(),
        }
    }

    /// Posts the image and returns the response markup whatever the status code.
    pub fn upload(&self, file_name: &str, image_bytes: &[u8]) -> Result<String> {
        let form = build_upload_form(file_name, image_bytes, &self.language);
        let mut headers = self.profile.browser_headers();
        headers.push(("content-type", form.content_type));

        let response = self.transport.post(&self.upload_url, &headers, &form.body)?;
        if !response.is_success() {
            tracing::warn!(
                url = %redact_url_for_log(&self.upload_url),
                status = response.status,
                "image_upload_non_success_status"
            );
        }
        Ok(response.text())
    }
}

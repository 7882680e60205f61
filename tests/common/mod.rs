use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::path::Path;

use hires_lookup::http::{HeaderList, HttpResponse, HttpTransport};
use hires_lookup::{LookupError, Result};
use image::{ImageFormat, RgbImage};

/// Stands in for the search service and image hosts.
#[derive(Default)]
pub struct ScriptedTransport {
    pub upload_pages: RefCell<VecDeque<String>>,
    pub pages: HashMap<String, (u16, Vec<u8>)>,
    pub posts: RefCell<usize>,
    pub gets: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn with_uploads(pages: &[&str]) -> Self {
        Self {
            upload_pages: RefCell::new(pages.iter().map(|p| p.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn serve(&mut self, url: &str, status: u16, body: Vec<u8>) {
        self.pages.insert(url.to_string(), (status, body));
    }

    pub fn post_count(&self) -> usize {
        *self.posts.borrow()
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str, _headers: &HeaderList) -> Result<HttpResponse> {
        self.gets.borrow_mut().push(url.to_string());
        match self.pages.get(url) {
            Some((status, body)) => Ok(HttpResponse {
                status: *status,
                content_type: String::new(),
                body: body.clone(),
            }),
            None => Err(LookupError::Network(format!("no route to {url}"))),
        }
    }

    fn post(&self, _url: &str, _headers: &HeaderList, body: &[u8]) -> Result<HttpResponse> {
        *self.posts.borrow_mut() += 1;
        assert!(!body.is_empty());
        let page = self
            .upload_pages
            .borrow_mut()
            .pop_front()
            .unwrap_or_default();
        Ok(HttpResponse {
            status: 200,
            content_type: "text/html".to_string(),
            body: page.into_bytes(),
        })
    }
}

pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([30, 144, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture");
    out.into_inner()
}

pub fn write_image(path: &Path, width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let bytes = encoded_image(width, height, format);
    std::fs::write(path, &bytes).expect("write fixture");
    bytes
}

pub const LARGE_RESULTS_PAGE: &str = r#"<html><body>
  <a href="/search?tbs=simg:CAQSlwEKCAgBEg,isz:m&amp;sa=X">Medium</a>
  <a href="/search?tbs=simg:CAQSlwEKCAgBEg,isz:l&amp;sa=X">Large</a>
</body></html>"#;

pub const LARGE_LISTING_URL: &str = "https://google.com/search?tbs=simg:CAQSlwEKCAgBEg,isz:l&sa=X";

pub const NO_RESULTS_PAGE: &str = r#"<html><body><p>No other sizes of this image found.</p></body></html>"#;

pub const CAPTCHA_PAGE: &str = r#"<html><body><form id="captcha-form" action="/sorry/index"></form></body></html>"#;

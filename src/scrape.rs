use crate::config::{HttpProfile, LookupConfig};
use crate::http::{redact_url_for_log, HttpTransport};
use crate::models::{Candidate, SearchOutcome};
use crate::rank::rank_candidates;
use crate::Result;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// Turns the upload response into ranked candidates or a classified failure.
///
/// The markup is an unversioned third-party format, so the extraction patterns live
/// behind this seam and the pipeline only sees [`SearchOutcome`].
pub trait ResultScraper {
    fn scrape(&self, upload_markup: &str) -> Result<SearchOutcome>;
}

/// Stage 1 result: where the large-image listing lives, or why there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingLink {
    Found(String),
    Blocked,
    NoLargeImageFound,
}

pub struct LargeImageScraper<'a> {
    transport: &'a dyn HttpTransport,
    profile: HttpProfile,
    result_origin: String,
    captcha_marker: String,
    large_size_marker: String,
}

impl<'a> LargeImageScraper<'a> {
    pub fn new(transport: &'a dyn HttpTransport, config: &LookupConfig) -> Self {
        Self {
            transport,
            profile: config.http_profile(),
            result_origin: config.result_origin.trim().to_string(),
            captcha_marker: config.captcha_marker.clone(),
            large_size_marker: config.large_size_marker.clone(),
        }
    }

    fn fetch_listing(&self, listing_url: &str) -> Result<String> {
        let headers = self.profile.browser_headers();
        let response = self.transport.get(listing_url, &headers)?;
        if !response.is_success() {
            tracing::warn!(
                url = %redact_url_for_log(listing_url),
                status = response.status,
                "large_listing_non_success_status"
            );
        }
        Ok(response.text())
    }
}

impl ResultScraper for LargeImageScraper<'_> {
    fn scrape(&self, upload_markup: &str) -> Result<SearchOutcome> {
        let listing_url = match find_large_listing_url(
            upload_markup,
            &self.result_origin,
            &self.large_size_marker,
            &self.captcha_marker,
        )? {
            ListingLink::Found(url) => url,
            ListingLink::Blocked => return Ok(SearchOutcome::Blocked),
            ListingLink::NoLargeImageFound => return Ok(SearchOutcome::NoLargeImageFound),
        };
        tracing::debug!(url = %listing_url, "large_listing_url_found");

        let listing = self.fetch_listing(&listing_url)?;
        let candidates = extract_candidates(&listing);
        tracing::info!(count = candidates.len(), "large_listing_candidates_extracted");
        Ok(SearchOutcome::Candidates(rank_candidates(candidates)))
    }
}

/// Stage 1: the first similar-images link carrying the large size filter.
pub fn find_large_listing_url(
    markup: &str,
    result_origin: &str,
    large_size_marker: &str,
    captcha_marker: &str,
) -> Result<ListingLink> {
    if let Some(fragment) = first_large_fragment(markup, large_size_marker) {
        // `fragment` is always an absolute path, so the service origin is kept.
        let base = Url::parse(result_origin)?;
        let absolute = base.join(&fragment)?;
        return Ok(ListingLink::Found(absolute.to_string()));
    }

    if markup.contains(captcha_marker) {
        Ok(ListingLink::Blocked)
    } else {
        Ok(ListingLink::NoLargeImageFound)
    }
}

fn first_large_fragment(markup: &str, large_size_marker: &str) -> Option<String> {
    static SIMG_LINK_RE: OnceLock<Regex> = OnceLock::new();

    // Anchor attributes come back with entities already decoded.
    let selector = Selector::parse("a[href]").expect("anchor selector");
    let document = Html::parse_document(markup);
    let from_anchor = document
        .select(&selector)
        .filter_map(|tag| tag.value().attr("href"))
        .filter_map(search_path)
        .find(|path| is_large_link(path, large_size_marker));
    if let Some(path) = from_anchor {
        return Some(path.to_string());
    }

    // Links that only appear inside inline script or attribute soup.
    let re = SIMG_LINK_RE
        .get_or_init(|| Regex::new(r#"(/search\?[^"]*?simg:[^"]*?)">"#).unwrap());
    re.captures_iter(markup)
        .filter_map(|caps| caps.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).to_string())
        .find(|href| is_large_link(href, large_size_marker))
}

/// The `/search?...` path and query of an href, whatever host it was written against.
fn search_path(href: &str) -> Option<&str> {
    let href = href.trim();
    href.find("/search?").map(|start| &href[start..])
}

fn is_large_link(path: &str, large_size_marker: &str) -> bool {
    path.starts_with("/search?") && path.contains("simg:") && path.contains(large_size_marker)
}

/// Stage 2: every well-formed `["https://...", height, width]` triple, in discovery order.
///
/// Triples with a bad escape, an unparsable URL or a non-numeric dimension are dropped.
pub fn extract_candidates(listing: &str) -> Vec<Candidate> {
    static TRIPLE_RE: OnceLock<Regex> = OnceLock::new();
    let re = TRIPLE_RE.get_or_init(|| {
        Regex::new(r#"\["(https://(?:[^"\\]|\\.)*?)",\s*([^,\]\s]+),\s*([^,\]\s]+)\]"#).unwrap()
    });

    let mut out = Vec::new();
    for caps in re.captures_iter(listing) {
        let (Some(raw_url), Some(raw_height), Some(raw_width)) =
            (caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let Some(url) = unescape_js_string(raw_url.as_str()) else {
            continue;
        };
        let Ok(parsed) = Url::parse(&url) else {
            continue;
        };
        let (Ok(height), Ok(width)) = (
            raw_height.as_str().parse::<u32>(),
            raw_width.as_str().parse::<u32>(),
        ) else {
            continue;
        };
        out.push(Candidate::discovered(parsed.to_string(), height, width));
    }
    out
}

/// Decodes a JS string body. `\xHH` and `\'` are rewritten into JSON form first;
/// everything else follows JSON escaping, and anything invalid yields `None`.
fn unescape_js_string(raw: &str) -> Option<String> {
    let mut json = String::with_capacity(raw.len() + 8);
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            json.push(c);
            continue;
        }
        match chars.next()? {
            'x' => {
                let hi = chars.next()?;
                let lo = chars.next()?;
                if !hi.is_ascii_hexdigit() || !lo.is_ascii_hexdigit() {
                    return None;
                }
                json.push_str("\\u00");
                json.push(hi);
                json.push(lo);
            }
            '\'' => json.push('\''),
            other => {
                json.push('\\');
                json.push(other);
            }
        }
    }
    serde_json::from_str::<String>(&format!("\"{json}\"")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://google.com";
    const LARGE: &str = ",isz:l";
    const CAPTCHA: &str = "captcha";

    #[test]
    fn stage_one_picks_first_large_anchor_and_decodes_entities() {
        let markup = r#"
        <html><body>
          <a href="/search?q=cat&amp;tbs=simg:CAQSmall,isz:m">medium</a>
          <a href="/search?q=cat&amp;tbs=simg:CAQLarge,isz:l&amp;sa=X">large</a>
          <a href="/search?q=cat&amp;tbs=simg:CAQOther,isz:l">other large</a>
        </body></html>
        "#;
        let link = find_large_listing_url(markup, ORIGIN, LARGE, CAPTCHA).expect("stage 1");
        assert_eq!(
            link,
            ListingLink::Found(
                "https://google.com/search?q=cat&tbs=simg:CAQLarge,isz:l&sa=X".to_string()
            )
        );
    }

    #[test]
    fn stage_one_forces_service_origin_on_absolute_links() {
        let markup = r#"<a href="https://tracker.elsewhere.example/search?tbs=simg:CAQ9,isz:l">large</a>"#;
        let link = find_large_listing_url(markup, ORIGIN, LARGE, CAPTCHA).expect("stage 1");
        assert_eq!(
            link,
            ListingLink::Found("https://google.com/search?tbs=simg:CAQ9,isz:l".to_string())
        );
    }

    #[test]
    fn stage_one_ignores_protocol_relative_hosts() {
        let markup = r#"<a href="//cdn.elsewhere.example/search?tbs=simg:CAQ2,isz:l&amp;q=1">large</a>"#;
        let link = find_large_listing_url(markup, ORIGIN, LARGE, CAPTCHA).expect("stage 1");
        assert_eq!(
            link,
            ListingLink::Found("https://google.com/search?tbs=simg:CAQ2,isz:l&q=1".to_string())
        );
    }

    #[test]
    fn stage_one_falls_back_to_raw_pattern_outside_anchors() {
        let markup = r#"<script>var x = '<div data-u="/search?tbs=simg:CAQ1,isz:l&amp;hl=ko">';</script>"#;
        let link = find_large_listing_url(markup, ORIGIN, LARGE, CAPTCHA).expect("stage 1");
        assert_eq!(
            link,
            ListingLink::Found("https://google.com/search?tbs=simg:CAQ1,isz:l&hl=ko".to_string())
        );
    }

    #[test]
    fn stage_one_without_large_link_is_blocked_when_captcha_present() {
        let markup = r#"<html><form action="/sorry/index"><div id="captcha-form"></div></form></html>"#;
        let link = find_large_listing_url(markup, ORIGIN, LARGE, CAPTCHA).expect("stage 1");
        assert_eq!(link, ListingLink::Blocked);
    }

    #[test]
    fn stage_one_without_large_link_or_captcha_is_no_large_image() {
        let markup = r#"<a href="/search?tbs=simg:CAQ,isz:m">only medium</a>"#;
        let link = find_large_listing_url(markup, ORIGIN, LARGE, CAPTCHA).expect("stage 1");
        assert_eq!(link, ListingLink::NoLargeImageFound);
    }

    #[test]
    fn stage_one_large_link_wins_over_captcha_marker() {
        let markup = r#"<a href="/search?tbs=simg:CAQ,isz:l">large</a><p>recaptcha notice</p>"#;
        let link = find_large_listing_url(markup, ORIGIN, LARGE, CAPTCHA).expect("stage 1");
        assert!(matches!(link, ListingLink::Found(_)), "link={link:?}");
    }

    #[test]
    fn stage_two_skips_malformed_triples_and_keeps_the_rest() {
        let listing = r#"AF_initDataCallback({data:[["https://a/x.jpg",100,200],["https://b/y",abc,50]]});"#;
        let out = extract_candidates(listing);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://a/x.jpg");
        assert_eq!(out[0].quality, 20_000);
        assert!(!out[0].is_fetched());
    }

    #[test]
    fn stage_two_unescapes_embedded_urls() {
        let listing = r#"[["https://img.example.com/p?id=7&s=1",1080,1920],["https:\/\/cdn.example.com\/z.png",10,10]]"#;
        let out = extract_candidates(listing);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://img.example.com/p?id=7&s=1");
        assert_eq!(out[0].dimensions.width, 1920);
        assert_eq!(out[0].dimensions.height, 1080);
    }

    #[test]
    fn stage_two_drops_bad_escape_and_invalid_url() {
        let listing = r#"["https://c/\q.jpg",10,10] ["https://",5,5] ["https://d.example/ok.jpg",3,4]"#;
        let out = extract_candidates(listing);
        let urls: Vec<&str> = out.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, ["https://d.example/ok.jpg"]);
    }

    #[test]
    fn stage_two_decodes_js_hex_escapes() {
        let listing = r#"["https://img.example.com/p?id\x3d7\x26s\x3d1",1080,1920]"#;
        let out = extract_candidates(listing);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://img.example.com/p?id=7&s=1");
        assert_eq!(out[0].quality, 2_073_600);
    }

    #[test]
    fn js_unescape_handles_mixed_and_rejects_truncated_escapes() {
        assert_eq!(
            unescape_js_string(r"a\u003db\x26c\/d\'e").as_deref(),
            Some("a=b&c/d'e")
        );
        assert_eq!(unescape_js_string(r"\\x41").as_deref(), Some(r"\x41"));
        assert_eq!(unescape_js_string(r"bad\x4"), None);
        assert_eq!(unescape_js_string(r"bad\xzz"), None);
        assert_eq!(unescape_js_string(r"bad\q"), None);
    }

    #[test]
    fn stage_two_is_idempotent() {
        let listing = r#"["https://a.example/1.jpg",10,20]["https://a.example/2.jpg",30,40]["https://a.example/3.jpg",x,1]"#;
        assert_eq!(extract_candidates(listing), extract_candidates(listing));
    }

    #[test]
    fn stage_two_ignores_non_https_urls() {
        let listing = r#"["http://insecure.example/a.jpg",100,100]"#;
        assert!(extract_candidates(listing).is_empty());
    }
}

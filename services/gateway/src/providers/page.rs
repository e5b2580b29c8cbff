use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::GatewayError;

static HIDDEN_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<head\b.*?</head\s*>|<svg\b.*?</svg\s*>|<template\b.*?</template\s*>",
    )
    .expect("hidden block pattern is valid")
});

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([a-zA-Z][a-zA-Z0-9]{1,7}));")
        .expect("entity pattern is valid")
});

/// Downloads a page and reduces it to its readable text.
pub struct PageFetcher {
    http_client: Client,
    max_bytes: usize,
}

impl PageFetcher {
    /// `max_bytes` caps the body read from the wire; larger pages are refused.
    pub fn new(http_client: Client, max_bytes: usize) -> Self {
        Self {
            http_client,
            max_bytes,
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_text(&self, url: &str, char_budget: usize) -> Result<String, GatewayError> {
        let parsed = parse_page_url(url)?;

        let mut response = self
            .http_client
            .get(parsed)
            .send()
            .await
            .map_err(|e| GatewayError::Parse(format!("failed to fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Parse(format!("{url} responded with {status}")));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(self.too_large(url));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| GatewayError::Parse(format!("failed to read {url}: {e}")))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }
        let html = String::from_utf8_lossy(&body);

        let text = truncate_chars(&readable_text(&html), char_budget);
        if text.is_empty() {
            return Err(GatewayError::Parse(format!("{url} has no readable content")));
        }

        debug!(html_len = html.len(), text_chars = text.chars().count(), "page text extracted");
        Ok(text)
    }

    fn too_large(&self, url: &str) -> GatewayError {
        GatewayError::Parse(format!("{url} is larger than {} bytes", self.max_bytes))
    }
}

pub fn parse_page_url(url: &str) -> Result<Url, GatewayError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| GatewayError::InvalidInput(format!("malformed URL {url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(GatewayError::InvalidInput(format!(
            "unsupported URL scheme {scheme:?}; only http and https pages can be summarized"
        ))),
    }
}

/// Drops scripts, styles, comments and markup, then collapses whitespace.
pub fn readable_text(html: &str) -> String {
    let without_blocks = HIDDEN_BLOCKS.replace_all(html, " ");
    let without_tags = TAGS.replace_all(&without_blocks, " ");

    let decoded = decode_entities(&without_tags);

    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Replaces numeric and common named character references in one pass.
/// Unknown names and invalid code points are left untouched.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                caps.get(3).and_then(|name| named_entity(name.as_str()))
            };
            match decoded {
                Some(ch) => ch.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "copy" => '©',
        "reg" => '®',
        "deg" => '°',
        "hellip" => '…',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "ordf" => 'ª',
        "ordm" => 'º',
        "aacute" => 'á',
        "Aacute" => 'Á',
        "agrave" => 'à',
        "Agrave" => 'À',
        "acirc" => 'â',
        "Acirc" => 'Â',
        "atilde" => 'ã',
        "Atilde" => 'Ã',
        "eacute" => 'é',
        "Eacute" => 'É',
        "ecirc" => 'ê',
        "Ecirc" => 'Ê',
        "iacute" => 'í',
        "Iacute" => 'Í',
        "oacute" => 'ó',
        "Oacute" => 'Ó',
        "ocirc" => 'ô',
        "Ocirc" => 'Ô',
        "otilde" => 'õ',
        "Otilde" => 'Õ',
        "uacute" => 'ú',
        "Uacute" => 'Ú',
        "uuml" => 'ü',
        "Uuml" => 'Ü',
        "ccedil" => 'ç',
        "Ccedil" => 'Ç',
        "ntilde" => 'ñ',
        "Ntilde" => 'Ñ',
        _ => return None,
    };
    Some(ch)
}

pub fn truncate_chars(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

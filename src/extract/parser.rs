//! HTML Metadata Parser
//!
//! Scans `<meta>`, `<link>` and `<title>` tags out of a page and maps them
//! onto [`ExtractedMetadata`]. Only the head tags are read; the document is
//! never built into a tree.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use crate::models::ExtractedMetadata;

static META_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta regex"));
static LINK_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("link regex"));
static TITLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("title regex"));
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute regex")
});

/// Attributes of one tag, names lowercased.
type Attributes = HashMap<String, String>;

fn attributes(tag: &str) -> Attributes {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
            Some((name, decode_entities(value.as_str())))
        })
        .collect()
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// `<meta>` contents indexed by the attribute that names them. The first
/// tag wins, as a selector would match it.
#[derive(Debug, Default)]
struct MetaIndex {
    property: HashMap<String, String>,
    name: HashMap<String, String>,
    itemprop: HashMap<String, String>,
}

impl MetaIndex {
    fn insert(&mut self, attr: &str, key: &str, content: &str) {
        let map = match attr {
            "property" => &mut self.property,
            "name" => &mut self.name,
            _ => &mut self.itemprop,
        };
        map.entry(key.to_string()).or_insert_with(|| content.to_string());
    }

    fn lookup(map: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| map.get(*key))
            .map(|content| content.trim())
            .find(|content| !content.is_empty())
            .map(str::to_string)
    }

    fn property(&self, keys: &[&str]) -> Option<String> {
        Self::lookup(&self.property, keys)
    }

    fn name(&self, keys: &[&str]) -> Option<String> {
        Self::lookup(&self.name, keys)
    }

    fn itemprop(&self, keys: &[&str]) -> Option<String> {
        Self::lookup(&self.itemprop, keys)
    }
}

// == Parse ==
/// Extracts page metadata from `html` fetched from `page_url`.
///
/// Relative image and favicon URLs are resolved against `page_url`; URLs
/// that cannot be resolved are dropped.
pub fn parse_html(html: &str, page_url: &str) -> ExtractedMetadata {
    let mut index = MetaIndex::default();
    let mut metadata = ExtractedMetadata::default();

    for tag in META_TAG.find_iter(html) {
        let attrs = attributes(tag.as_str());
        let Some(content) = attrs.get("content") else {
            continue;
        };
        for attr in ["name", "property", "itemprop"] {
            if let Some(key) = attrs.get(attr) {
                index.insert(attr, key, content);
            }
        }
        let raw_key = attrs
            .get("name")
            .or_else(|| attrs.get("property"))
            .or_else(|| attrs.get("itemprop"));
        if let Some(key) = raw_key {
            if !content.is_empty() {
                metadata.raw_meta.insert(key.clone(), content.clone());
            }
        }
    }

    let links: Vec<Attributes> = LINK_TAG.find_iter(html).map(|tag| attributes(tag.as_str())).collect();
    let link_href = |rel: &str| {
        links
            .iter()
            .find(|attrs| attrs.get("rel").is_some_and(|r| r.eq_ignore_ascii_case(rel)))
            .and_then(|attrs| attrs.get("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
    };

    let title_tag = TITLE_TAG
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|t| !t.is_empty());

    // OpenGraph
    let og_title = index.property(&["og:title"]);
    let og_description = index.property(&["og:description"]);
    let og_image = index.property(&["og:image", "og:image:url"]);
    metadata.site_name = index.property(&["og:site_name"]);
    metadata.kind = index.property(&["og:type"]);
    metadata.locale = index.property(&["og:locale"]);
    metadata.url = index
        .property(&["og:url"])
        .or_else(|| Some(page_url.to_string()));

    // Twitter Card
    metadata.twitter_card = index.name(&["twitter:card"]);
    metadata.twitter_site = index.name(&["twitter:site"]);
    metadata.twitter_creator = index.name(&["twitter:creator"]);
    metadata.twitter_title = index.name(&["twitter:title"]);
    metadata.twitter_description = index.name(&["twitter:description"]);
    let twitter_image = index.name(&["twitter:image", "twitter:image:src"]);

    // General
    metadata.title = og_title
        .or_else(|| metadata.twitter_title.clone())
        .or(title_tag)
        .or_else(|| index.name(&["title"]));
    metadata.description = og_description
        .or_else(|| metadata.twitter_description.clone())
        .or_else(|| index.name(&["description"]))
        .or_else(|| index.itemprop(&["description"]));

    metadata.image = resolve(og_image.as_deref().or(twitter_image.as_deref()), page_url);
    metadata.twitter_image = resolve(twitter_image.as_deref(), page_url);

    let favicon = link_href("icon")
        .or_else(|| link_href("shortcut icon"))
        .or_else(|| link_href("apple-touch-icon"));
    metadata.favicon = resolve(favicon.as_deref(), page_url);
    metadata.canonical = link_href("canonical");
    metadata.theme_color = index.name(&["theme-color"]);
    metadata.author = index.name(&["author"]);
    metadata.keywords = index.name(&["keywords"]);

    metadata
}

/// Resolves a possibly relative URL against the page URL.
fn resolve(candidate: Option<&str>, page_url: &str) -> Option<String> {
    let candidate = candidate?;
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(candidate.to_string());
    }
    Url::parse(page_url)
        .and_then(|base| base.join(candidate))
        .map(String::from)
        .ok()
}

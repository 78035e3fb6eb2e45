// src/feed/atom.rs
use quick_xml::de::from_str;
use serde::Deserialize;

use super::{Author, RawEntry, RawFeed};

#[derive(Debug, Deserialize)]
struct AtomFeed {
    // Vec: extension elements such as `media:title` share the local name.
    #[serde(rename = "title", default)]
    titles: Vec<Text>,
    updated: Option<String>,
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "title", default)]
    titles: Vec<Text>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    published: Option<String>,
    updated: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<Person>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Person {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term", default)]
    term: String,
    #[serde(rename = "@label")]
    label: Option<String>,
}

pub(crate) fn parse(xml: &str) -> Result<RawFeed, String> {
    let feed: AtomFeed = from_str(xml).map_err(|e| format!("atom: {e}"))?;

    let entries = feed
        .entries
        .into_iter()
        .map(|it| RawEntry {
            title: it.titles.into_iter().next().map(|t| t.value),
            link: pick_link(&it.links),
            published: it.published.or(it.updated),
            author: it.authors.into_iter().next().map(|p| Author {
                name: p.name,
                email: p.email,
            }),
            categories: it
                .categories
                .into_iter()
                .map(|c| c.label.filter(|l| !l.trim().is_empty()).unwrap_or(c.term))
                .collect(),
        })
        .collect();

    Ok(RawFeed {
        title: feed.titles.into_iter().next().map(|t| t.value),
        updated: feed.updated,
        entries,
    })
}

/// `rel="alternate"` (or no rel, which means the same) wins over other links.
fn pick_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}

// src/feed/rss.rs
//! RSS 2.0 reader.
//!
//! Walks the document with a pull parser and matches elements on their qualified
//! name, so extension elements (`itunes:title`, `media:title`, `itunes:author`, ...)
//! never collide with the core RSS fields. Only direct children of `<channel>` and
//! `<item>` are read; anything nested deeper is skipped.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{Author, RawEntry, RawFeed};

#[derive(Default)]
struct ItemFields {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    dc_date: Option<String>,
    author: Option<String>,
    creator: Option<String>,
    categories: Vec<String>,
}

impl ItemFields {
    fn into_entry(self) -> RawEntry {
        RawEntry {
            title: self.title,
            link: self.link,
            published: self.pub_date.or(self.dc_date),
            author: parse_author(self.author.as_deref(), self.creator.as_deref()),
            categories: self.categories,
        }
    }
}

pub(crate) fn parse(xml: &str) -> Result<RawFeed, String> {
    let mut reader = Reader::from_str(xml);
    let mut feed = RawFeed::default();
    let mut channel_pub_date: Option<String> = None;
    let mut saw_channel = false;

    let mut path: Vec<String> = Vec::new();
    let mut item: Option<ItemFields> = None;
    let mut text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("rss: {e} at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match (path.last().map(String::as_str), name.as_str()) {
                    (Some("rss"), "channel") => saw_channel = true,
                    (Some("channel"), "item") => item = Some(ItemFields::default()),
                    _ => {}
                }
                path.push(name);
                text.clear();
            }
            Event::Text(t) => {
                let unescaped = t.unescape().map_err(|e| format!("rss: {e}"))?;
                text.push_str(&unescaped);
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                let name = path.pop().unwrap_or_default();
                let value = std::mem::take(&mut text);
                match path.last().map(String::as_str) {
                    Some("item") => {
                        if let Some(it) = item.as_mut() {
                            assign_item_field(it, &name, value);
                        }
                    }
                    Some("channel") if name == "item" => {
                        if let Some(it) = item.take() {
                            feed.entries.push(it.into_entry());
                        }
                    }
                    Some("channel") => match name.as_str() {
                        "title" => first(&mut feed.title, value),
                        "lastBuildDate" => first(&mut feed.updated, value),
                        "pubDate" => first(&mut channel_pub_date, value),
                        _ => {}
                    },
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(format!("rss: unexpected end of document inside <{}>", path.join("><")));
    }
    if !saw_channel {
        return Err("rss: missing <channel>".to_string());
    }

    feed.updated = feed.updated.or(channel_pub_date);
    Ok(feed)
}

fn assign_item_field(it: &mut ItemFields, name: &str, value: String) {
    match name {
        "title" => first(&mut it.title, value),
        "link" => first(&mut it.link, value),
        "pubDate" => first(&mut it.pub_date, value),
        "dc:date" => first(&mut it.dc_date, value),
        "author" => first(&mut it.author, value),
        "dc:creator" => first(&mut it.creator, value),
        "category" => it.categories.push(value),
        _ => {}
    }
}

// Repeated single-valued elements: the first one wins.
fn first(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// RSS `<author>` is conventionally `email (Name)`; `dc:creator` is a plain name.
fn parse_author(author: Option<&str>, creator: Option<&str>) -> Option<Author> {
    let mut out = Author {
        name: None,
        email: None,
    };

    if let Some(raw) = author.map(str::trim).filter(|s| !s.is_empty()) {
        match (raw.find('('), raw.rfind(')')) {
            (Some(open), Some(close)) if open < close => {
                out.email = Some(raw[..open].trim().to_string()).filter(|s| !s.is_empty());
                out.name = Some(raw[open + 1..close].trim().to_string()).filter(|s| !s.is_empty());
            }
            _ if raw.contains('@') && !raw.contains(' ') => out.email = Some(raw.to_string()),
            _ => out.name = Some(raw.to_string()),
        }
    }

    if out.name.is_none() {
        out.name = creator
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    if out.name.is_none() && out.email.is_none() {
        None
    } else {
        Some(out)
    }
}

//! Tolerant Atom/GData feed parsing.
//!
//! Only direct children of each `<entry>` are read as text fields, so nested
//! elements such as `<author><name>` never overwrite them. Namespaced fields
//! are matched by the prefixes the gallery service emits (`gphoto:`,
//! `media:`). A malformed document yields every entry completed before the
//! error; the error itself is logged.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use super::error::FeedError;
use super::model::{Collection, Item};

/// Link relation marking a collection's item feed.
pub const ITEM_FEED_REL: &str = "http://schemas.google.com/g/2005#feed";

/// Parses a user's collection feed.
#[must_use]
pub fn parse_collections(xml: &str) -> Vec<Collection> {
    let entries = scan_logged(xml, "collection");
    entries
        .into_iter()
        .map(|entry| {
            let mut collection = Collection::new(entry.id(), entry.title.clone());
            collection.feed_link = entry.link(ITEM_FEED_REL);
            collection.owner = entry.user;
            collection.item_count = entry.numphotos.trim().parse().unwrap_or(0);
            collection.updated = entry.updated;
            collection.timestamp_ms = entry.timestamp.trim().parse().ok();
            collection.thumbnail_url = entry.media_url;
            collection
        })
        .collect()
}

/// Parses one collection's item feed. Entries without a content source are
/// dropped.
#[must_use]
pub fn parse_items(xml: &str) -> Vec<Item> {
    let entries = scan_logged(xml, "item");
    entries
        .into_iter()
        .filter_map(|entry| {
            let Some(source) = entry.content_src.clone() else {
                debug!(title = %entry.title, "item entry has no content source");
                return None;
            };
            let timestamp = entry
                .timestamp
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(DateTime::<Utc>::from_timestamp_millis);
            let mut item = Item::new(entry.gphoto_id.clone().unwrap_or_default(), source);
            item.title = entry.title;
            item.updated = entry.updated;
            item.timestamp = timestamp;
            Some(item)
        })
        .collect()
}

fn scan_logged(xml: &str, kind: &'static str) -> Vec<RawEntry> {
    let (entries, error) = scan_entries(xml);
    if let Some(error) = error {
        warn!(
            kind,
            parsed = entries.len(),
            error = %error,
            "malformed feed, keeping entries parsed so far"
        );
    }
    entries
}

#[derive(Debug, Default)]
struct RawEntry {
    atom_id: String,
    gphoto_id: Option<String>,
    title: String,
    updated: String,
    user: String,
    numphotos: String,
    timestamp: String,
    links: Vec<(String, String)>,
    content_src: Option<String>,
    media_url: Option<String>,
}

impl RawEntry {
    fn id(&self) -> String {
        self.gphoto_id
            .clone()
            .unwrap_or_else(|| self.atom_id.clone())
    }

    fn link(&self, rel: &str) -> Option<String> {
        self.links
            .iter()
            .find(|(r, _)| r == rel)
            .map(|(_, href)| href.clone())
    }

    fn set_text(&mut self, tag: &Tag, text: String) {
        match (tag.prefix.as_deref(), tag.local.as_str()) {
            (None, "id") => self.atom_id = text,
            (Some("gphoto"), "id") => self.gphoto_id = Some(text),
            (None, "title") => self.title = text,
            (None, "updated") => self.updated = text,
            (Some("gphoto"), "user") => self.user = text,
            (Some("gphoto"), "numphotos") => self.numphotos = text,
            (Some("gphoto"), "timestamp") => self.timestamp = text,
            _ => {}
        }
    }

    fn take_attributes(&mut self, tag: &Tag, element: &BytesStart<'_>, direct_child: bool) {
        match (tag.prefix.as_deref(), tag.local.as_str()) {
            (None, "link") if direct_child => {
                let rel = attribute(element, "rel").unwrap_or_default();
                if let Some(href) = attribute(element, "href") {
                    self.links.push((rel, href));
                }
            }
            (None, "content") if direct_child => {
                self.content_src = attribute(element, "src");
            }
            (Some("media"), "content") if self.media_url.is_none() => {
                self.media_url = attribute(element, "url");
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    prefix: Option<String>,
    local: String,
}

impl Tag {
    fn of(element: &BytesStart<'_>) -> Self {
        let name = element.name();
        Self {
            prefix: name
                .prefix()
                .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned()),
            local: String::from_utf8_lossy(name.local_name().as_ref()).into_owned(),
        }
    }

    fn is_entry(&self) -> bool {
        self.prefix.is_none() && self.local == "entry"
    }
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Walks the document collecting every completed `<entry>`.
fn scan_entries(xml: &str) -> (Vec<RawEntry>, Option<FeedError>) {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut open: Vec<Tag> = Vec::new();
    let mut current: Option<(usize, RawEntry)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                let tag = Tag::of(&element);
                match current.as_mut() {
                    None if tag.is_entry() => current = Some((open.len(), RawEntry::default())),
                    Some((depth, entry)) => {
                        let direct_child = open.len() == *depth + 1;
                        entry.take_attributes(&tag, &element, direct_child);
                    }
                    None => {}
                }
                open.push(tag);
                text.clear();
            }
            Ok(Event::Empty(element)) => {
                if let Some((depth, entry)) = current.as_mut() {
                    let direct_child = open.len() == *depth + 1;
                    entry.take_attributes(&Tag::of(&element), &element, direct_child);
                }
            }
            Ok(Event::Text(chunk)) => match chunk.unescape() {
                Ok(value) => text.push_str(&value),
                Err(e) => return (entries, Some(FeedError::malformed(reader.buffer_position(), e))),
            },
            Ok(Event::CData(chunk)) => {
                text.push_str(&String::from_utf8_lossy(&chunk.into_inner()));
            }
            Ok(Event::End(_)) => {
                let Some(tag) = open.pop() else {
                    continue;
                };
                let finished = std::mem::take(&mut text);
                let Some((depth, entry)) = current.as_mut() else {
                    continue;
                };
                if open.len() == *depth && tag.is_entry() {
                    if let Some((_, entry)) = current.take() {
                        entries.push(entry);
                    }
                } else if open.len() == *depth + 1 {
                    entry.set_text(&tag, finished);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return (entries, Some(FeedError::malformed(reader.buffer_position(), e))),
        }
    }

    (entries, None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::Datelike;

    use super::*;

    const COLLECTIONS: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<feed xmlns='http://www.w3.org/2005/Atom' xmlns:media='http://search.yahoo.com/mrss/'
      xmlns:gphoto='http://schemas.google.com/photos/2007'>
  <id>https://picasaweb.google.com/data/feed/api/user/sample.user</id>
  <title>sample.user</title>
  <entry>
    <id>https://picasaweb.google.com/data/entry/api/user/sample.user/albumid/1001</id>
    <updated>2013-04-01T12:30:45.000Z</updated>
    <title type='text'>Spring &amp; Summer</title>
    <link rel='http://schemas.google.com/g/2005#feed' type='application/atom+xml'
          href='https://picasaweb.google.com/data/feed/api/user/sample.user/albumid/1001'/>
    <link rel='alternate' type='text/html' href='https://picasaweb.google.com/sample.user/Spring'/>
    <author><name>Sample</name><uri>https://picasaweb.google.com/sample.user</uri></author>
    <gphoto:id>1001</gphoto:id>
    <gphoto:user>sample.user</gphoto:user>
    <gphoto:numphotos>3</gphoto:numphotos>
    <gphoto:timestamp>1364819445000</gphoto:timestamp>
    <media:group>
      <media:title type='plain'>Spring</media:title>
      <media:content url='https://lh3.example.com/-a/AAA/BBB/s160-c/Spring.jpg' type='image/jpeg' medium='image'/>
    </media:group>
  </entry>
  <entry>
    <id>https://picasaweb.google.com/data/entry/api/user/sample.user/albumid/1002</id>
    <updated>2013-05-01T00:00:00.000Z</updated>
    <title>Winter</title>
    <link rel='http://schemas.google.com/g/2005#feed' href='https://picasaweb.google.com/data/feed/api/user/sample.user/albumid/1002'/>
    <gphoto:id>1002</gphoto:id>
    <gphoto:numphotos>not-a-number</gphoto:numphotos>
  </entry>
</feed>"#;

    const ITEMS: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<feed xmlns='http://www.w3.org/2005/Atom' xmlns:gphoto='http://schemas.google.com/photos/2007'>
  <gphoto:id>1001</gphoto:id>
  <entry>
    <id>https://picasaweb.google.com/data/entry/api/user/sample.user/albumid/1001/photoid/7001</id>
    <updated>2013-04-01T12:30:45.000Z</updated>
    <title>IMG_0001.JPG</title>
    <content type='image/jpeg' src='https://lh3.example.com/-a/AAA/BBB/Xy9/IMG_0001.JPG'/>
    <gphoto:id>7001</gphoto:id>
    <gphoto:timestamp>1364819445000</gphoto:timestamp>
  </entry>
  <entry>
    <title>no id</title>
    <content src='https://lh3.example.com/-a/AAA/BBB/Qz7/IMG_0002.png'/>
  </entry>
  <entry>
    <title>no content</title>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_collections_fields() {
        let collections = parse_collections(COLLECTIONS);
        assert_eq!(collections.len(), 2);

        let spring = &collections[0];
        assert_eq!(spring.id, "1001");
        assert_eq!(spring.title, "Spring & Summer");
        assert_eq!(spring.owner, "sample.user");
        assert_eq!(spring.item_count, 3);
        assert_eq!(spring.updated, "2013-04-01T12:30:45.000Z");
        assert_eq!(spring.timestamp_ms, Some(1_364_819_445_000));
        assert_eq!(
            spring.feed_link.as_deref(),
            Some("https://picasaweb.google.com/data/feed/api/user/sample.user/albumid/1001")
        );
        assert_eq!(
            spring.thumbnail_url.as_deref(),
            Some("https://lh3.example.com/-a/AAA/BBB/s160-c/Spring.jpg")
        );
        assert_eq!(
            spring.thumbnail_fetch_url().as_deref(),
            Some("https://lh3.example.com/-a/AAA/BBB/s160-c/w197-h134-p/")
        );
    }

    #[test]
    fn test_parse_collections_tolerates_missing_fields() {
        let collections = parse_collections(COLLECTIONS);
        let winter = &collections[1];
        assert_eq!(winter.id, "1002");
        assert_eq!(winter.item_count, 0);
        assert!(winter.owner.is_empty());
        assert!(winter.thumbnail_url.is_none());
        assert!(winter.timestamp_ms.is_none());
    }

    #[test]
    fn test_nested_text_does_not_override_entry_fields() {
        let collections = parse_collections(COLLECTIONS);
        // media:title lives under media:group, author/name under author
        assert_eq!(collections[0].title, "Spring & Summer");
    }

    #[test]
    fn test_atom_id_used_without_gphoto_id() {
        let xml = "<feed><entry><id>urn:abc</id><title>t</title></entry></feed>";
        let collections = parse_collections(xml);
        assert_eq!(collections[0].id, "urn:abc");
    }

    #[test]
    fn test_parse_items_fields() {
        let items = parse_items(ITEMS);
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.id, "7001");
        assert_eq!(first.title, "IMG_0001.JPG");
        assert_eq!(first.updated, "2013-04-01T12:30:45.000Z");
        assert_eq!(first.file_name(), Some("Xy9.JPG"));
        assert_eq!(first.timestamp.unwrap().year(), 2013);

        let second = &items[1];
        assert_eq!(second.id, "Qz7");
        assert_eq!(second.file_name(), Some("Qz7.png"));
        assert!(second.timestamp.is_none());
    }

    #[test]
    fn test_malformed_feed_keeps_completed_entries() {
        let xml = "<feed><entry><gphoto:id>1</gphoto:id><title>ok</title></entry>\
                   <entry><title>broken</wrong></entry></feed>";
        let (entries, error) = scan_entries(xml);
        assert_eq!(entries.len(), 1);
        assert!(error.is_some());

        let collections = parse_collections(xml);
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].id, "1");
    }

    #[test]
    fn test_empty_and_non_xml_input() {
        assert!(parse_collections("").is_empty());
        assert!(parse_items("Service Unavailable").is_empty());
    }
}

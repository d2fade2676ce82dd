//! Fake gallery service for integration tests.
//!
//! Serves a collection feed at `/feed/user/<user>`, item feeds at
//! `/feed/album/<id>`, and image bytes for every `.../w197-h134-p/` URL.

use std::time::Duration;

use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER: &str = "sample.user";
pub const UPDATED: &str = "2013-04-01T12:30:45.000Z";
pub const IMAGE_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg-payload\xFF\xD9";

pub struct FakeCollection {
    pub id: &'static str,
    pub title: &'static str,
    pub items: Vec<&'static str>,
}

impl FakeCollection {
    pub fn new(id: &'static str, title: &'static str, items: &[&'static str]) -> Self {
        Self {
            id,
            title,
            items: items.to_vec(),
        }
    }
}

/// Two collections with three items each.
pub fn two_by_three() -> Vec<FakeCollection> {
    vec![
        FakeCollection::new("1001", "Spring", &["a1", "a2", "a3"]),
        FakeCollection::new("1002", "Winter", &["b1", "b2", "b3"]),
    ]
}

pub fn feed_base_url(server: &MockServer) -> String {
    format!("{}/feed/user/", server.uri())
}

pub fn collection_feed(base: &str, collections: &[FakeCollection]) -> String {
    let entries: String = collections
        .iter()
        .map(|c| {
            format!(
                r#"<entry>
  <id>{base}/entry/album/{id}</id>
  <updated>{UPDATED}</updated>
  <title type='text'>{title}</title>
  <link rel='http://schemas.google.com/g/2005#feed' type='application/atom+xml' href='{base}/feed/album/{id}'/>
  <gphoto:id>{id}</gphoto:id>
  <gphoto:user>{USER}</gphoto:user>
  <gphoto:numphotos>{count}</gphoto:numphotos>
  <media:group>
    <media:content url='{base}/media/cover/{id}/cover.jpg' type='image/jpeg' medium='image'/>
  </media:group>
</entry>
"#,
                id = c.id,
                title = c.title,
                count = c.items.len(),
            )
        })
        .collect();
    format!(
        "<?xml version='1.0' encoding='UTF-8'?>\n\
         <feed xmlns='http://www.w3.org/2005/Atom' xmlns:media='http://search.yahoo.com/mrss/' \
         xmlns:gphoto='http://schemas.google.com/photos/2007'>\n{entries}</feed>"
    )
}

pub fn item_feed(base: &str, collection: &FakeCollection) -> String {
    let entries: String = collection
        .items
        .iter()
        .map(|item| {
            format!(
                r#"<entry>
  <updated>{UPDATED}</updated>
  <title>IMG_{item}.JPG</title>
  <content type='image/jpeg' src='{base}/media/{cid}/{item}/IMG_{item}.JPG'/>
  <gphoto:id>{item}</gphoto:id>
  <gphoto:timestamp>1364819445000</gphoto:timestamp>
</entry>
"#,
                cid = collection.id,
            )
        })
        .collect();
    format!(
        "<?xml version='1.0' encoding='UTF-8'?>\n\
         <feed xmlns='http://www.w3.org/2005/Atom' xmlns:gphoto='http://schemas.google.com/photos/2007'>\n\
         <gphoto:id>{}</gphoto:id>\n{entries}</feed>",
        collection.id
    )
}

/// Mounts both feeds. Image responses are mounted separately so tests can
/// set expectations on them.
pub async fn mount_feeds(server: &MockServer, collections: &[FakeCollection]) {
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path(format!("/feed/user/{USER}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(collection_feed(&base, collections)))
        .mount(server)
        .await;

    for collection in collections {
        Mock::given(method("GET"))
            .and(path(format!("/feed/album/{}", collection.id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(item_feed(&base, collection)))
            .mount(server)
            .await;
    }
}

/// Serves [`IMAGE_BYTES`] for every thumbnail URL, optionally after `delay`.
pub async fn mount_images(server: &MockServer, delay: Option<Duration>, expected: Option<u64>) {
    let mut response = ResponseTemplate::new(200).set_body_bytes(IMAGE_BYTES.to_vec());
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    let mock = Mock::given(method("GET"))
        .and(path_regex(r"^/media/.+/w197-h134-p/$"))
        .respond_with(response);
    match expected {
        Some(count) => mock.expect(count).mount(server).await,
        None => mock.mount(server).await,
    }
}

//! End-to-end mirror runs against a fake gallery service.

mod support;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use picasa_dl_core::download::{HttpClient, Persister, RateGate};
use picasa_dl_core::mirror::{Mirror, MirrorConfig};
use picasa_dl_core::schedule::{CompletionBarrier, SchedulerConfig};
use picasa_dl_core::site::SiteLayout;
use support::gallery::{self, FakeCollection, IMAGE_BYTES, USER};
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STYLESHEET_BODY: &str = "body{margin:0}";

fn mirror_for(server: &MockServer, dest: &Path, stylesheet: bool) -> (Mirror, CompletionBarrier) {
    let writes = CompletionBarrier::new("writes");
    let persister = Persister::new(
        HttpClient::new(),
        Arc::new(RateGate::new("network", 4).unwrap()),
        Arc::new(RateGate::new("file", 4).unwrap()),
        writes.clone(),
    );
    let config = MirrorConfig {
        user_id: USER.to_string(),
        feed_base_url: gallery::feed_base_url(server),
        stylesheet_url: stylesheet.then(|| format!("{}/css/bootstrap.min.css", server.uri())),
        scheduler: SchedulerConfig::default(),
    };
    (Mirror::new(config, persister, SiteLayout::new(dest)), writes)
}

async fn mount_stylesheet(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/css/bootstrap.min.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string(STYLESHEET_BODY))
        .expect(1)
        .mount(server)
        .await;
}

fn assert_full_tree(dest: &Path, collections: &[FakeCollection]) {
    assert!(dest.join("index.html").is_file());
    assert!(dest.join("html").join("index.html").is_file());
    for collection in collections {
        assert!(dest.join("img").join("index").join(format!("{}.jpg", collection.id)).is_file());
        assert!(dest.join("html").join(format!("{}.html", collection.id)).is_file());
        for item in &collection.items {
            let image = dest.join("img").join(collection.id).join(format!("{item}.JPG"));
            assert_eq!(std::fs::read(&image).unwrap(), IMAGE_BYTES, "{}", image.display());
        }
    }
}

#[tokio::test]
async fn test_two_collections_three_items_each() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let collections = gallery::two_by_three();
    gallery::mount_feeds(&server, &collections).await;
    gallery::mount_images(&server, None, Some(8)).await;
    mount_stylesheet(&server).await;

    let dir = TempDir::new().unwrap();
    let (mirror, writes) = mirror_for(&server, dir.path(), true);
    let stats = mirror.run_once().await;

    assert_full_tree(dir.path(), &collections);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("bootstrap.min.css")).unwrap(),
        STYLESHEET_BODY
    );
    assert_eq!(stats.fetched(), 9);
    assert_eq!(stats.failed(), 0);
    assert_eq!(stats.pages(), 4);
    assert_eq!(writes.outstanding(), 0);

    let index = std::fs::read_to_string(dir.path().join("html").join("index.html")).unwrap();
    assert!(index.contains(r#"href="1001.html""#));
    assert!(index.contains(r#"href="1002.html""#));
    assert!(index.contains("3 photos"));

    let page = std::fs::read_to_string(dir.path().join("html").join("1002.html")).unwrap();
    assert!(page.contains(r#"src="../img/1002/b2.JPG""#));

    let redirect = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
    assert!(redirect.contains("URL=html/index.html"));
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let collections = gallery::two_by_three();
    gallery::mount_feeds(&server, &collections).await;
    // Eight thumbnails across both runs: the second run finds them all fresh.
    gallery::mount_images(&server, None, Some(8)).await;
    mount_stylesheet(&server).await;

    let dir = TempDir::new().unwrap();
    let (mirror, _writes) = mirror_for(&server, dir.path(), true);
    let first = mirror.run_once().await;
    let second = mirror.run_once().await;

    assert_eq!(first.fetched(), 9);
    assert_eq!(second.fetched(), 0);
    assert_eq!(second.fresh(), 9);
    // Redirect page is only written when missing.
    assert_eq!(second.pages(), 3);
    assert_full_tree(dir.path(), &collections);
}

#[tokio::test]
async fn test_item_feed_failure_skips_only_that_collection() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let collections = gallery::two_by_three();
    Mock::given(method("GET"))
        .and(path("/feed/album/1002"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    gallery::mount_feeds(&server, &collections).await;
    // Both covers plus the three items of 1001.
    gallery::mount_images(&server, None, Some(5)).await;

    let dir = TempDir::new().unwrap();
    let (mirror, writes) = mirror_for(&server, dir.path(), false);
    let stats = mirror.run_once().await;

    let html = dir.path().join("html");
    let index = std::fs::read_to_string(html.join("index.html")).unwrap();
    assert!(index.contains(r#"href="1002.html""#));
    assert!(html.join("1001.html").is_file());
    assert!(!html.join("1002.html").exists());
    assert!(dir.path().join("img").join("index").join("1002.jpg").is_file());
    assert!(!dir.path().join("img").join("1002").exists());

    assert_eq!(stats.fetched(), 5);
    assert_eq!(stats.failed(), 1);
    assert_eq!(writes.outstanding(), 0);
}

#[tokio::test]
async fn test_collection_feed_failure_ends_run() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(format!("/feed/user/{USER}")))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (mirror, _writes) = mirror_for(&server, dir.path(), false);
    let stats = mirror.run_once().await;

    assert_eq!(stats.failed(), 1);
    assert_eq!(stats.fetched(), 0);
    assert!(dir.path().join("index.html").is_file());
    assert!(!dir.path().join("html").join("index.html").exists());
}

#[tokio::test]
async fn test_interrupt_drains_without_truncated_files() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let collections = gallery::two_by_three();
    gallery::mount_feeds(&server, &collections).await;
    gallery::mount_images(&server, Some(Duration::from_millis(100)), None).await;

    let dir = TempDir::new().unwrap();
    let (mirror, writes) = mirror_for(&server, dir.path(), false);
    let run = tokio::spawn(async move { mirror.run_once().await });

    tokio::time::sleep(Duration::from_millis(150)).await;
    writes.close();
    tokio::time::timeout(Duration::from_secs(10), writes.wait())
        .await
        .expect("pending writes should drain");

    let stats = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("run should finish")
        .unwrap();

    assert_eq!(writes.outstanding(), 0);
    assert_eq!(stats.failed(), 0);
    assert!(stats.fetched() + stats.cancelled() >= 8);
    assert!(stats.cancelled() > 0, "close should refuse later writes");

    // Every image that exists is complete.
    for collection in &collections {
        for item in &collection.items {
            let image = dir.path().join("img").join(collection.id).join(format!("{item}.JPG"));
            if image.exists() {
                assert_eq!(std::fs::read(&image).unwrap(), IMAGE_BYTES);
            }
        }
    }
}

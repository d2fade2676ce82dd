use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use maud::Markup;
use tracing::{debug, info, instrument, warn};

use super::MirrorConfig;
use crate::download::{PersistOutcome, PersistTask, Persister};
use crate::feed::{Collection, FeedError, Item, parse_collections, parse_items};
use crate::schedule::{RunStats, Scheduler};
use crate::site::{SiteLayout, render_collection, render_index, render_redirect};

/// Runs mirror passes for one account into one destination.
///
/// Holds nothing run-specific: every [`run_once`](Self::run_once) builds its
/// own scheduler and stats, so repeated runs on an interval start clean.
#[derive(Debug, Clone)]
pub struct Mirror {
    config: MirrorConfig,
    persister: Persister,
    layout: SiteLayout,
}

/// Per-run state shared by every unit of that run.
#[derive(Debug)]
struct RunContext {
    persister: Persister,
    layout: SiteLayout,
    scheduler: Arc<Scheduler>,
    stats: Arc<RunStats>,
}

impl Mirror {
    /// Creates a mirror writing under `layout`.
    #[must_use]
    pub fn new(config: MirrorConfig, persister: Persister, layout: SiteLayout) -> Self {
        Self {
            config,
            persister,
            layout,
        }
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Performs one full pass and waits until every unit it spawned finished.
    ///
    /// Never fails as a whole: an unreachable collection feed ends the pass
    /// early, everything else is counted per resource in the returned stats.
    #[instrument(skip(self), fields(user = %self.config.user_id))]
    pub async fn run_once(&self) -> Arc<RunStats> {
        let started = Instant::now();
        let scheduler = Scheduler::new(self.config.scheduler.clone())
            .observe_gate(Arc::clone(self.persister.network_gate()))
            .observe_gate(Arc::clone(self.persister.file_gate()))
            .observe_writes(self.persister.writes().clone());
        let ctx = Arc::new(RunContext {
            persister: self.persister.clone(),
            layout: self.layout.clone(),
            scheduler: Arc::new(scheduler),
            stats: Arc::new(RunStats::new()),
        });

        self.populate(&ctx).await;
        ctx.scheduler.drain().await;

        let stats = &ctx.stats;
        info!(
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            units = ctx.scheduler.spawned(),
            fetched = stats.fetched(),
            fresh = stats.fresh(),
            failed = stats.failed(),
            cancelled = stats.cancelled(),
            pages = stats.pages(),
            bytes = stats.bytes(),
            "mirror run finished"
        );
        Arc::clone(&ctx.stats)
    }

    async fn populate(&self, ctx: &Arc<RunContext>) {
        write_redirect(ctx).await;

        if let Some(url) = &self.config.stylesheet_url {
            // Empty timestamp: any non-empty local copy is fresh.
            let task = PersistTask::non_image(url.clone(), ctx.layout.stylesheet(), "");
            spawn_persist(ctx, task).await;
        }

        let collections = match self.fetch_collections(ctx).await {
            Ok(collections) => collections,
            Err(e) => {
                warn!(error = %e, "cannot read collection feed, ending run");
                ctx.stats.record_failure();
                return;
            }
        };
        info!(collections = collections.len(), "collection feed parsed");

        for collection in &collections {
            schedule_collection_thumbnail(ctx, collection).await;
        }

        let index = render_index(&collections);
        let index_path = ctx.layout.index_page();
        let unit_ctx = Arc::clone(ctx);
        ctx.scheduler
            .spawn(async move { write_page(&unit_ctx, &index_path, &index).await })
            .await;

        for collection in collections {
            let Some(link) = collection.feed_link.clone() else {
                warn!(collection = %collection.id, "collection has no item feed link, skipping");
                ctx.stats.record_failure();
                continue;
            };
            let xml = match ctx.persister.fetch_text(&link).await {
                Ok(xml) => xml,
                Err(e) => {
                    let e = FeedError::fetch(&link, e);
                    warn!(collection = %collection.id, error = %e, "skipping collection");
                    ctx.stats.record_failure();
                    continue;
                }
            };
            let items = parse_items(&xml);
            debug!(collection = %collection.id, items = items.len(), "item feed parsed");

            let unit_ctx = Arc::clone(ctx);
            ctx.scheduler
                .spawn(async move { mirror_collection(unit_ctx, collection, items).await })
                .await;
        }
    }

    async fn fetch_collections(&self, ctx: &RunContext) -> Result<Vec<Collection>, FeedError> {
        let url = self.config.collection_feed_url();
        info!(url = %url, "fetching collection feed");
        let xml = ctx
            .persister
            .fetch_text(&url)
            .await
            .map_err(|e| FeedError::fetch(&url, e))?;
        Ok(parse_collections(&xml))
    }
}

async fn spawn_persist(ctx: &Arc<RunContext>, task: PersistTask) {
    let unit_ctx = Arc::clone(ctx);
    ctx.scheduler
        .spawn(async move {
            let outcome = unit_ctx.persister.run(task).await;
            unit_ctx.stats.record(outcome);
        })
        .await;
}

async fn schedule_collection_thumbnail(ctx: &Arc<RunContext>, collection: &Collection) {
    let Some(url) = collection.thumbnail_fetch_url() else {
        debug!(collection = %collection.id, "collection has no cover image");
        return;
    };
    match ctx.layout.collection_thumbnail(&collection.id) {
        Ok(dest) => spawn_persist(ctx, PersistTask::new(url, dest, &collection.updated)).await,
        Err(e) => {
            warn!(error = %e, "skipping collection thumbnail");
            ctx.stats.record_failure();
        }
    }
}

/// Fans out one unit per item thumbnail, then writes the collection page.
async fn mirror_collection(ctx: Arc<RunContext>, collection: Collection, items: Vec<Item>) {
    let page = match ctx.layout.collection_page(&collection.id) {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "skipping collection");
            ctx.stats.record_failure();
            return;
        }
    };

    for item in &items {
        let (Some(url), Some(file_name)) = (item.thumbnail_url(), item.file_name()) else {
            warn!(collection = %collection.id, item = %item.id, source = %item.source(), "item source has no usable file name");
            ctx.stats.record_failure();
            continue;
        };
        match ctx.layout.item_image(&collection.id, file_name) {
            Ok(dest) => spawn_persist(&ctx, PersistTask::new(url, dest, &item.updated)).await,
            Err(e) => {
                warn!(error = %e, "skipping item");
                ctx.stats.record_failure();
            }
        }
    }

    let markup = render_collection(&collection, &items);
    write_page(&ctx, &page, &markup).await;
}

async fn write_redirect(ctx: &RunContext) {
    let path: PathBuf = ctx.layout.redirect_page();
    let exists = tokio::fs::metadata(&path)
        .await
        .is_ok_and(|meta| meta.len() > 0);
    if exists {
        debug!(path = %path.display(), "redirect page present");
        return;
    }
    write_page(ctx, &path, &render_redirect()).await;
}

async fn write_page(ctx: &RunContext, path: &Path, markup: &Markup) {
    match ctx
        .persister
        .write_file(path, markup.0.as_bytes())
        .await
    {
        Ok(bytes) => {
            debug!(path = %path.display(), bytes, "page written");
            ctx.stats.record_page();
        }
        Err(e) if e.is_shutdown() => ctx.stats.record(PersistOutcome::Cancelled),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot write page");
            ctx.stats.record_failure();
        }
    }
}

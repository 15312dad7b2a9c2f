use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use walkdir::WalkDir;

use crate::events::InventoryEvent;

/// Recursively collects every photo under `root`.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_image(p))
        .collect()
}

#[instrument(skip(to_loader, cancel), fields(root = %root.display()))]
pub async fn run(
    root: PathBuf,
    to_loader: Sender<InventoryEvent>,
    cancel: CancellationToken,
    seed: Option<u64>,
) -> Result<()> {
    // 1) Startup scan, shuffled so the first frames differ between runs
    let mut initial = discover(&root);
    let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    initial.shuffle(&mut rng);
    for path in &initial {
        debug!(action = "startup_add", path = %path.display());
        let _ = to_loader.send(InventoryEvent::PhotoAdded(path.clone())).await;
    }
    info!(discovered = initial.len(), "startup scan complete");

    // 2) Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("watching photo library");

    // 3) Event loop
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting files task");
                break;
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) => {
                    for change in classify(&event) {
                        if to_loader.send(change).await.is_err() {
                            info!("loader gone; exiting files task");
                            return Ok(());
                        }
                    }
                }
                Err(err) => error!("watch error: {err}"),
            }
        }
    }
    Ok(())
}

/// Maps a filesystem notification to inventory changes.
fn classify(event: &Event) -> Vec<InventoryEvent> {
    let images = event.paths.iter().filter(|p| is_image(p)).cloned();
    match &event.kind {
        EventKind::Create(CreateKind::File) => images.map(InventoryEvent::PhotoAdded).collect(),
        EventKind::Remove(RemoveKind::File) => images.map(InventoryEvent::PhotoRemoved).collect(),
        // Moves are often reported as a bare rename; decide per path by existence.
        EventKind::Modify(ModifyKind::Name(_)) => images
            .map(|p| {
                if p.exists() {
                    InventoryEvent::PhotoAdded(p)
                } else {
                    InventoryEvent::PhotoRemoved(p)
                }
            })
            .collect(),
        _ => {
            debug!(kind = ?event.kind, "fs: ignored");
            Vec::new()
        }
    }
}

#[inline]
pub fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if ["jpg", "jpeg", "png", "webp", "gif"].contains(&e.as_str())
    )
}

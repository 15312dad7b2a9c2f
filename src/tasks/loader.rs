//! Texture manager backed by an async decode worker.
//!
//! Frames post requests through a [`LoaderHandle`]. The worker keeps the
//! requestors in FIFO order, decodes one photo at a time off the async
//! runtime and answers on the render dispatcher. With nobody waiting, one
//! photo is decoded ahead so the next request is served immediately.
//!
//! Photos are kept at their own aspect ratio until they are handed to a
//! requestor. Only then are they cropped to that frame and given its effect.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::select;
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::RenderDispatcher;
use crate::events::{InventoryEvent, RenderCommand};
use crate::processing::effects::{EffectKind, EffectPolicy, apply_effect};
use crate::processing::fit::{fit_to_frame, fit_within};
use crate::texture::{
    FrameId, ImageData, TextureDelivery, TextureManager, TextureOutcome, TextureRequest,
};

/// Decoded photos kept ready ahead of any request.
pub const READY_QUEUE_SIZE: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCommand {
    Request(TextureRequest),
    Cancel(FrameId),
    Invalidate { immediate: bool },
}

/// Render-thread side of the loader.
#[derive(Debug, Clone)]
pub struct LoaderHandle {
    tx: UnboundedSender<LoaderCommand>,
}

pub fn loader_channel() -> (LoaderHandle, UnboundedReceiver<LoaderCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LoaderHandle { tx }, rx)
}

impl LoaderHandle {
    fn post(&self, command: LoaderCommand) {
        if self.tx.send(command).is_err() {
            debug!("loader gone; command dropped");
        }
    }
}

impl TextureManager for LoaderHandle {
    fn request(&mut self, request: TextureRequest) {
        self.post(LoaderCommand::Request(request));
    }

    fn cancel_request(&mut self, requestor: FrameId) {
        self.post(LoaderCommand::Cancel(requestor));
    }

    fn invalidate_all(&mut self, immediate: bool) {
        self.post(LoaderCommand::Invalidate { immediate });
    }
}

/// Photos not shown yet in this cycle, and those already shown.
#[derive(Debug, Default)]
pub struct MediaPool {
    fresh: Vec<PathBuf>,
    used: Vec<PathBuf>,
}

impl MediaPool {
    pub fn add(&mut self, path: PathBuf) {
        if !self.fresh.contains(&path) && !self.used.contains(&path) {
            self.fresh.push(path);
        }
    }

    pub fn remove(&mut self, path: &Path) {
        self.fresh.retain(|p| p != path);
        self.used.retain(|p| p != path);
    }

    pub fn len(&self) -> usize {
        self.fresh.len() + self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Puts every shown photo back into rotation.
    pub fn recycle_used(&mut self) {
        self.fresh.append(&mut self.used);
    }

    /// A random photo not shown in this cycle; starts a new cycle when all
    /// have been shown.
    pub fn next(&mut self, rng: &mut impl Rng) -> Option<PathBuf> {
        if self.fresh.is_empty() {
            self.recycle_used();
        }
        if self.fresh.is_empty() {
            return None;
        }
        let path = self.fresh.swap_remove(rng.random_range(0..self.fresh.len()));
        self.used.push(path.clone());
        Some(path)
    }
}

/// A decoded photo with EXIF orientation applied, bounded by the decode size
/// but not yet fitted to any frame.
#[derive(Debug, Clone)]
pub struct DecodedPhoto {
    pub path: PathBuf,
    pub image: RgbaImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeJob {
    pub path: PathBuf,
    generation: u64,
}

/// A photo paired with the frame that receives it. The photo is cropped to
/// that frame's size only here, so a photo decoded ahead suits any frame.
#[derive(Debug)]
pub enum Handoff {
    Photo {
        request: TextureRequest,
        photo: DecodedPhoto,
        effect: Option<EffectKind>,
    },
    Unavailable(FrameId),
}

impl Handoff {
    pub fn requestor(&self) -> FrameId {
        match self {
            Handoff::Photo { request, .. } => request.requestor,
            Handoff::Unavailable(requestor) => *requestor,
        }
    }

    pub fn effect(&self) -> Option<EffectKind> {
        match self {
            Handoff::Photo { effect, .. } => *effect,
            Handoff::Unavailable(_) => None,
        }
    }

    /// Fits the photo to the requestor and applies its effect.
    pub fn into_delivery(self) -> TextureDelivery {
        match self {
            Handoff::Unavailable(requestor) => TextureDelivery {
                requestor,
                outcome: TextureOutcome::Unavailable,
            },
            Handoff::Photo {
                request,
                photo,
                effect,
            } => {
                let fitted = prepare_for_frame(&photo, request.width, request.height, effect);
                let outcome = match fitted {
                    Ok(image) => TextureOutcome::Ready(image),
                    Err(err) => {
                        warn!(path = %photo.path.display(), error = %err, "failed to fit photo");
                        TextureOutcome::Unavailable
                    }
                };
                TextureDelivery {
                    requestor: request.requestor,
                    outcome,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Largest size a photo is kept at between decode and handoff.
    pub max_decode: (u32, u32),
    pub effects: EffectPolicy,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_decode: (1920, 1080),
            effects: EffectPolicy::Disabled,
        }
    }
}

/// Request bookkeeping, independent of the async runtime.
#[derive(Debug)]
pub struct LoaderState {
    pending: VecDeque<TextureRequest>,
    ready: VecDeque<DecodedPhoto>,
    pool: MediaPool,
    generation: u64,
    decoding: bool,
    effects: EffectPolicy,
}

impl LoaderState {
    pub fn new(effects: EffectPolicy) -> Self {
        Self {
            pending: VecDeque::new(),
            ready: VecDeque::with_capacity(READY_QUEUE_SIZE),
            pool: MediaPool::default(),
            generation: 0,
            decoding: false,
            effects,
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.pending.iter().map(|r| r.requestor)
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn pool(&self) -> &MediaPool {
        &self.pool
    }

    fn handoff(&self, request: TextureRequest, photo: DecodedPhoto, rng: &mut impl Rng) -> Handoff {
        let effect = if request.effect {
            self.effects.pick(rng)
        } else {
            None
        };
        Handoff::Photo {
            request,
            photo,
            effect,
        }
    }

    /// Serves from the ready queue when possible, otherwise queues.
    pub fn request(&mut self, request: TextureRequest, rng: &mut impl Rng) -> Option<Handoff> {
        if let Some(photo) = self.ready.pop_front() {
            return Some(self.handoff(request, photo, rng));
        }
        if !self.pending.iter().any(|r| r.requestor == request.requestor) {
            self.pending.push_back(request);
        }
        None
    }

    pub fn cancel(&mut self, requestor: FrameId) {
        self.pending.retain(|r| r.requestor != requestor);
    }

    /// Drops decoded photos and any decode still running.
    pub fn invalidate(&mut self, immediate: bool) {
        self.ready.clear();
        self.generation += 1;
        if immediate {
            self.pool.recycle_used();
        }
    }

    pub fn inventory(&mut self, event: InventoryEvent) {
        match event {
            InventoryEvent::PhotoAdded(path) => self.pool.add(path),
            InventoryEvent::PhotoRemoved(path) => self.pool.remove(&path),
        }
    }

    /// Next photo to decode, if a decode is wanted and none is running.
    pub fn next_job(&mut self, rng: &mut impl Rng) -> Option<DecodeJob> {
        if self.decoding {
            return None;
        }
        if self.pending.is_empty() && self.ready.len() >= READY_QUEUE_SIZE {
            return None;
        }
        let path = self.pool.next(rng)?;
        self.decoding = true;
        Some(DecodeJob {
            path,
            generation: self.generation,
        })
    }

    /// Hands a finished decode to the oldest requestor, or keeps it ready.
    /// Failures reach the requestor too so it can ask again.
    pub fn complete(
        &mut self,
        job: &DecodeJob,
        result: Result<DecodedPhoto>,
        rng: &mut impl Rng,
    ) -> Option<Handoff> {
        self.decoding = false;
        let photo = match result {
            Ok(photo) => Some(photo),
            Err(err) => {
                warn!(path = %job.path.display(), error = %err, "dropping undecodable photo");
                self.pool.remove(&job.path);
                None
            }
        };
        if job.generation != self.generation {
            debug!(path = %job.path.display(), "discarding decode from before invalidation");
            return None;
        }
        match (self.pending.pop_front(), photo) {
            (Some(request), Some(photo)) => Some(self.handoff(request, photo, rng)),
            (Some(request), None) => Some(Handoff::Unavailable(request.requestor)),
            (None, Some(photo)) => {
                self.ready.push_back(photo);
                None
            }
            (None, None) => None,
        }
    }

    /// The decode task died without a result.
    pub fn abort_decode(&mut self) {
        self.decoding = false;
    }
}

// Decodes an image to RGBA8 and applies EXIF orientation if available.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let mut img = img.to_rgba8();

    match read_orientation(path).unwrap_or(1) {
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }
    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)? as u16;
    debug!(path = %path.display(), orientation = value, "exif orientation");
    Some(value)
}

/// Decodes `path` and scales it down to fit within `max_w` x `max_h`.
pub fn decode_photo(path: &Path, max_w: u32, max_h: u32) -> Result<DecodedPhoto> {
    let rgba = decode_rgba8_apply_exif(path)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(DecodedPhoto {
        path: path.to_path_buf(),
        image: fit_within(rgba, max_w, max_h)?,
    })
}

/// Crops `photo` to a `width` x `height` frame and applies `effect`.
pub fn prepare_for_frame(
    photo: &DecodedPhoto,
    width: u32,
    height: u32,
    effect: Option<EffectKind>,
) -> Result<ImageData> {
    let mut fitted = fit_to_frame(&photo.image, width, height)?;
    if let Some(effect) = effect {
        debug!(path = %photo.path.display(), %effect, "applying effect");
        apply_effect(&mut fitted, effect);
    }
    let (width, height) = fitted.dimensions();
    Ok(ImageData {
        path: photo.path.clone(),
        width,
        height,
        pixels: fitted.into_raw(),
    })
}

pub async fn run(
    mut commands: UnboundedReceiver<LoaderCommand>,
    mut inventory: Receiver<InventoryEvent>,
    to_render: RenderDispatcher,
    cancel: CancellationToken,
    settings: LoaderSettings,
    seed: Option<u64>,
) -> Result<()> {
    let (max_w, max_h) = settings.max_decode;
    let mut state = LoaderState::new(settings.effects);
    let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let mut decodes: JoinSet<(DecodeJob, Result<DecodedPhoto>)> = JoinSet::new();
    let mut fitting: JoinSet<TextureDelivery> = JoinSet::new();

    loop {
        if let Some(job) = state.next_job(&mut rng) {
            debug!(path = %job.path.display(), "decoding");
            decodes.spawn_blocking(move || {
                let result = decode_photo(&job.path, max_w, max_h);
                (job, result)
            });
        }

        let handoff = select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting loader task");
                break;
            }

            Some(command) = commands.recv() => match command {
                LoaderCommand::Request(request) => state.request(request, &mut rng),
                LoaderCommand::Cancel(requestor) => {
                    state.cancel(requestor);
                    None
                }
                LoaderCommand::Invalidate { immediate } => {
                    info!(immediate, "invalidating textures");
                    state.invalidate(immediate);
                    None
                }
            },

            Some(event) = inventory.recv() => {
                state.inventory(event);
                None
            }

            Some(joined) = decodes.join_next() => match joined {
                Ok((job, result)) => state.complete(&job, result, &mut rng),
                Err(err) => {
                    warn!(error = %err, "decode task failed");
                    state.abort_decode();
                    None
                }
            },

            Some(joined) = fitting.join_next() => {
                match joined {
                    Ok(delivery) => {
                        if !to_render.send(RenderCommand::TextureReady(delivery)) {
                            info!("render thread gone; exiting loader task");
                            break;
                        }
                    }
                    Err(err) => warn!(error = %err, "fit task failed"),
                }
                None
            }

            else => break,
        };

        if let Some(handoff) = handoff {
            debug!(frame = %handoff.requestor(), effect = ?handoff.effect(), "handing off photo");
            fitting.spawn_blocking(move || handoff.into_delivery());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::render_channel;
    use base64::Engine;
    use std::time::Duration;

    fn sized(id: u64, width: u32, height: u32) -> TextureRequest {
        TextureRequest {
            requestor: FrameId::new(id),
            width,
            height,
            effect: false,
        }
    }

    fn request(id: u64) -> TextureRequest {
        sized(id, 8, 8)
    }

    fn photo(path: &str, width: u32, height: u32) -> DecodedPhoto {
        DecodedPhoto {
            path: PathBuf::from(path),
            image: RgbaImage::from_pixel(width, height, image::Rgba([250, 250, 250, 255])),
        }
    }

    fn state_with(paths: &[&str]) -> LoaderState {
        let mut state = LoaderState::new(EffectPolicy::Disabled);
        for p in paths {
            state.inventory(InventoryEvent::PhotoAdded(PathBuf::from(p)));
        }
        state
    }

    fn delivered_size(handoff: Handoff) -> (u32, u32) {
        match handoff.into_delivery().outcome {
            TextureOutcome::Ready(image) => (image.width, image.height),
            TextureOutcome::Unavailable => panic!("photo was not delivered"),
        }
    }

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    #[test]
    fn applies_orientation_six() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orient6.jpg");
        std::fs::write(&path, &bytes).unwrap();
        let img = decode_rgba8_apply_exif(&path).unwrap();
        assert_eq!(img.dimensions(), (1, 2));
    }

    #[test]
    fn decoded_photos_are_bounded_but_keep_their_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("square.png");
        RgbaImage::from_pixel(400, 400, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();
        let decoded = decode_photo(&path, 160, 90).unwrap();
        assert_eq!(decoded.image.dimensions(), (90, 90));
    }

    #[test]
    fn requestors_are_served_in_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = state_with(&["a.jpg"]);
        assert!(state.request(request(1), &mut rng).is_none());
        assert!(state.request(request(2), &mut rng).is_none());

        let job = state.next_job(&mut rng).unwrap();
        assert!(state.next_job(&mut rng).is_none(), "one decode at a time");
        let first = state
            .complete(&job, Ok(photo("a.jpg", 16, 16)), &mut rng)
            .unwrap();
        assert_eq!(first.requestor(), FrameId::new(1));

        let job = state.next_job(&mut rng).unwrap();
        let second = state
            .complete(&job, Ok(photo("a.jpg", 16, 16)), &mut rng)
            .unwrap();
        assert_eq!(second.requestor(), FrameId::new(2));
    }

    #[test]
    fn decodes_ahead_and_serves_from_ready_queue() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = state_with(&["a.jpg"]);
        let job = state.next_job(&mut rng).unwrap();
        assert!(
            state
                .complete(&job, Ok(photo("a.jpg", 16, 16)), &mut rng)
                .is_none()
        );
        assert_eq!(state.ready_len(), READY_QUEUE_SIZE);
        assert!(state.next_job(&mut rng).is_none(), "ready queue is full");

        let handoff = state.request(request(5), &mut rng).unwrap();
        assert_eq!(handoff.requestor(), FrameId::new(5));
        assert_eq!(delivered_size(handoff), (8, 8));
        assert_eq!(state.ready_len(), 0);
    }

    #[test]
    fn ready_photo_is_cropped_to_the_frame_that_takes_it() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = state_with(&["square.png"]);
        let job = state.next_job(&mut rng).unwrap();
        assert!(
            state
                .complete(&job, Ok(photo("square.png", 400, 400)), &mut rng)
                .is_none()
        );

        let tall = state.request(sized(3, 50, 200), &mut rng).unwrap();
        assert_eq!(delivered_size(tall), (50, 200));
    }

    #[test]
    fn decode_follows_the_requestor_left_after_a_cancel() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = state_with(&["square.png"]);
        state.request(sized(1, 50, 200), &mut rng);
        state.request(sized(2, 120, 30), &mut rng);
        let job = state.next_job(&mut rng).unwrap();
        state.cancel(FrameId::new(1));

        let handoff = state
            .complete(&job, Ok(photo("square.png", 400, 400)), &mut rng)
            .unwrap();
        assert_eq!(handoff.requestor(), FrameId::new(2));
        assert_eq!(delivered_size(handoff), (120, 30));
    }

    #[test]
    fn effects_reach_only_flagged_requestors() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = LoaderState::new(EffectPolicy::Restricted(vec![EffectKind::Negative]));
        for p in ["a.jpg", "b.jpg"] {
            state.inventory(InventoryEvent::PhotoAdded(PathBuf::from(p)));
        }
        state.request(
            TextureRequest {
                effect: true,
                ..request(1)
            },
            &mut rng,
        );
        state.request(request(2), &mut rng);

        let job = state.next_job(&mut rng).unwrap();
        let flagged = state
            .complete(&job, Ok(photo("a.jpg", 8, 8)), &mut rng)
            .unwrap();
        assert_eq!(flagged.effect(), Some(EffectKind::Negative));
        match flagged.into_delivery().outcome {
            TextureOutcome::Ready(image) => assert_eq!(&image.pixels[..4], &[5, 5, 5, 255]),
            TextureOutcome::Unavailable => panic!("photo was not delivered"),
        }

        let job = state.next_job(&mut rng).unwrap();
        let plain = state
            .complete(&job, Ok(photo("b.jpg", 8, 8)), &mut rng)
            .unwrap();
        assert_eq!(plain.effect(), None);
    }

    #[test]
    fn failures_reach_the_requestor_and_leave_the_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = state_with(&["broken.jpg"]);
        state.request(request(1), &mut rng);
        let job = state.next_job(&mut rng).unwrap();
        let delivery = state
            .complete(&job, Err(anyhow::anyhow!("bad data")), &mut rng)
            .unwrap()
            .into_delivery();
        assert_eq!(delivery.requestor, FrameId::new(1));
        assert_eq!(delivery.outcome, TextureOutcome::Unavailable);
        assert!(state.pool().is_empty());
    }

    #[test]
    fn cancelled_requestor_is_skipped() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = state_with(&["a.jpg"]);
        state.request(request(1), &mut rng);
        state.request(request(2), &mut rng);
        state.cancel(FrameId::new(1));
        let job = state.next_job(&mut rng).unwrap();
        let handoff = state
            .complete(&job, Ok(photo("a.jpg", 16, 16)), &mut rng)
            .unwrap();
        assert_eq!(handoff.requestor(), FrameId::new(2));
    }

    #[test]
    fn invalidation_discards_running_decode() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = state_with(&["a.jpg"]);
        state.request(request(1), &mut rng);
        let job = state.next_job(&mut rng).unwrap();
        state.invalidate(false);
        assert!(
            state
                .complete(&job, Ok(photo("a.jpg", 16, 16)), &mut rng)
                .is_none()
        );
        assert_eq!(state.pending().collect::<Vec<_>>(), vec![FrameId::new(1)]);
        let job = state.next_job(&mut rng).unwrap();
        assert!(
            state
                .complete(&job, Ok(photo("a.jpg", 16, 16)), &mut rng)
                .is_some()
        );
    }

    #[test]
    fn pool_shows_every_photo_before_repeating() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut pool = MediaPool::default();
        for p in ["a", "b", "c"] {
            pool.add(PathBuf::from(p));
        }
        pool.add(PathBuf::from("a"));
        let mut cycle: Vec<_> = (0..3).map(|_| pool.next(&mut rng).unwrap()).collect();
        cycle.sort();
        assert_eq!(cycle, vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]);
        assert!(pool.next(&mut rng).is_some());
        assert_eq!(pool.len(), 3);
    }

    #[tokio::test]
    async fn delivers_decoded_photo_to_render_queue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        RgbaImage::from_pixel(40, 20, image::Rgba([200, 10, 10, 255]))
            .save(&path)
            .unwrap();

        let (mut handle, commands) = loader_channel();
        let (inv_tx, inv_rx) = mpsc::channel(4);
        let (dispatcher, queue) = render_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            commands,
            inv_rx,
            dispatcher,
            cancel.clone(),
            LoaderSettings {
                max_decode: (32, 32),
                effects: EffectPolicy::Disabled,
            },
            Some(3),
        ));

        inv_tx
            .send(InventoryEvent::PhotoAdded(path.clone()))
            .await
            .unwrap();
        handle.request(TextureRequest {
            requestor: FrameId::new(42),
            width: 10,
            height: 6,
            effect: false,
        });

        let mut delivered = None;
        for _ in 0..200 {
            if let Some(RenderCommand::TextureReady(d)) = queue.drain().next() {
                delivered = Some(d);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        task.await.unwrap().unwrap();

        let delivery = delivered.expect("no delivery");
        assert_eq!(delivery.requestor, FrameId::new(42));
        match delivery.outcome {
            TextureOutcome::Ready(image) => {
                assert_eq!(image.path, path);
                assert_eq!((image.width, image.height), (10, 6));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

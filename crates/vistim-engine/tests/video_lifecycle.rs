use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use vistim_engine::texture::{
    GpuTexture, GpuTextureId, GpuUploader, ImageOptions, MipLevel, TextureDesc, TextureError,
    TextureHandle, TextureKey, TextureManager,
};
use vistim_engine::video::{
    VideoCommand, VideoConfig, VideoError, VideoFeed, VideoOptions, VideoState,
};

// ── fake GPU ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    updates: AtomicUsize,
    live: AtomicUsize,
}

struct FakeUploader {
    counters: Arc<Counters>,
    next_id: AtomicU32,
}

struct FakeTexture {
    id: GpuTextureId,
    counters: Arc<Counters>,
}

impl FakeUploader {
    fn new() -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let up = Self { counters: Arc::clone(&counters), next_id: AtomicU32::new(0) };
        (up, counters)
    }
}

impl GpuUploader for FakeUploader {
    fn create_texture(
        &self,
        desc: &TextureDesc<'_>,
        data: &[u8],
    ) -> Result<Box<dyn GpuTexture>, TextureError> {
        let total: usize = desc.levels.iter().map(MipLevel::byte_len).sum();
        assert_eq!(total, data.len());
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_add(1, Ordering::SeqCst);
        let raw = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(FakeTexture {
            id: GpuTextureId::new(raw).unwrap(),
            counters: Arc::clone(&self.counters),
        }))
    }
}

impl GpuTexture for FakeTexture {
    fn id(&self) -> GpuTextureId {
        self.id
    }

    fn update_level(&self, _level: &MipLevel, _data: &[u8]) -> Result<(), TextureError> {
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for FakeTexture {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn scratch_png(name: &str, w: u32, h: u32) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vistim-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let img = image::RgbaImage::from_fn(w, h, |x, y| image::Rgba([x as u8, y as u8, 0x80, 0xff]));
    img.save(&path).unwrap();
    path
}

fn wait_for_state(textures: &TextureManager, video: &TextureHandle, state: VideoState) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if textures.video_state(video) == Some(state) {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

// ── images ────────────────────────────────────────────────────────────────

#[test]
fn image_loaded_twice_is_destroyed_after_two_releases() {
    let textures = TextureManager::new();
    let (up, counters) = FakeUploader::new();
    let path = scratch_png("twice.png", 16, 8);

    let first = textures.load_image(&path, ImageOptions::default()).unwrap();
    let second = textures.load_image(&path, ImageOptions::default()).unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(textures.len(), 1);
    assert_eq!(textures.refcount(first.key()), Some(2));
    assert_eq!(first.size(), Some((16, 8)));

    let id = textures.bind(&first, &up).unwrap();
    assert!(id.is_some());
    assert_eq!(textures.bind(&second, &up).unwrap(), id);
    assert_eq!(counters.created.load(Ordering::SeqCst), 1);

    let key = first.key().clone();
    textures.release(first);
    assert!(textures.contains(&key));
    assert_eq!(counters.live.load(Ordering::SeqCst), 1);

    textures.release(second);
    assert!(!textures.contains(&key));
    assert!(textures.is_empty());
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_image_leaves_no_entity() {
    let textures = TextureManager::new();
    let path = std::env::temp_dir().join("vistim-tests-does-not-exist.png");
    assert!(textures.load_image(&path, ImageOptions::default()).is_err());
    assert!(textures.is_empty());
}

// ── refcounts ─────────────────────────────────────────────────────────────

#[test]
fn concurrent_acquires_share_one_entity() {
    let textures = TextureManager::new();
    let key = TextureKey::new("SHARED");

    let handles: Vec<_> = thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let textures = &textures;
                let key = key.clone();
                s.spawn(move || textures.acquire(key).unwrap())
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(handles.iter().filter(|a| a.fresh).count(), 1);
    let id = handles[0].handle.id();
    assert!(handles.iter().all(|a| a.handle.id() == id));
    assert_eq!(textures.refcount(&key), Some(8));

    drop(handles);
    assert!(textures.is_empty());
}

#[test]
fn concurrent_clone_and_drop_loses_no_update() {
    let textures = TextureManager::new();
    let key = TextureKey::new("CHURN");
    let anchor = textures.acquire(key.clone()).unwrap().handle;

    thread::scope(|s| {
        for _ in 0..4 {
            let anchor = &anchor;
            s.spawn(move || {
                for _ in 0..500 {
                    let extra = anchor.clone();
                    drop(extra);
                }
            });
        }
    });

    assert_eq!(textures.refcount(&key), Some(1));
    drop(anchor);
    assert!(!textures.contains(&key));
}

// ── video ─────────────────────────────────────────────────────────────────

#[test]
fn test_pattern_plays_then_stops() {
    let textures = TextureManager::new();
    let _lease = textures.attach().unwrap();
    let (up, counters) = FakeUploader::new();

    let video = textures.create_video(&VideoFeed::Test, VideoOptions::autostart()).unwrap();
    assert_eq!(textures.video_state(&video), Some(VideoState::Playing));
    assert!(video.size().is_some());

    assert!(textures.bind(&video, &up).unwrap().is_some());
    assert_eq!(counters.created.load(Ordering::SeqCst), 1);

    textures.exec(&video, VideoCommand::Stop).unwrap();
    assert_eq!(textures.video_state(&video), Some(VideoState::Stopped));

    drop(video);
    assert!(textures.is_empty());
    assert_eq!(counters.live.load(Ordering::SeqCst), 0);
}

#[test]
fn pause_then_play_resumes() {
    let textures = TextureManager::new();
    let video = textures.create_video(&VideoFeed::Test, VideoOptions::autostart()).unwrap();

    textures.exec(&video, VideoCommand::Pause).unwrap();
    assert_eq!(textures.video_state(&video), Some(VideoState::Paused));
    textures.exec(&video, VideoCommand::Play).unwrap();
    assert_eq!(textures.video_state(&video), Some(VideoState::Playing));

    textures.exec(&video, VideoCommand::Stop).unwrap();
}

#[test]
fn pause_racing_the_first_frame_ends_playing() {
    let textures = TextureManager::new();
    let options = VideoOptions {
        autostart: false,
        config: VideoConfig { wait_for_preroll: false, ..VideoConfig::default() },
    };

    for _ in 0..50 {
        let video = textures.create_video(&VideoFeed::Test, options).unwrap();
        textures.exec(&video, VideoCommand::Play).unwrap();
        // Rejected while still `Ready`, accepted once the first frame landed.
        let _ = textures.exec(&video, VideoCommand::Pause);
        textures.exec(&video, VideoCommand::Play).unwrap();

        assert!(wait_for_state(&textures, &video, VideoState::Playing));
        textures.exec(&video, VideoCommand::Stop).unwrap();
        drop(video);
        assert!(textures.is_empty());
    }
}

#[test]
fn finished_clip_can_be_seeked_and_replayed() {
    let textures = TextureManager::new();
    let feed = VideoFeed::Custom("videotestsrc num-buffers=3 framerate=200 width=8 height=8".into());
    let video = textures.create_video(&feed, VideoOptions::autostart()).unwrap();
    assert!(wait_for_state(&textures, &video, VideoState::Stopped));

    // Past the end the restarted clip has no frame left to show.
    textures.exec(&video, VideoCommand::Seek(Duration::from_secs(10))).unwrap();
    assert!(matches!(
        textures.exec(&video, VideoCommand::Play),
        Err(VideoError::PrerollFailed)
    ));
    assert_eq!(textures.video_state(&video), Some(VideoState::Stopped));

    textures.exec(&video, VideoCommand::seek_ms(0)).unwrap();
    textures.exec(&video, VideoCommand::Play).unwrap();
    assert!(wait_for_state(&textures, &video, VideoState::Stopped));
}

#[test]
fn pause_while_stopped_is_rejected() {
    let textures = TextureManager::new();
    let video = textures.create_video(&VideoFeed::Test, VideoOptions::default()).unwrap();
    assert_eq!(textures.video_state(&video), Some(VideoState::Stopped));
    assert!(textures.exec(&video, VideoCommand::Pause).is_err());
    assert_eq!(textures.video_state(&video), Some(VideoState::Stopped));
}

#[test]
fn same_feed_returns_the_same_pipeline() {
    let textures = TextureManager::new();
    let a = textures.create_video(&VideoFeed::Test, VideoOptions::default()).unwrap();
    let b = textures.create_video(&VideoFeed::Test, VideoOptions::default()).unwrap();
    assert_eq!(a.id(), b.id());

    let pa = textures.video(&a).unwrap();
    let pb = textures.video(&b).unwrap();
    assert_eq!(pa.name(), pb.name());
}

#[test]
fn unreadable_file_feed_fails_without_an_entity() {
    let textures = TextureManager::new();
    let feed = VideoFeed::File(std::env::temp_dir().join("vistim-tests-no-such-movie.gif"));
    assert!(textures.create_video(&feed, VideoOptions::autostart()).is_err());
    assert!(textures.is_empty());
}

#[test]
fn image_file_feed_prerolls() {
    let textures = TextureManager::new();
    let path = scratch_png("still.png", 8, 4);
    let video = textures
        .create_video(&VideoFeed::File(path), VideoOptions::autostart())
        .unwrap();
    assert_eq!(video.size(), Some((8, 4)));
    textures.exec(&video, VideoCommand::Stop).unwrap();
}

#[test]
fn dropping_a_playing_video_joins_its_threads() {
    let textures = TextureManager::new();
    let video = textures.create_video(&VideoFeed::Test, VideoOptions::autostart()).unwrap();
    let pipeline = textures.video(&video).unwrap();

    drop(video);
    assert!(textures.is_empty());
    assert_eq!(pipeline.state(), VideoState::Stopped);
}

#[test]
fn exec_on_an_image_is_rejected() {
    let textures = TextureManager::new();
    let path = scratch_png("not-a-video.png", 4, 4);
    let image = textures.load_image(&path, ImageOptions::default()).unwrap();
    assert!(textures.exec(&image, VideoCommand::Play).is_err());
    assert_eq!(textures.video_state(&image), None);
}

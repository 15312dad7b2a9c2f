mod support;

use std::time::{Duration, Instant};

use photophase::config::LayoutConfig;
use photophase::dispatch::RenderMode;
use photophase::events::RenderCommand;
use photophase::renderer::{MIN_TRANSITION_DELAY, RendererSettings, WallpaperRenderer};
use photophase::texture::FrameId;
use photophase::world::geometry::GridSize;
use photophase::world::scheduler::KindPolicy;
use photophase::world::{LayoutPolicy, World, WorldSettings};
use rand::SeedableRng;
use rand::rngs::StdRng;
use support::{RecordingGpu, ScriptedTextures, ready};

fn world(layout: LayoutPolicy) -> World {
    World::new(
        WorldSettings {
            grid: GridSize { cols: 4, rows: 7 },
            layout,
            kinds: KindPolicy::Random,
            frame_spacer: true,
        },
        StdRng::seed_from_u64(21),
    )
}

fn fixed_layout() -> LayoutPolicy {
    let layout = LayoutConfig::default();
    LayoutPolicy::Fixed {
        portrait: layout.portrait_disposition,
        landscape: layout.landscape_disposition,
    }
}

fn renderer(settings: RendererSettings) -> WallpaperRenderer<ScriptedTextures> {
    WallpaperRenderer::new(world(fixed_layout()), ScriptedTextures::default(), settings)
}

fn deliver_all(
    r: &mut WallpaperRenderer<ScriptedTextures>,
    gpu: &mut RecordingGpu,
    answered: &mut Vec<FrameId>,
    now: Instant,
) {
    let outstanding = r.textures().outstanding(answered);
    for id in outstanding {
        answered.push(id);
        r.handle(RenderCommand::TextureReady(ready(id, "p.jpg")), gpu, now);
    }
}

fn frame_ids(r: &WallpaperRenderer<ScriptedTextures>) -> Vec<FrameId> {
    r.world().frames().iter().map(|f| f.id()).collect()
}

#[test]
fn first_transition_waits_the_minimum_delay_then_the_interval() {
    let mut gpu = RecordingGpu::default();
    let mut answered = Vec::new();
    let mut r = renderer(RendererSettings::default());
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    deliver_all(&mut r, &mut gpu, &mut answered, t0);

    let out = r.draw_frame(&mut gpu, t0);
    assert_eq!(out.mode, RenderMode::WhenDirty);
    assert_eq!(r.next_transition_at(), Some(t0 + MIN_TRANSITION_DELAY));
    assert_eq!(out.wake_at, Some(t0 + MIN_TRANSITION_DELAY));

    assert!(!r.tick(&mut gpu, t0 + Duration::from_millis(100)));
    assert_eq!(r.world().current(), None);

    let start = t0 + MIN_TRANSITION_DELAY;
    assert!(r.tick(&mut gpu, start));
    assert!(r.world().current().is_some());
    assert_eq!(r.mode(), RenderMode::Continuously);

    deliver_all(&mut r, &mut gpu, &mut answered, start);
    let out = r.draw_frame(&mut gpu, start);
    assert_eq!(out.mode, RenderMode::Continuously);

    let done = start + Duration::from_secs(2);
    let out = r.draw_frame(&mut gpu, done);
    assert_eq!(out.mode, RenderMode::WhenDirty);
    assert_eq!(r.world().current(), None);
    // The interval counts from the start of the previous transition.
    assert_eq!(
        r.next_transition_at(),
        Some(done + Duration::from_secs(10) - Duration::from_secs(2))
    );
}

#[test]
fn missing_replacement_times_out_and_is_abandoned() {
    let mut gpu = RecordingGpu::default();
    let mut answered = Vec::new();
    let mut r = renderer(RendererSettings {
        interval: Duration::ZERO,
        ..RendererSettings::default()
    });
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    deliver_all(&mut r, &mut gpu, &mut answered, t0);
    let before = frame_ids(&r);

    r.handle(RenderCommand::Touch { x: 50.0, y: 50.0 }, &mut gpu, t0);
    let out = r.draw_frame(&mut gpu, t0);
    assert_eq!(out.mode, RenderMode::Continuously);
    let replacement = r.textures().last_requestor().unwrap();
    assert!(!before.contains(&replacement));

    let out = r.draw_frame(&mut gpu, t0 + Duration::from_secs(1));
    assert_eq!(out.mode, RenderMode::Continuously);

    let out = r.draw_frame(&mut gpu, t0 + Duration::from_millis(2600));
    assert_eq!(out.mode, RenderMode::WhenDirty);
    assert_eq!(r.world().current(), None);
    assert!(r.textures().cancelled.contains(&replacement));
    assert_eq!(frame_ids(&r), before, "the old frames stay");
    assert_eq!(out.wake_at, None, "a zero interval never schedules");
}

#[test]
fn touch_is_ignored_when_disabled() {
    let mut gpu = RecordingGpu::default();
    let mut r = renderer(RendererSettings {
        interval: Duration::ZERO,
        touch_transition: false,
        ..RendererSettings::default()
    });
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    r.handle(RenderCommand::Touch { x: 50.0, y: 50.0 }, &mut gpu, t0);
    r.draw_frame(&mut gpu, t0);
    assert_eq!(r.world().current(), None);
}

#[test]
fn pause_stops_scheduling_until_resume() {
    let mut gpu = RecordingGpu::default();
    let mut r = renderer(RendererSettings::default());
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    r.handle(RenderCommand::Pause, &mut gpu, t0);
    assert!(r.is_paused());

    let out = r.draw_frame(&mut gpu, t0);
    assert_eq!(out.wake_at, None);
    assert!(!r.tick(&mut gpu, t0 + Duration::from_secs(60)));
    assert_eq!(r.world().current(), None);

    let later = t0 + Duration::from_secs(61);
    r.handle(RenderCommand::Resume, &mut gpu, later);
    assert!(r.needs_redraw());
    let out = r.draw_frame(&mut gpu, later);
    assert_eq!(out.wake_at, Some(later + MIN_TRANSITION_DELAY));
}

#[test]
fn memory_and_reload_commands_reach_the_texture_manager() {
    let mut gpu = RecordingGpu::default();
    let mut r = renderer(RendererSettings::default());
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    let before = frame_ids(&r);

    r.handle(RenderCommand::LowMemory, &mut gpu, t0);
    assert_eq!(r.textures().invalidations, vec![false]);
    assert_eq!(frame_ids(&r), before);

    r.handle(RenderCommand::ReloadMedia, &mut gpu, t0);
    assert_eq!(r.textures().invalidations, vec![false, true]);
    let after = frame_ids(&r);
    assert_eq!(after.len(), before.len());
    assert!(after.iter().all(|id| !before.contains(id)));
}

#[test]
fn recycle_command_tears_the_world_down() {
    let mut gpu = RecordingGpu::default();
    let mut answered = Vec::new();
    let mut r = renderer(RendererSettings::default());
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    deliver_all(&mut r, &mut gpu, &mut answered, t0);
    assert!(!gpu.live.is_empty());

    r.handle(RenderCommand::Recycle, &mut gpu, t0);
    assert!(r.world().is_recycled());
    assert!(gpu.live.is_empty());
    assert_eq!(r.next_transition_at(), None);
}

#[test]
fn random_layouts_are_replaced_on_the_relayout_timer() {
    let layout = LayoutConfig::default();
    let mut gpu = RecordingGpu::default();
    let mut r = WallpaperRenderer::new(
        world(LayoutPolicy::Random {
            portrait: layout.portrait_templates,
            landscape: layout.landscape_templates,
        }),
        ScriptedTextures::default(),
        RendererSettings {
            interval: Duration::ZERO,
            relayout_interval: Duration::from_secs(30),
            ..RendererSettings::default()
        },
    );
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    let before = frame_ids(&r);
    let out = r.draw_frame(&mut gpu, t0);
    assert_eq!(out.wake_at, Some(t0 + Duration::from_secs(30)));

    assert!(r.tick(&mut gpu, t0 + Duration::from_secs(30)));
    let after = frame_ids(&r);
    assert!(after.iter().all(|id| !before.contains(id)));
}

fn running_transitions(r: &WallpaperRenderer<ScriptedTextures>) -> usize {
    r.world()
        .transitions()
        .iter()
        .filter(|t| t.is_running())
        .count()
}

#[test]
fn at_most_one_transition_runs_through_a_busy_session() {
    let mut gpu = RecordingGpu::default();
    let mut answered = Vec::new();
    let mut r = renderer(RendererSettings {
        interval: Duration::from_secs(3),
        ..RendererSettings::default()
    });
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);

    let touches = [(50.0, 50.0), (350.0, 650.0), (300.0, 100.0)];
    let mut started = 0;
    for step in 0..600u32 {
        let now = t0 + Duration::from_millis(100) * step;
        // Images arrive in four second windows, so some replacements time out.
        if (step / 40) % 2 == 0 {
            deliver_all(&mut r, &mut gpu, &mut answered, now);
            assert!(running_transitions(&r) <= 1);
        }
        if step % 13 == 0 {
            let (x, y) = touches[(step / 13) as usize % touches.len()];
            r.handle(RenderCommand::Touch { x, y }, &mut gpu, now);
            assert!(running_transitions(&r) <= 1);
        }
        let before = r.world().current();
        r.tick(&mut gpu, now);
        assert!(running_transitions(&r) <= 1, "after tick at step {step}");
        r.draw_frame(&mut gpu, now);
        assert!(running_transitions(&r) <= 1, "after draw at step {step}");
        if before.is_none() && r.world().current().is_some() {
            started += 1;
        }
    }
    assert!(started > 5, "only {started} transitions started");
    assert!(!r.textures().cancelled.is_empty(), "no transition was abandoned");
}

#[test]
fn paused_renderer_only_draws() {
    let mut gpu = RecordingGpu::default();
    let mut answered = Vec::new();
    let mut r = renderer(RendererSettings {
        interval: Duration::ZERO,
        ..RendererSettings::default()
    });
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    deliver_all(&mut r, &mut gpu, &mut answered, t0);

    r.handle(RenderCommand::Touch { x: 50.0, y: 50.0 }, &mut gpu, t0);
    r.handle(RenderCommand::Pause, &mut gpu, t0);
    gpu.commands.clear();
    let out = r.draw_frame(&mut gpu, t0);
    assert!(!gpu.commands.is_empty(), "frames are still drawn");
    assert_eq!(out.mode, RenderMode::WhenDirty);
    assert_eq!(r.world().current(), None, "queued touch waits for resume");

    let later = t0 + Duration::from_secs(1);
    r.handle(RenderCommand::Resume, &mut gpu, later);
    let out = r.draw_frame(&mut gpu, later);
    assert!(r.world().current().is_some());
    assert_eq!(out.mode, RenderMode::Continuously);
}

#[test]
fn tapping_a_frame_mid_transition_follows_its_replacement() {
    let mut gpu = RecordingGpu::default();
    let mut answered = Vec::new();
    let mut r = renderer(RendererSettings {
        interval: Duration::ZERO,
        ..RendererSettings::default()
    });
    let t0 = Instant::now();
    r.handle(RenderCommand::SurfaceChanged { width: 400, height: 700 }, &mut gpu, t0);
    deliver_all(&mut r, &mut gpu, &mut answered, t0);

    r.handle(RenderCommand::Touch { x: 50.0, y: 50.0 }, &mut gpu, t0);
    r.draw_frame(&mut gpu, t0);
    let index = r.world().current().expect("touch started a transition");
    let tapped = r.world().frames()[index].id();
    deliver_all(&mut r, &mut gpu, &mut answered, t0);

    let mid = t0 + Duration::from_millis(100);
    r.draw_frame(&mut gpu, mid);
    r.handle(RenderCommand::Touch { x: 50.0, y: 50.0 }, &mut gpu, mid);

    let done = t0 + Duration::from_millis(2100);
    let out = r.draw_frame(&mut gpu, done);
    assert_eq!(out.mode, RenderMode::Continuously);
    assert_eq!(r.world().current(), Some(index));
    let replacement = r.world().frames()[index].id();
    assert_ne!(replacement, tapped);
    assert_eq!(r.world().frame_at(glam::Vec2::new(50.0, 50.0)).map(|f| f.id()), Some(replacement));
}

mod common;

use avatar_viewer::controls::PointerState;
use avatar_viewer::{FrameScheduler, RenderLoop, SceneConfig, SceneHost, TickStatus};
use common::{avatar, ManualLoader, MockSurface, MockTarget};

#[derive(Default)]
struct CountingScheduler {
    requests: usize,
}

impl FrameScheduler for CountingScheduler {
    fn request_frame(&mut self) {
        self.requests += 1;
    }
}

fn host(loader: &ManualLoader) -> SceneHost<MockSurface> {
    let mut target = MockTarget::new(1.0);
    SceneHost::new(&mut target, 800, 600, &SceneConfig::default(), Box::new(loader.clone())).unwrap()
}

#[cfg(test)]
mod render_loop_tests {
    use super::*;

    #[test]
    fn test_tick_rearms_and_renders() {
        let mut host = host(&ManualLoader::default());
        let mut render_loop = RenderLoop::new(CountingScheduler::default());

        for expected in 0..3u64 {
            let status = render_loop.tick(&mut host, &PointerState::default()).unwrap();
            match status {
                TickStatus::Rendered(frame) => assert_eq!(frame.number, expected),
                TickStatus::Stopped => panic!("loop stopped unexpectedly"),
            }
        }

        assert_eq!(render_loop.scheduler().requests, 3);
        assert_eq!(host.surface().renders, 3);
    }

    #[test]
    fn test_tick_applies_finished_load() {
        let loader = ManualLoader::default();
        let mut host = host(&loader);
        let mut render_loop = RenderLoop::new(CountingScheduler::default());

        render_loop.tick(&mut host, &PointerState::default()).unwrap();
        assert!(host.active_model().is_none());

        loader.resolve(Ok(avatar()));
        render_loop.tick(&mut host, &PointerState::default()).unwrap();

        assert!(host.active_model().is_some());
        assert_eq!(host.scene().children(host.scene().root()).len(), 4);
    }

    #[test]
    fn test_failed_load_does_not_stop_rendering() {
        let loader = ManualLoader::default();
        let mut host = host(&loader);
        let mut render_loop = RenderLoop::new(CountingScheduler::default());

        loader.abandon();
        let status = render_loop.tick(&mut host, &PointerState::default()).unwrap();

        assert!(matches!(status, TickStatus::Rendered(_)));
        assert_eq!(host.surface().renders, 1);
    }

    #[test]
    fn test_stopped_loop_neither_rearms_nor_renders() {
        let mut host = host(&ManualLoader::default());
        let mut render_loop = RenderLoop::new(CountingScheduler::default());
        render_loop.tick(&mut host, &PointerState::default()).unwrap();

        render_loop.handle().stop();
        let status = render_loop.tick(&mut host, &PointerState::default()).unwrap();

        assert_eq!(status, TickStatus::Stopped);
        assert_eq!(render_loop.scheduler().requests, 1);
        assert_eq!(host.surface().renders, 1);
    }

    #[test]
    fn test_tick_feeds_pointer_to_controls() {
        let mut host = host(&ManualLoader::default());
        let mut render_loop = RenderLoop::new(CountingScheduler::default());
        let before = host.camera().position;

        let pointer = PointerState {
            scroll: 3.0,
            ..PointerState::default()
        };
        render_loop.tick(&mut host, &pointer).unwrap();

        let target = host.controls().target;
        assert!(host.camera().position.distance(target) < before.distance(target));
    }
}

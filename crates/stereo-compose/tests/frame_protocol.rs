// SPDX-License-Identifier: CEPL-1.0
mod common;

use common::*;
use stereo_compose::sizer::{recommended_render_size, FramebufferSizer};
use stereo_compose::{
    Buttons, CompositorConfig, ControllerState, FrameOutcome, TimePoint, ViewMode, ViewerKind,
};
use stereo_math::{PixelRect, Size2D, UvRect};
use stereo_render::{ColorFormat, DepthStencilFormat, Eye, GraphicsDevice};

fn protocol_step(call: &Call) -> Option<&'static str> {
    Some(match call {
        Call::ControllerUpdate => "input",
        Call::Resize(..) => "resize",
        Call::Acquire => "acquire",
        Call::HeadPose(_) => "pose",
        Call::RecommendedViewports => "viewports",
        Call::Update(_) => "update",
        Call::Bind(_) => "bind",
        Call::Render(_) => "render",
        Call::Unbind => "unbind",
        Call::Submit(..) => "submit",
        _ => return None,
    })
}

#[test]
fn test_frame_steps_run_in_order() {
    let (mut session, h) = session(Options::default());

    assert_eq!(session.render_frame(), FrameOutcome::Presented);

    let steps: Vec<_> = h.journal.calls().iter().filter_map(protocol_step).collect();
    assert_eq!(
        steps,
        [
            "input", "acquire", "pose", "viewports", "update", "bind", "render", "unbind",
            "submit"
        ]
    );
    assert!(h.journal.calls().contains(&Call::Bind(0)));
}

#[test]
fn test_graphics_init_allocates_primary_and_overlay() {
    let (parts, h) = parts(Options::default());
    let mut session = stereo_compose::Session::create(parts).unwrap();
    session.initialize_graphics().unwrap();

    let specs = h
        .journal
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::CreateSwapchain(specs) => Some(specs),
            _ => None,
        })
        .expect("swapchain created");
    assert_eq!(specs.len(), 2);

    let primary = specs[0];
    assert_eq!(primary.size, Size2D::new(1344, 756));
    assert_eq!(primary.color, ColorFormat::Rgba8888);
    assert_eq!(primary.depth_stencil, DepthStencilFormat::Depth16);
    assert_eq!(primary.samples, 2);
    assert_eq!(primary.layers, 1);

    let overlay = specs[1];
    assert_eq!(overlay.size, Size2D::new(128, 128));
    assert_eq!(overlay.depth_stencil, DepthStencilFormat::None);
    assert_eq!(overlay.samples, 1);

    assert_eq!(session.compositor().view_mode(), ViewMode::SingleView);
    assert_eq!(session.compositor().render_size(), Size2D::new(1344, 756));
}

#[test]
fn test_head_pose_predicted_50ms_ahead() {
    let (mut session, h) = session(Options::default());
    let now = h.platform.now();

    session.render_frame();

    let asked: Vec<_> = h
        .journal
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::HeadPose(at) => Some(at),
            _ => None,
        })
        .collect();
    assert_eq!(asked, [TimePoint::from_nanos(now.as_nanos() + 50_000_000)]);
}

#[test]
fn test_prediction_latency_follows_config() {
    let config = CompositorConfig {
        prediction_latency_ns: 20_000_000,
        ..CompositorConfig::default()
    };
    let (mut session, h) = session(Options {
        config,
        ..Options::default()
    });
    let now = h.platform.now();

    session.render_frame();

    assert!(h
        .journal
        .calls()
        .contains(&Call::HeadPose(now.add_nanos(20_000_000))));
}

#[test]
fn test_submit_carries_viewports_and_head_pose() {
    let (mut session, h) = session(Options::default());

    session.render_frame();

    let submits = h.journal.submits();
    assert_eq!(submits.len(), 1);
    let (list, head) = submits[0];
    assert_eq!(head, head_pose());
    assert_eq!(list.get(Eye::Left).source_uv, UvRect::new(0.0, 0.5, 0.0, 1.0));
    assert_eq!(list.get(Eye::Right).source_uv, UvRect::new(0.5, 1.0, 0.0, 1.0));
}

#[test]
fn test_scene_sees_head_pose_and_eye_views() {
    let (mut session, h) = session(Options::default());

    session.render_frame();

    let updates = h.journal.updates();
    assert_eq!(updates[0].head_from_world, head_pose());

    let render = h.journal.renders()[0];
    assert_eq!(render.target, PRIMARY_FBO);
    assert!(!render.multiview);
    for eye in Eye::BOTH {
        let pass = render.passes[eye.index()];
        assert_eq!(pass.eye_from_head, eye_from_head(eye));
        assert!(pass.eye_view.approx_eq(&(eye_from_head(eye) * head_pose()), 1e-6));
        assert_eq!(session.compositor().eye_views()[eye.index()], pass.eye_view);
    }
    assert_eq!(render.passes[0].fov, LEFT_FOV);
    assert_eq!(render.passes[1].fov, RIGHT_FOV);
}

#[test]
fn test_single_view_passes_split_the_target() {
    let (mut session, h) = session(Options::default());

    session.render_frame();

    let render = h.journal.renders()[0];
    assert_eq!(
        render.passes[0].viewport,
        PixelRect {
            left: 0,
            bottom: 0,
            width: 672,
            height: 756
        }
    );
    assert_eq!(
        render.passes[1].viewport,
        PixelRect {
            left: 672,
            bottom: 0,
            width: 672,
            height: 756
        }
    );
    assert_eq!(render.passes[0].layer, 0);
    assert_eq!(render.passes[1].layer, 0);
    assert_eq!(render.passes[0].target, layer_target(0, 0));
    assert_eq!(render.passes[1].target, layer_target(0, 0));
}

#[test]
fn test_multiview_viewports_hold_across_frames() {
    let (mut session, h) = session(Options {
        multiview: true,
        ..Options::default()
    });
    assert_eq!(session.compositor().view_mode(), ViewMode::Multiview);

    for _ in 0..3 {
        h.platform.advance(16_666_667);
        assert_eq!(session.render_frame(), FrameOutcome::Presented);
    }

    for (list, _) in h.journal.submits() {
        for eye in Eye::BOTH {
            assert_eq!(list.get(eye).source_uv, UvRect::FULL);
            assert_eq!(list.get(eye).source_layer, eye.index() as u32);
        }
    }
    for render in h.journal.renders() {
        assert!(render.multiview);
        for eye in Eye::BOTH {
            let pass = render.passes[eye.index()];
            assert_eq!(pass.layer, eye.index() as u32);
            assert_eq!(pass.target, layer_target(0, eye.index() as u32));
            assert_eq!(
                pass.viewport,
                PixelRect {
                    left: 0,
                    bottom: 0,
                    width: 672,
                    height: 756
                }
            );
        }
    }
}

#[test]
fn test_multiview_allocates_half_width_layers() {
    let (parts, h) = parts(Options {
        multiview: true,
        ..Options::default()
    });
    let mut session = stereo_compose::Session::create(parts).unwrap();
    session.initialize_graphics().unwrap();

    let primary = session.compositor().targets().unwrap().primary_spec();
    assert_eq!(primary.size, Size2D::new(672, 756));
    assert_eq!(primary.layers, 2);
    assert_eq!(h.device.buffer_size(0), Size2D::new(672, 756));
}

#[test]
fn test_multiview_disallowed_by_config() {
    let config = CompositorConfig {
        allow_multiview: false,
        ..CompositorConfig::default()
    };
    let (session, _h) = session(Options {
        multiview: true,
        config,
        ..Options::default()
    });
    assert_eq!(session.compositor().view_mode(), ViewMode::SingleView);
}

#[test]
fn test_unrecognized_viewer_renders_single_view() {
    let (mut session, h) = session(Options {
        multiview: true,
        viewer: ViewerKind::Unrecognized(9),
        ..Options::default()
    });

    assert_eq!(session.compositor().view_mode(), ViewMode::SingleView);
    assert_eq!(session.render_frame(), FrameOutcome::Presented);
    assert!(!h.journal.renders()[0].multiview);
}

#[test]
fn test_delta_time_between_frames() {
    let (mut session, h) = session(Options::default());

    session.render_frame();
    h.platform.advance(16_666_667);
    session.render_frame();

    let updates = h.journal.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].delta_seconds, 0.0);
    assert!((updates[1].delta_seconds - 0.016_667).abs() < 1e-5);
}

#[test]
fn test_no_resize_while_recommendation_is_stable() {
    let (mut session, h) = session(Options::default());

    for _ in 0..4 {
        session.render_frame();
    }

    assert_eq!(h.journal.count(|c| matches!(c, Call::Resize(..))), 0);
}

#[test]
fn test_resize_once_when_recommendation_moves() {
    let (mut session, h) = session(Options::default());
    session.render_frame();

    h.platform.set_max_size(Size2D::new(1000, 800));
    session.render_frame();
    session.render_frame();

    let resizes: Vec<_> = h
        .journal
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Resize(..)))
        .collect();
    assert_eq!(resizes, [Call::Resize(0, Size2D::new(700, 560))]);
    assert_eq!(session.compositor().render_size(), Size2D::new(700, 560));

    let render = h.journal.renders().pop().unwrap();
    assert_eq!(render.passes[1].viewport.left, 350);
    assert_eq!(render.passes[1].viewport.height, 560);
}

#[test]
fn test_resize_happens_before_acquire() {
    let (mut session, h) = session(Options::default());
    h.platform.set_max_size(Size2D::new(1000, 800));

    session.render_frame();

    let steps: Vec<_> = h.journal.calls().iter().filter_map(protocol_step).collect();
    assert_eq!(&steps[..3], ["input", "resize", "acquire"]);
}

#[test]
fn test_multiview_resize_halves_width() {
    let (mut session, h) = session(Options {
        multiview: true,
        ..Options::default()
    });
    h.platform.set_max_size(Size2D::new(1000, 800));

    session.render_frame();

    assert!(h.journal.calls().contains(&Call::Resize(0, Size2D::new(350, 560))));
    assert_eq!(session.compositor().render_size(), Size2D::new(700, 560));
}

#[test]
fn test_sizer_resizes_fresh_target_exactly_once() {
    let journal = Journal::default();
    let mut device = MockDevice {
        state: DeviceHandle::default(),
        journal: journal.clone(),
    };
    let mut swapchain = device
        .create_swapchain(&[stereo_render::BufferSpec::new(Size2D::ZERO)])
        .unwrap();
    let mut sizer = FramebufferSizer::new(ViewMode::SingleView);
    let recommended = recommended_render_size(Size2D::new(1920, 1080));

    assert_eq!(sizer.prepare(&mut swapchain, recommended, 0).unwrap(), true);
    assert_eq!(sizer.prepare(&mut swapchain, recommended, 1).unwrap(), false);

    assert_eq!(
        journal.count(|c| matches!(c, Call::Resize(..))),
        1,
        "{:?}",
        journal.calls()
    );
    assert_eq!(sizer.render_size(), Size2D::new(1344, 756));
}

#[test]
fn test_sizer_defers_second_resize_in_same_frame() {
    let journal = Journal::default();
    let mut device = MockDevice {
        state: DeviceHandle::default(),
        journal: journal.clone(),
    };
    let mut swapchain = device
        .create_swapchain(&[stereo_render::BufferSpec::new(Size2D::ZERO)])
        .unwrap();
    let mut sizer = FramebufferSizer::new(ViewMode::SingleView);

    assert!(sizer.prepare(&mut swapchain, Size2D::new(700, 560), 5).unwrap());
    assert!(!sizer.prepare(&mut swapchain, Size2D::new(800, 600), 5).unwrap());
    assert!(sizer.prepare(&mut swapchain, Size2D::new(800, 600), 6).unwrap());

    assert_eq!(journal.count(|c| matches!(c, Call::Resize(..))), 2);
}

#[test]
fn test_acquire_failure_skips_frame_and_recovers() {
    let (mut session, h) = session(Options::default());
    h.device.fail_next_acquires(1);

    assert_eq!(session.render_frame(), FrameOutcome::Skipped);
    assert!(h.journal.updates().is_empty());
    assert!(h.journal.renders().is_empty());
    assert!(h.journal.submits().is_empty());

    assert_eq!(session.render_frame(), FrameOutcome::Presented);
    assert_eq!(h.journal.submits().len(), 1);
}

#[test]
fn test_gpu_error_is_drained_and_frame_still_presented() {
    let (mut session, h) = session(Options::default());
    h.device.push_error(0x0506);

    assert_eq!(session.render_frame(), FrameOutcome::Presented);
    assert_eq!(h.device.pending_errors(), 0);
    assert_eq!(h.journal.submits().len(), 1);
}

#[test]
fn test_tracking_loss_reuses_last_head_pose() {
    let (mut session, h) = session(Options::default());
    session.render_frame();

    h.platform.set_tracking(None);
    assert_eq!(session.render_frame(), FrameOutcome::Presented);

    let updates = h.journal.updates();
    assert_eq!(updates[1].head_from_world, head_pose());
    assert_eq!(h.journal.submits()[1].1, head_pose());
}

#[test]
fn test_primary_action_stops_flying_before_pose() {
    let (mut session, h) = session(Options::default());
    h.controller.push(ControllerState {
        buttons_down: Buttons::APP,
        ..ControllerState::default()
    });

    session.render_frame();

    let calls = h.journal.calls();
    let fly = calls.iter().position(|c| *c == Call::FlyState(false));
    let pose = calls.iter().position(|c| matches!(c, Call::HeadPose(_)));
    assert!(fly.is_some());
    assert!(fly < pose);

    h.journal.clear();
    session.render_frame();
    assert_eq!(h.journal.count(|c| matches!(c, Call::FlyState(_))), 0);
}

#[test]
fn test_other_buttons_do_not_stop_flying() {
    let (mut session, h) = session(Options::default());
    h.controller.push(ControllerState {
        buttons_down: Buttons::HOME | Buttons::VOLUME_UP,
        ..ControllerState::default()
    });

    session.render_frame();

    assert_eq!(h.journal.count(|c| matches!(c, Call::FlyState(_))), 0);
}

#[test]
fn test_frame_before_graphics_init_is_skipped() {
    let (parts, h) = parts(Options::default());
    let mut session = stereo_compose::Session::create(parts).unwrap();
    h.journal.clear();

    assert_eq!(session.render_frame(), FrameOutcome::Skipped);
    assert_eq!(h.journal.count(|c| matches!(c, Call::Acquire)), 0);
    assert!(h.journal.updates().is_empty());
}

#[test]
fn test_frame_index_counts_every_attempt() {
    let (mut session, h) = session(Options::default());
    h.device.fail_next_acquires(1);

    session.render_frame();
    session.render_frame();

    assert_eq!(session.compositor().frame_index(), 2);
}

/// Unit tests for GraphicsSession (mock device, no GPU)

use super::*;
use crate::graphics_device::mock_graphics_device::{MockBuffer, MockDeviceState, MockGraphicsDevice, MockTexture};
use crate::graphics_device::{BufferUsage, DescriptorCapacities};
use std::sync::Mutex;

fn session_with(device: MockGraphicsDevice, config: &Config) -> (GraphicsSession, Arc<Mutex<MockDeviceState>>) {
    let state = Arc::clone(&device.state);
    let session = GraphicsSession::new(Box::new(device), config, 800, 600).unwrap();
    (session, state)
}

fn default_session() -> (GraphicsSession, Arc<Mutex<MockDeviceState>>) {
    session_with(MockGraphicsDevice::new(), &Config::default())
}

fn sampled(name: &str) -> Arc<dyn Texture> {
    Arc::new(MockTexture::sampled(256, 256, name))
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn test_new_creates_three_heaps_with_configured_capacities() {
    let (session, state) = default_session();
    let state = state.lock().unwrap();

    let summary: Vec<(DescriptorHeapType, u32, bool)> = state
        .heaps
        .iter()
        .map(|(desc, _, _)| (desc.heap_type, desc.capacity, desc.is_shader_visible()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (DescriptorHeapType::RenderTarget, 100, false),
            (DescriptorHeapType::DepthStencil, 100, false),
            (DescriptorHeapType::ShaderResource, 2048, true),
        ]
    );
    assert_eq!(session.allocator(DescriptorHeapType::ShaderResource).capacity(), 2048);
}

#[test]
fn test_new_custom_capacities() {
    let config = Config {
        descriptor_capacities: DescriptorCapacities {
            render_target: 8,
            depth_stencil: 2,
            shader_resource: 16,
        },
        ..Config::default()
    };
    let (session, _) = session_with(MockGraphicsDevice::new(), &config);

    assert_eq!(session.allocator(DescriptorHeapType::RenderTarget).capacity(), 8);
    assert_eq!(session.allocator(DescriptorHeapType::DepthStencil).capacity(), 2);
    assert_eq!(session.allocator(DescriptorHeapType::ShaderResource).capacity(), 16);
}

#[test]
fn test_new_back_buffer_rtvs_are_contiguous() {
    let config = Config {
        back_buffer_count: 3,
        ..Config::default()
    };
    let (session, state) = session_with(MockGraphicsDevice::new(), &config);

    let indices: Vec<u32> = session.back_buffer_rtvs().iter().map(|h| h.index()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(session.allocator(DescriptorHeapType::RenderTarget).high_water_mark(), 3);

    let state = state.lock().unwrap();
    let rtv_views = state.views_of(DescriptorHeapType::RenderTarget);
    assert_eq!(rtv_views.len(), 3);
    for (view, rtv) in rtv_views.iter().zip(session.back_buffer_rtvs()) {
        assert_eq!(view.target, *rtv);
        assert_eq!(view.texture.usage, TextureUsage::RenderTarget);
    }
}

#[test]
fn test_new_creates_depth_buffer_and_dsv() {
    let (session, state) = default_session();

    assert_eq!(session.depth_dsv().index(), 0);
    assert!(session.depth_dsv().is_valid());
    assert_eq!(session.depth_format(), TextureFormat::D32_FLOAT);
    assert_eq!(session.depth_buffer().info().width, 800);

    let state = state.lock().unwrap();
    assert_eq!(state.depth_buffers, vec![(800, 600, TextureFormat::D32_FLOAT)]);
    assert_eq!(state.views_of(DescriptorHeapType::DepthStencil).len(), 1);
}

#[test]
fn test_new_viewport_and_scissor_cover_surface() {
    let (session, _) = default_session();

    assert_eq!(session.viewport(), Viewport::full(800, 600));
    assert_eq!(session.scissor(), Rect2D { x: 0, y: 0, width: 800, height: 600 });
    assert_eq!(session.size(), (800, 600));
    assert!(!session.is_minimized());
}

#[test]
fn test_new_hdr_format_falls_back_without_hdr_display() {
    let config = Config {
        back_buffer_format: TextureFormat::R10G10B10A2_UNORM,
        ..Config::default()
    };
    let (session, state) = session_with(MockGraphicsDevice::new(), &config);

    assert_eq!(session.surface_format(), TextureFormat::R8G8B8A8_UNORM);
    assert_eq!(state.lock().unwrap().swapchains[0].format, TextureFormat::R8G8B8A8_UNORM);
}

#[test]
fn test_new_hdr_format_kept_with_hdr_display() {
    let config = Config {
        back_buffer_format: TextureFormat::R16G16B16A16_FLOAT,
        ..Config::default()
    };
    let mut device = MockGraphicsDevice::new();
    device.hdr_output = true;
    let (session, _) = session_with(device, &config);

    assert_eq!(session.surface_format(), TextureFormat::R16G16B16A16_FLOAT);
}

#[test]
fn test_new_heap_failure_is_initialization_error() {
    for heap_type in [
        DescriptorHeapType::RenderTarget,
        DescriptorHeapType::DepthStencil,
        DescriptorHeapType::ShaderResource,
    ] {
        let device = MockGraphicsDevice::failing_heap(heap_type);
        let result = GraphicsSession::new(Box::new(device), &Config::default(), 800, 600);
        assert!(
            matches!(result, Err(Error::InitializationFailed(_))),
            "{:?} heap failure not reported as InitializationFailed",
            heap_type
        );
    }
}

#[test]
fn test_new_rejects_bad_config() {
    let zero_buffers = Config {
        back_buffer_count: 0,
        ..Config::default()
    };
    let color_depth = Config {
        depth_format: TextureFormat::R8G8B8A8_UNORM,
        ..Config::default()
    };

    assert!(matches!(
        GraphicsSession::new(Box::new(MockGraphicsDevice::new()), &zero_buffers, 800, 600),
        Err(Error::InitializationFailed(_))
    ));
    assert!(matches!(
        GraphicsSession::new(Box::new(MockGraphicsDevice::new()), &color_depth, 800, 600),
        Err(Error::InitializationFailed(_))
    ));
    assert!(matches!(
        GraphicsSession::new(Box::new(MockGraphicsDevice::new()), &Config::default(), 0, 600),
        Err(Error::InitializationFailed(_))
    ));
}

#[test]
fn test_new_too_many_back_buffers_for_rtv_heap() {
    let config = Config {
        back_buffer_count: 4,
        descriptor_capacities: DescriptorCapacities {
            render_target: 2,
            ..DescriptorCapacities::default()
        },
        ..Config::default()
    };
    let result = GraphicsSession::new(Box::new(MockGraphicsDevice::new()), &config, 800, 600);
    assert!(matches!(result, Err(Error::CapacityExhausted { .. })));
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn test_resize_reuses_rtv_and_dsv_slots() {
    let (mut session, state) = default_session();
    let rtvs_before = session.back_buffer_rtvs().to_vec();
    let dsv_before = session.depth_dsv();

    session.on_size_changed(1280, 720, false).unwrap();

    assert_eq!(session.back_buffer_rtvs(), rtvs_before.as_slice());
    assert_eq!(session.depth_dsv(), dsv_before);
    assert_eq!(session.allocator(DescriptorHeapType::DepthStencil).high_water_mark(), 1);
    assert_eq!(session.allocator(DescriptorHeapType::DepthStencil).len(), 1);
    assert_eq!(session.allocator(DescriptorHeapType::RenderTarget).high_water_mark(), 2);

    let state = state.lock().unwrap();
    assert_eq!(state.wait_idle_calls, 1);
    assert_eq!(state.depth_buffers.last(), Some(&(1280, 720, TextureFormat::D32_FLOAT)));
    // 2 RTVs at creation, 2 rewritten on resize
    assert_eq!(state.views_of(DescriptorHeapType::RenderTarget).len(), 4);
    assert_eq!(state.views_of(DescriptorHeapType::RenderTarget)[3].texture.width, 1280);
}

#[test]
fn test_resize_updates_viewport_and_scissor() {
    let (mut session, _) = default_session();

    session.on_size_changed(1920, 1080, false).unwrap();

    assert_eq!(session.size(), (1920, 1080));
    assert_eq!(session.viewport().width, 1920.0);
    assert_eq!(session.viewport().height, 1080.0);
    assert_eq!(session.scissor(), Rect2D::full(1920, 1080));
    assert_eq!(session.swapchain().width(), 1920);
}

#[test]
fn test_resize_while_minimized_only_records_size() {
    let (mut session, state) = default_session();

    session.on_size_changed(0, 0, true).unwrap();

    assert_eq!(session.size(), (0, 0));
    assert!(session.is_minimized());
    // Nothing was rebuilt
    assert_eq!(session.viewport(), Viewport::full(800, 600));
    assert_eq!(session.swapchain().width(), 800);
    let state = state.lock().unwrap();
    assert_eq!(state.wait_idle_calls, 0);
    assert_eq!(state.depth_buffers.len(), 1);
}

#[test]
fn test_restore_after_minimize() {
    let (mut session, _) = default_session();
    session.on_size_changed(0, 0, true).unwrap();

    session.on_size_changed(640, 480, false).unwrap();

    assert!(!session.is_minimized());
    assert_eq!(session.size(), (640, 480));
    assert_eq!(session.depth_buffer().info().height, 480);
}

#[test]
fn test_repeated_resizes_do_not_leak_slots() {
    let (mut session, _) = default_session();

    for step in 1..=10u32 {
        session.on_size_changed(100 * step, 50 * step, false).unwrap();
    }

    assert_eq!(session.allocator(DescriptorHeapType::DepthStencil).len(), 1);
    assert_eq!(session.allocator(DescriptorHeapType::DepthStencil).high_water_mark(), 1);
    assert_eq!(session.allocator(DescriptorHeapType::RenderTarget).len(), 2);
}

#[test]
fn test_resize_to_fewer_back_buffers_frees_surplus_slots() {
    let device = MockGraphicsDevice {
        recreate_image_count: Some(2),
        ..MockGraphicsDevice::new()
    };
    let config = Config { back_buffer_count: 3, ..Config::default() };
    let (mut session, _) = session_with(device, &config);
    let rtvs_before = session.back_buffer_rtvs().to_vec();

    session.on_size_changed(1024, 768, false).unwrap();

    assert_eq!(session.back_buffer_rtvs(), &rtvs_before[..2]);
    let rtvs = session.allocator(DescriptorHeapType::RenderTarget);
    assert_eq!(rtvs.len(), 2);
    assert_eq!(rtvs.free_count(), 1);
    assert_eq!(rtvs.high_water_mark(), 3);
}

#[test]
fn test_resize_to_more_back_buffers_grows_block_in_place() {
    let device = MockGraphicsDevice {
        recreate_image_count: Some(3),
        ..MockGraphicsDevice::new()
    };
    let (mut session, state) = session_with(device, &Config::default());

    session.on_size_changed(1024, 768, false).unwrap();

    let indices: Vec<u32> = session.back_buffer_rtvs().iter().map(|h| h.index()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    let rtvs = session.allocator(DescriptorHeapType::RenderTarget);
    assert_eq!(rtvs.high_water_mark(), 3);
    assert_eq!(rtvs.free_count(), 0);
    // 2 views at creation, 3 after the resize
    assert_eq!(state.lock().unwrap().views_of(DescriptorHeapType::RenderTarget).len(), 5);
}

#[test]
fn test_resize_to_more_back_buffers_moves_block_when_boxed_in() {
    let device = MockGraphicsDevice {
        recreate_image_count: Some(3),
        ..MockGraphicsDevice::new()
    };
    let (mut session, state) = session_with(device, &Config::default());
    let offscreen = session.allocator_mut(DescriptorHeapType::RenderTarget).alloc().unwrap();
    assert_eq!(offscreen.index(), 2);

    session.on_size_changed(1024, 768, false).unwrap();

    let indices: Vec<u32> = session.back_buffer_rtvs().iter().map(|h| h.index()).collect();
    assert_eq!(indices, vec![3, 4, 5]);
    let rtvs = session.allocator(DescriptorHeapType::RenderTarget);
    assert_eq!(rtvs.len(), 4);
    assert_eq!(rtvs.free_count(), 2);
    let state = state.lock().unwrap();
    let written: Vec<u32> = state
        .views_of(DescriptorHeapType::RenderTarget)
        .iter()
        .skip(2)
        .map(|v| v.target.index())
        .collect();
    assert_eq!(written, vec![3, 4, 5]);
}

#[test]
fn test_resize_depth_buffer_failure_keeps_previous_depth_target() {
    let (mut session, state) = default_session();
    let dsv_before = session.depth_dsv();
    state.lock().unwrap().fail_depth_buffers = true;

    let result = session.on_size_changed(1024, 768, false);

    assert!(matches!(result, Err(Error::BackendError(_))));
    assert_eq!(session.depth_dsv(), dsv_before);
    assert_eq!(session.depth_buffer().info().width, 800);
    assert_eq!(session.allocator(DescriptorHeapType::DepthStencil).len(), 1);
    // Size is recorded, viewport still describes the last good rebuild
    assert_eq!(session.size(), (1024, 768));
    assert_eq!(session.viewport(), Viewport::full(800, 600));
    assert_eq!(session.scissor(), Rect2D::full(800, 600));
}

#[test]
fn test_resize_depth_view_failure_leaves_no_dsv() {
    let (mut session, state) = default_session();
    state.lock().unwrap().fail_views = Some(DescriptorHeapType::DepthStencil);

    let result = session.on_size_changed(1024, 768, false);

    assert!(result.is_err());
    assert!(!session.depth_dsv().is_valid());
    assert_eq!(session.depth_buffer().info().width, 1024);
    assert_eq!(session.allocator(DescriptorHeapType::DepthStencil).len(), 0);

    // The next resize recovers the same slot
    state.lock().unwrap().fail_views = None;
    session.on_size_changed(1280, 720, false).unwrap();
    assert_eq!(session.depth_dsv().index(), 0);
    assert_eq!(session.allocator(DescriptorHeapType::DepthStencil).len(), 1);
}

// ============================================================================
// Constant buffers
// ============================================================================

#[test]
fn test_create_constant_buffers_one_per_frame() {
    let (mut session, state) = default_session();

    let buffers = session.create_constant_buffers(200, 2).unwrap();

    assert_eq!(buffers.len(), 2);
    assert!(buffers.iter().all(|b| b.size() == 256));
    assert!(!Arc::ptr_eq(&buffers[0], &buffers[1]));
    let state = state.lock().unwrap();
    assert_eq!(state.buffers.len(), 2);
    assert!(state.buffers.iter().all(|d| d.usage == BufferUsage::Constant));
}

#[test]
fn test_constant_buffer_update_reaches_upload_memory() {
    let (mut session, _) = default_session();
    let buffers = session.create_constant_buffers(16, 1).unwrap();

    buffers[0].update(0, &[0xAB; 16]).unwrap();

    let mock = buffers[0].as_any().downcast_ref::<MockBuffer>().unwrap();
    assert_eq!(&mock.bytes()[..16], &[0xAB; 16]);
    assert!(matches!(buffers[0].update(250, &[0; 16]), Err(Error::InvalidResource(_))));
}

#[test]
fn test_create_constant_buffers_zero_size_is_rejected() {
    let (mut session, state) = default_session();

    let result = session.create_constant_buffers(0, 3);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(state.lock().unwrap().buffers.is_empty());
}

#[test]
fn test_create_constant_buffers_zero_count_is_empty() {
    let (mut session, _) = default_session();
    assert!(session.create_constant_buffers(64, 0).unwrap().is_empty());
}

// ============================================================================
// Textures
// ============================================================================

#[test]
fn test_register_texture_allocates_srv() {
    let (mut session, state) = default_session();

    let srv = session.register_texture("albedo", sampled("albedo")).unwrap();

    assert!(srv.is_valid());
    assert_eq!(srv.index(), 0);
    assert_ne!(srv.gpu().0, 0);
    assert_eq!(session.texture_count(), 1);
    assert_eq!(session.texture("albedo").map(|e| e.srv), Some(srv));

    let state = state.lock().unwrap();
    let srv_views = state.views_of(DescriptorHeapType::ShaderResource);
    assert_eq!(srv_views.len(), 1);
    assert_eq!(
        srv_views[0].view,
        ViewDesc::ShaderResource { format: TextureFormat::R8G8B8A8_UNORM, mip_levels: 1 }
    );
}

#[test]
fn test_register_texture_is_cached_by_name() {
    let (mut session, state) = default_session();

    let first = session.register_texture("albedo", sampled("a")).unwrap();
    let second = session.register_texture("albedo", sampled("b")).unwrap();

    assert_eq!(first, second);
    assert_eq!(session.texture_count(), 1);
    assert_eq!(session.allocator(DescriptorHeapType::ShaderResource).len(), 1);
    assert_eq!(state.lock().unwrap().views_of(DescriptorHeapType::ShaderResource).len(), 1);
}

#[test]
fn test_register_texture_rejects_non_sampled() {
    let (mut session, _) = default_session();
    let depth: Arc<dyn Texture> = Arc::new(MockTexture::new(
        64,
        64,
        TextureFormat::D32_FLOAT,
        TextureUsage::DepthStencil,
        "depth",
    ));

    let result = session.register_texture("depth", depth);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(session.texture_count(), 0);
    assert!(session.allocator(DescriptorHeapType::ShaderResource).is_empty());
}

#[test]
fn test_release_texture_frees_slot_for_reuse() {
    let (mut session, _) = default_session();
    let a = session.register_texture("a", sampled("a")).unwrap();
    session.register_texture("b", sampled("b")).unwrap();

    session.release_texture("a").unwrap();
    let c = session.register_texture("c", sampled("c")).unwrap();

    assert!(session.texture("a").is_none());
    assert_eq!(c, a);
    assert_eq!(session.texture_count(), 2);
}

#[test]
fn test_release_unknown_texture() {
    let (mut session, _) = default_session();
    assert!(matches!(session.release_texture("missing"), Err(Error::InvalidResource(_))));
}

#[test]
fn test_allocate_shader_resources_is_contiguous_and_skips_freed() {
    let (mut session, _) = default_session();
    session.register_texture("a", sampled("a")).unwrap();
    session.release_texture("a").unwrap();

    let table = session.allocate_shader_resources(4).unwrap();
    let indices: Vec<u32> = table.iter().map(|h| h.index()).collect();

    assert_eq!(indices, vec![1, 2, 3, 4]);
    assert_eq!(session.allocator(DescriptorHeapType::ShaderResource).free_count(), 1);
}

// ============================================================================
// Allocators and shutdown
// ============================================================================

#[test]
fn test_allocator_mut_routes_to_heap() {
    let (mut session, _) = default_session();

    let rtv = session.allocator_mut(DescriptorHeapType::RenderTarget).alloc().unwrap();
    let dsv = session.allocator_mut(DescriptorHeapType::DepthStencil).alloc().unwrap();

    // Back buffers took RTV 0 and 1, the default depth view took DSV 0
    assert_eq!(rtv.index(), 2);
    assert_eq!(dsv.index(), 1);
    assert!(session.allocator(DescriptorHeapType::RenderTarget).owns(rtv));
    assert!(!session.allocator(DescriptorHeapType::DepthStencil).owns(rtv));
}

#[test]
fn test_terminate_waits_once() {
    let (mut session, state) = default_session();

    session.terminate().unwrap();
    session.terminate().unwrap();
    assert!(session.is_terminated());
    drop(session);

    assert_eq!(state.lock().unwrap().wait_idle_calls, 1);
}

#[test]
fn test_drop_without_terminate_waits_for_idle() {
    let (session, state) = default_session();
    drop(session);
    assert_eq!(state.lock().unwrap().wait_idle_calls, 1);
}

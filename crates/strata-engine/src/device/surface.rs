use glam::UVec2;

use super::SurfaceErrorAction;

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Creates the color texture a headless device renders into.
pub(crate) fn create_offscreen(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: UVec2,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("strata offscreen color"),
        size: wgpu::Extent3d {
            width: size.x.max(1),
            height: size.y.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// Maps a surface error to an action; `reconfigure` is invoked for lost or
/// outdated surfaces when the drawable size is non-zero.
pub(crate) fn map_surface_error(
    err: wgpu::SurfaceError,
    size: UVec2,
    reconfigure: impl FnOnce(),
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if size.x > 0 && size.y > 0 {
                reconfigure();
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_surface_reconfigures_only_when_sized() {
        let mut calls = 0;
        let action = map_surface_error(wgpu::SurfaceError::Lost, UVec2::new(10, 10), || calls += 1);
        assert_eq!(action, SurfaceErrorAction::Reconfigured);
        assert_eq!(calls, 1);

        let action = map_surface_error(wgpu::SurfaceError::Outdated, UVec2::ZERO, || calls += 1);
        assert_eq!(action, SurfaceErrorAction::Reconfigured);
        assert_eq!(calls, 1);
    }

    #[test]
    fn oom_is_fatal_and_timeout_skips() {
        assert_eq!(
            map_surface_error(wgpu::SurfaceError::OutOfMemory, UVec2::ONE, || {}),
            SurfaceErrorAction::Fatal
        );
        assert_eq!(
            map_surface_error(wgpu::SurfaceError::Timeout, UVec2::ONE, || {}),
            SurfaceErrorAction::SkipFrame
        );
    }
}

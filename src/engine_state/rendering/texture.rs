//! Texture handling for the rendering pipeline.
//!
//! Depth buffers, the stitched atlas and the 1x1 stand-in bound while no
//! atlas exists.

use super::atlas::StitchedAtlas;
use crate::engine_state::error::AtlasBuildError;

/// Represents a GPU texture with associated view and sampler.
pub struct Texture {
    #[allow(dead_code)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// A texture together with the bind group that exposes it to the terrain shader.
pub struct BoundTexture {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Texture {
    /// The texture format used for depth buffers.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Atlas pixels are premultiplied sRGB.
    pub const ATLAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Creates a new depth texture matching the surface size.
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        };

        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads a stitched atlas.
    ///
    /// # Errors
    /// [`AtlasBuildError::Upload`] if the image exceeds the device's texture
    /// limit, its pixel buffer does not match its size, or the device rejects
    /// the upload.
    pub fn from_atlas(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        atlas: &StitchedAtlas,
        label: &str,
    ) -> Result<Self, AtlasBuildError> {
        let max_side = device.limits().max_texture_dimension_2d;
        if atlas.width == 0 || atlas.height == 0 {
            return Err(AtlasBuildError::Upload("atlas has no pixels".to_string()));
        }
        if atlas.width > max_side || atlas.height > max_side {
            return Err(AtlasBuildError::Upload(format!(
                "atlas is {}x{} but the device allows at most {max_side}x{max_side}",
                atlas.width, atlas.height
            )));
        }
        for (level, pixels) in atlas.levels().enumerate() {
            let (width, height) = atlas.level_size(level as u32);
            let expected_len = width as usize * height as usize * 4;
            if pixels.len() != expected_len {
                return Err(AtlasBuildError::Upload(format!(
                    "atlas level {level} holds {} bytes, expected {expected_len}",
                    pixels.len()
                )));
            }
        }

        #[cfg(not(target_family = "wasm"))]
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let levels: Vec<&[u8]> = atlas.levels().collect();
        let texture = Self::create_rgba(device, queue, &levels, atlas.width, atlas.height, label);

        #[cfg(not(target_family = "wasm"))]
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(AtlasBuildError::Upload(error.to_string()));
        }

        Ok(texture)
    }

    /// A single transparent texel. Bound while no atlas is available.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::create_rgba(device, queue, &[[0u8, 0, 0, 0].as_slice()], 1, 1, "Placeholder Texture")
    }

    /// Creates an RGBA texture with one mip level per entry of `levels`.
    fn create_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        levels: &[&[u8]],
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len().max(1) as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::ATLAS_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, pixels) in levels.iter().enumerate() {
            let level_width = (width >> level).max(1);
            let level_height = (height >> level).max(1);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level_width),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

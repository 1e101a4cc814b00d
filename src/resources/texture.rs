use anyhow::Context as _;

/// Layout of the per-entity diffuse texture: one filterable 2D texture and
/// its sampler, read by the lit fragment stage.
pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("diffuse_texture_bind_group_layout"),
    })
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

/// Environment variable naming an asset directory searched before the
/// built-in ones.
pub const ASSET_DIR_ENV: &str = "TABLE_NGIN_ASSETS";

/// Directories searched for assets on native targets, in order: the
/// `TABLE_NGIN_ASSETS` override, `./assets` and the copy `build.rs` placed
/// in `OUT_DIR`.
#[cfg(not(target_arch = "wasm32"))]
pub fn asset_roots() -> Vec<std::path::PathBuf> {
    let mut roots = Vec::with_capacity(3);
    if let Some(dir) = std::env::var_os(ASSET_DIR_ENV) {
        roots.push(std::path::PathBuf::from(dir));
    }
    roots.push(std::path::PathBuf::from("assets"));
    roots.push(built_assets());
    roots
}

#[cfg(not(target_arch = "wasm32"))]
fn built_assets() -> std::path::PathBuf {
    std::path::Path::new(env!("OUT_DIR")).join("assets")
}

/// Resolve `file_name` against the first asset root that contains it.
///
/// Falls back to the `OUT_DIR` copy so errors name a stable path.
#[cfg(not(target_arch = "wasm32"))]
pub fn asset_path(file_name: &str) -> std::path::PathBuf {
    asset_roots()
        .into_iter()
        .map(|root| root.join(file_name))
        .find(|path| path.is_file())
        .unwrap_or_else(|| built_assets().join(file_name))
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = asset_path(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = asset_path(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };

    Ok(data)
}

/// Fetch and decode an image. Uploading is left to the render step.
pub async fn load_image(file_name: &str) -> anyhow::Result<image::DynamicImage> {
    let data = load_binary(file_name).await?;
    image::load_from_memory(&data).with_context(|| format!("decoding {}", file_name))
}

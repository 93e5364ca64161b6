use anyhow::{Context, Result};
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// `<output_dir>/<input stem>_<mode>.png`
pub fn output_path(output_dir: &Path, input: &Path, mode_name: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("heatmap"));
    output_dir.join(format!("{stem}_{mode_name}.png"))
}

pub fn save(path: &Path, image: &RgbaImage) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    let output = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let encoder = PngEncoder::new(BufWriter::new(output));

    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .with_context(|| format!("failed to encode {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn output_name_joins_stem_and_mode() {
        let path = output_path(Path::new("out"), Path::new("data/Death.json"), "cluster");
        assert_eq!(path, Path::new("out").join("Death_cluster.png"));
    }

    #[test]
    fn save_gradient_file() {
        let (width, height) = (64u32, 16u32);
        let image = RgbaImage::from_fn(width, height, |x, _| {
            let ramp = (x * 4) as u8;
            Rgba([ramp, 0, 255 - ramp, 200])
        });
        let dir = std::env::temp_dir().join("heatmap_renderer_image_helper");
        let path = dir.join("gradient_file.png");

        save(&path, &image).expect("Error Saving File.");

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded, image);
        let _ = std::fs::remove_dir_all(dir);
    }
}

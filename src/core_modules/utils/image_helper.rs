// THEORY:
// Artifact output. The scorers hand back their intermediate maps (the equalized noise
// residual and the enhanced PCA field) as in-memory images; these helpers persist them
// as PNG so they can be inspected next to the source image.

pub mod image_helper {
    use crate::error::Result;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, GrayImage, ImageEncoder, ImageError, RgbImage};
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;

    pub fn save_rgb_png(path: impl AsRef<Path>, image: &RgbImage) -> Result<()> {
        write_png(path.as_ref(), image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
    }

    pub fn save_gray_png(path: impl AsRef<Path>, image: &GrayImage) -> Result<()> {
        write_png(path.as_ref(), image.as_raw(), image.width(), image.height(), ExtendedColorType::L8)
    }

    fn write_png(
        path: &Path,
        buffer: &[u8],
        width: u32,
        height: u32,
        color: ExtendedColorType,
    ) -> Result<()> {
        let output = File::create(path).map_err(ImageError::IoError)?;
        let encoder = PngEncoder::new(BufWriter::new(output));
        encoder.write_image(buffer, width, height, color)?;
        Ok(())
    }
}

//! Conversions between `image` crate buffers and planar [`Image`]s.

use std::path::Path;

use ::image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use stitchkit_core::Image;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum ImageConvertError {
    #[error(transparent)]
    Image(#[from] ::image::ImageError),

    #[error("cannot encode a {0}-channel image (expected 1 or at least 3)")]
    UnsupportedChannels(usize),

    #[error("image dimensions do not fit an encoded buffer (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

/// Planar copy of `img` in `[0, 1]`: one channel for grayscale sources,
/// three (RGB) otherwise. Alpha is dropped.
pub fn from_dynamic(img: &DynamicImage) -> Image {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if img.color().has_color() {
        let rgb = img.to_rgb32f();
        let mut out = Image::new(w, h, 3);
        for (x, y, px) in rgb.enumerate_pixels() {
            for (c, &v) in px.0.iter().enumerate() {
                *out.pixel_mut(x as usize, y as usize, c) = v;
            }
        }
        out
    } else {
        let luma = img.to_luma32f();
        let mut out = Image::new(w, h, 1);
        for (x, y, px) in luma.enumerate_pixels() {
            *out.pixel_mut(x as usize, y as usize, 0) = px.0[0];
        }
        out
    }
}

fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn encoded_size(image: &Image) -> Result<(u32, u32), ImageConvertError> {
    let err = || ImageConvertError::InvalidDimensions {
        width: image.width(),
        height: image.height(),
    };
    let w = u32::try_from(image.width()).map_err(|_| err())?;
    let h = u32::try_from(image.height()).map_err(|_| err())?;
    Ok((w, h))
}

/// 8-bit RGB copy. Single-channel images are replicated to grey; channels
/// past the third are ignored.
pub fn to_rgb8(image: &Image) -> Result<RgbImage, ImageConvertError> {
    let src: [usize; 3] = match image.channels() {
        1 => [0, 0, 0],
        n if n >= 3 => [0, 1, 2],
        n => return Err(ImageConvertError::UnsupportedChannels(n)),
    };
    let (w, h) = encoded_size(image)?;
    Ok(RgbImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb(src.map(|c| quantize(image.at(x, y, c))))
    }))
}

/// 8-bit luma copy, converting colour input with the usual luma weights.
pub fn to_luma8(image: &Image) -> Result<GrayImage, ImageConvertError> {
    if image.channels() == 2 || image.channels() == 0 {
        return Err(ImageConvertError::UnsupportedChannels(image.channels()));
    }
    let (w, h) = encoded_size(image)?;
    let gray = image.to_grayscale();
    Ok(GrayImage::from_fn(w, h, |x, y| {
        Luma([quantize(gray.at(x as usize, y as usize, 0))])
    }))
}

/// Decode an image file into a planar [`Image`].
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn load_image(path: impl AsRef<Path>) -> Result<Image, ImageConvertError> {
    let path = path.as_ref();
    let img = ::image::open(path)?;
    log::debug!(
        "loaded {} ({}x{}, {:?})",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );
    Ok(from_dynamic(&img))
}

/// Encode `image` to `path`; the format follows the file extension.
/// Single-channel images are written as grayscale, everything else as RGB.
pub fn save_image(image: &Image, path: impl AsRef<Path>) -> Result<(), ImageConvertError> {
    if image.channels() == 1 {
        to_luma8(image)?.save(path)?;
    } else {
        to_rgb8(image)?.save(path)?;
    }
    Ok(())
}

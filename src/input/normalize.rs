// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/normalize.rs - 图像归一化
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{RgbImage, imageops::FilterType};
use tracing::debug;

use crate::{
  frame::Blob,
  input::{ImageSource, InputError, PixelLayout, read_image_file::read_image_file},
};

/// 双线性插值，直接缩放，不裁剪也不加边
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// 将任意来源的图像转换为 RGB 三通道图像，尺寸不变
pub fn to_canonical(source: &ImageSource) -> Result<RgbImage, InputError> {
  match source {
    ImageSource::FilePath(path) => read_image_file(path),
    ImageSource::PixelBuffer {
      width,
      height,
      layout,
      data,
    } => from_pixel_buffer(*width, *height, *layout, data),
    ImageSource::Decoded(image) => {
      if image.width() == 0 || image.height() == 0 {
        return Err(InputError::InvalidDimensions {
          width: image.width(),
          height: image.height(),
        });
      }
      Ok(image.to_rgb8())
    }
  }
}

fn from_pixel_buffer(
  width: u32,
  height: u32,
  layout: PixelLayout,
  data: &[u8],
) -> Result<RgbImage, InputError> {
  if width == 0 || height == 0 {
    return Err(InputError::InvalidDimensions { width, height });
  }

  let channels = layout.channels();
  let expected = width as usize * height as usize * channels;
  if data.len() != expected {
    return Err(InputError::BufferSizeMismatch {
      expected,
      actual: data.len(),
    });
  }

  // 各布局下 R、G、B 分量的偏移
  let (r, g, b) = match layout {
    PixelLayout::Rgb | PixelLayout::Rgba => (0, 1, 2),
    PixelLayout::Bgr | PixelLayout::Bgra => (2, 1, 0),
  };

  let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
  for pixel in data.chunks_exact(channels) {
    rgb.extend_from_slice(&[pixel[r], pixel[g], pixel[b]]);
  }

  RgbImage::from_raw(width, height, rgb).ok_or(InputError::BufferSizeMismatch {
    expected,
    actual: data.len(),
  })
}

/// 生成网络输入张量，同时返回规范化后的原尺寸 RGB 图像
pub fn normalize(
  source: &ImageSource,
  target_width: u32,
  target_height: u32,
) -> Result<(Blob, RgbImage), InputError> {
  if target_width == 0 || target_height == 0 {
    return Err(InputError::InvalidDimensions {
      width: target_width,
      height: target_height,
    });
  }

  let canonical = to_canonical(source)?;
  debug!(
    "输入图像尺寸: {}x{}, 缩放至 {}x{}",
    canonical.width(),
    canonical.height(),
    target_width,
    target_height
  );

  let blob = if canonical.dimensions() == (target_width, target_height) {
    Blob::from_rgb_image(&canonical)
  } else {
    let resized = image::imageops::resize(&canonical, target_width, target_height, RESIZE_FILTER);
    Blob::from_rgb_image(&resized)
  };

  Ok((blob, canonical))
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{DynamicImage, Rgb, RgbaImage};

  #[test]
  fn bgr_buffer_is_swapped_to_rgb() {
    let source = ImageSource::pixel_buffer(2, 1, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
    let image = to_canonical(&source).unwrap();
    assert_eq!(image.get_pixel(0, 0), &Rgb([3, 2, 1]));
    assert_eq!(image.get_pixel(1, 0), &Rgb([6, 5, 4]));
  }

  #[test]
  fn rgba_buffer_drops_alpha() {
    let source = ImageSource::pixel_buffer(1, 1, 4, vec![9, 8, 7, 0]).unwrap();
    let image = to_canonical(&source).unwrap();
    assert_eq!(image.get_pixel(0, 0), &Rgb([9, 8, 7]));
  }

  #[test]
  fn explicit_layouts() {
    let source = ImageSource::PixelBuffer {
      width: 1,
      height: 1,
      layout: PixelLayout::Bgra,
      data: vec![1, 2, 3, 255],
    };
    assert_eq!(to_canonical(&source).unwrap().get_pixel(0, 0), &Rgb([3, 2, 1]));

    let source = ImageSource::PixelBuffer {
      width: 1,
      height: 1,
      layout: PixelLayout::Rgb,
      data: vec![1, 2, 3],
    };
    assert_eq!(to_canonical(&source).unwrap().get_pixel(0, 0), &Rgb([1, 2, 3]));
  }

  #[test]
  fn rejects_bad_buffers() {
    assert!(matches!(
      ImageSource::pixel_buffer(1, 1, 2, vec![0, 0]),
      Err(InputError::UnsupportedChannels(2))
    ));

    let source = ImageSource::pixel_buffer(2, 2, 3, vec![0; 11]).unwrap();
    assert!(matches!(
      to_canonical(&source),
      Err(InputError::BufferSizeMismatch {
        expected: 12,
        actual: 11
      })
    ));

    let source = ImageSource::pixel_buffer(0, 2, 3, vec![]).unwrap();
    assert!(matches!(
      to_canonical(&source),
      Err(InputError::InvalidDimensions { .. })
    ));
  }

  #[test]
  fn decoded_rgba_image_is_converted() {
    let mut rgba = RgbaImage::new(1, 1);
    rgba.put_pixel(0, 0, image::Rgba([5, 6, 7, 8]));
    let source = ImageSource::from(DynamicImage::ImageRgba8(rgba));
    assert_eq!(to_canonical(&source).unwrap().get_pixel(0, 0), &Rgb([5, 6, 7]));
  }

  #[test]
  fn blob_has_target_shape_regardless_of_source_size() {
    for (w, h) in [(1280, 720), (17, 301), (640, 640)] {
      let source = ImageSource::from(RgbImage::from_pixel(w, h, Rgb([255, 128, 0])));
      let (blob, canonical) = normalize(&source, 64, 48).unwrap();
      assert_eq!(blob.shape(), [1, 3, 48, 64]);
      assert_eq!(canonical.dimensions(), (w, h));
      assert!(blob.as_nchw().iter().all(|v| (0.0..=1.0).contains(v)));
      // 纯色图像缩放后颜色不变
      assert_eq!(blob.get(0, 10, 10), Some(1.0));
      assert_eq!(blob.get(2, 10, 10), Some(0.0));
    }
  }

  #[test]
  fn zero_target_is_rejected() {
    let source = ImageSource::from(RgbImage::new(4, 4));
    assert!(matches!(
      normalize(&source, 0, 640),
      Err(InputError::InvalidDimensions { .. })
    ));
  }

  #[test]
  fn normalize_is_pure() {
    let image = RgbImage::from_fn(32, 16, |x, y| Rgb([x as u8 * 8, y as u8 * 16, 7]));
    let source = ImageSource::from(image.clone());
    let (a, _) = normalize(&source, 8, 8).unwrap();
    let (b, canonical) = normalize(&source, 8, 8).unwrap();
    assert_eq!(a, b);
    assert_eq!(canonical, image);
  }
}

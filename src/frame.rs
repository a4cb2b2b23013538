// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - NCHW 输入张量定义
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

use image::RgbImage;

pub const RGB_CHANNELS: usize = 3;

/// 网络输入张量，形状固定为 (1, 3, H, W)，取值范围 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
  width: u32,
  height: u32,
  data: Box<[f32]>,
}

impl Blob {
  /// 从已缩放到网络输入尺寸的 RGB 图像构造张量
  pub fn from_rgb_image(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let plane_size = width as usize * height as usize;
    let mut data = vec![0f32; plane_size * RGB_CHANNELS];

    for (x, y, pixel) in image.enumerate_pixels() {
      let idx = y as usize * width as usize + x as usize;
      for c in 0..RGB_CHANNELS {
        data[c * plane_size + idx] = pixel[c] as f32 / 255.0;
      }
    }

    Self {
      width,
      height,
      data: data.into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// [batch, channels, height, width]
  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, self.height as usize, self.width as usize]
  }

  pub fn as_nchw(&self) -> &[f32] {
    &self.data
  }

  /// 读取 (c, y, x) 处的值
  pub fn get(&self, c: usize, y: u32, x: u32) -> Option<f32> {
    if c >= RGB_CHANNELS || y >= self.height || x >= self.width {
      return None;
    }
    let plane_size = self.width as usize * self.height as usize;
    let idx = c * plane_size + y as usize * self.width as usize + x as usize;
    self.data.get(idx).copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn planar_layout_and_scaling() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 0, 51]));
    image.put_pixel(1, 0, Rgb([0, 255, 102]));

    let blob = Blob::from_rgb_image(&image);
    assert_eq!(blob.shape(), [1, 3, 1, 2]);
    assert_eq!(blob.as_nchw().len(), 6);
    // R 平面
    assert_eq!(blob.get(0, 0, 0), Some(1.0));
    assert_eq!(blob.get(0, 0, 1), Some(0.0));
    // G 平面
    assert_eq!(blob.get(1, 0, 1), Some(1.0));
    // B 平面
    assert!((blob.get(2, 0, 0).unwrap() - 0.2).abs() < 1e-6);
    assert!((blob.get(2, 0, 1).unwrap() - 0.4).abs() < 1e-6);
    assert_eq!(blob.get(3, 0, 0), None);
  }
}

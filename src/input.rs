// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::PathBuf;

use image::DynamicImage;
use thiserror::Error;

mod normalize;
mod read_image_file;

pub use self::normalize::{RESIZE_FILTER, normalize, to_canonical};
pub use self::read_image_file::IMAGE_FILE_SCHEME;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("图像文件不存在: {0}")]
  NotFound(PathBuf),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  DecodeError(#[from] image::ImageError),
  #[error("不支持的通道数: {0}")]
  UnsupportedChannels(usize),
  #[error("像素数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("图像尺寸无效: {width}x{height}")]
  InvalidDimensions { width: u32, height: u32 },
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 交错排列的像素通道顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
  Rgb,
  Bgr,
  Rgba,
  Bgra,
}

impl PixelLayout {
  pub fn channels(&self) -> usize {
    match self {
      PixelLayout::Rgb | PixelLayout::Bgr => 3,
      PixelLayout::Rgba | PixelLayout::Bgra => 4,
    }
  }

  /// 按通道数推断布局：3 通道视为 BGR（OpenCV 习惯），4 通道视为 RGBA
  pub fn from_channels(channels: usize) -> Result<Self, InputError> {
    match channels {
      3 => Ok(PixelLayout::Bgr),
      4 => Ok(PixelLayout::Rgba),
      n => Err(InputError::UnsupportedChannels(n)),
    }
  }
}

/// 待检测的图像来源
#[derive(Debug, Clone)]
pub enum ImageSource {
  /// 图像文件路径
  FilePath(PathBuf),
  /// 内存中的交错像素缓冲区
  PixelBuffer {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
  },
  /// 已解码的图像
  Decoded(DynamicImage),
}

impl ImageSource {
  pub fn file(path: impl Into<PathBuf>) -> Self {
    ImageSource::FilePath(path.into())
  }

  /// 由通道数构造像素缓冲区来源
  pub fn pixel_buffer(
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
  ) -> Result<Self, InputError> {
    Ok(ImageSource::PixelBuffer {
      width,
      height,
      layout: PixelLayout::from_channels(channels)?,
      data,
    })
  }
}

impl From<DynamicImage> for ImageSource {
  fn from(image: DynamicImage) -> Self {
    ImageSource::Decoded(image)
  }
}

impl From<image::RgbImage> for ImageSource {
  fn from(image: image::RgbImage) -> Self {
    ImageSource::Decoded(DynamicImage::ImageRgb8(image))
  }
}

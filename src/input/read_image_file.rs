// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage};
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{ImageSource, InputError},
};

pub const IMAGE_FILE_SCHEME: &str = "image";

impl FromUrlWithScheme for ImageSource {
  const SCHEME: &'static str = IMAGE_FILE_SCHEME;
}

impl FromUrl for ImageSource {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(ImageSource::file(url.path()))
  }
}

/// 读取并解码图像文件，统一转换为 RGB
pub(crate) fn read_image_file(path: &Path) -> Result<RgbImage, InputError> {
  if !path.is_file() {
    error!("图像文件不存在: {}", path.display());
    return Err(InputError::NotFound(path.to_path_buf()));
  }

  let image = ImageReader::open(path)?
    .with_guessed_format()?
    .decode()
    .inspect_err(|e| error!("无法解码图像文件 {}: {}", path.display(), e))?;
  debug!(
    "图像加载成功: {}, 尺寸: {}x{}",
    path.display(),
    image.width(),
    image.height()
  );

  Ok(image.to_rgb8())
}

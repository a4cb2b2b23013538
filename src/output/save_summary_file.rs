// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/save_summary_file.rs - 保存检测摘要 JSON
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

use image::RgbImage;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render, pipeline::DetectionReport};

#[derive(Error, Debug)]
pub enum SaveSummaryFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 将摘要与检测列表写入 JSON 文件
pub struct SaveSummaryFileOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for SaveSummaryFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for SaveSummaryFileOutput {
  type Error = SaveSummaryFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveSummaryFileError::SchemeMismatch);
    }
    Ok(Self::new(uri.path()))
  }
}

impl SaveSummaryFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl Render<RgbImage, DetectionReport> for SaveSummaryFileOutput {
  type Error = SaveSummaryFileError;

  fn render_result(&self, frame: &RgbImage, result: &DetectionReport) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let document = json!({
      "image": { "width": frame.width(), "height": frame.height() },
      "summary": result.summary.to_report_json(),
      "detections": result.detections,
      "timings": result.timings,
    });
    std::fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
    info!("保存检测摘要到文件: {}", self.path.display());

    Ok(())
  }
}

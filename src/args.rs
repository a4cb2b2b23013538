// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use shanan_detect::{
  config::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD},
  detect::SuppressionPolicy,
  DetectConfig,
};

/// 单张图像目标检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址
  /// 支持格式:
  /// - ONNX: onnx:///path/to/yolov5s.onnx?threads=4
  /// - 固定输出: fixed:///path/to/outputs.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像，如 image:///path/to/input.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径，可重复指定
  /// 支持格式:
  /// - 标注图像: image:///path/to/output.png
  /// - 检测摘要: json:///path/to/summary.json
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<Url>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 仅在同一类别内做 NMS
  #[arg(long)]
  pub per_class: bool,

  /// 类别名称文件，每行一个，默认使用 COCO 80 类
  #[arg(long, value_name = "FILE")]
  pub classes: Option<PathBuf>,

  /// 标注字体文件 (TTF/OTF)，用于图像输出
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 记录活动的用户名
  #[arg(long, value_name = "NAME")]
  pub actor: Option<String>,
}

impl Args {
  pub fn detect_config(&self) -> DetectConfig {
    let policy = if self.per_class {
      SuppressionPolicy::PerClass
    } else {
      SuppressionPolicy::SinglePool
    };
    DetectConfig::default()
      .with_confidence_threshold(self.confidence)
      .with_iou_threshold(self.nms_threshold)
      .with_policy(policy)
  }

  /// 输出地址，`--font` 会补到未指定字体的图像输出上
  pub fn output_urls(&self) -> Vec<Url> {
    self
      .output
      .iter()
      .map(|url| {
        let mut url = url.clone();
        if let Some(font) = &self.font
          && url.scheme() == "image"
          && !url.query_pairs().any(|(k, _)| k == "font")
        {
          url
            .query_pairs_mut()
            .append_pair("font", &font.to_string_lossy());
        }
        url
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let args = Args::parse_from([
      "shanan-detect",
      "--model",
      "fixed:///tmp/model.json",
      "--input",
      "image:///tmp/in.png",
    ]);
    let config = args.detect_config();
    assert_eq!(config, DetectConfig::default());
    assert!(args.output.is_empty());
  }

  #[test]
  fn font_is_appended_to_image_outputs() {
    let args = Args::parse_from([
      "shanan-detect",
      "--model",
      "fixed:///tmp/model.json",
      "--input",
      "image:///tmp/in.png",
      "--output",
      "image:///tmp/out.png",
      "--output",
      "json:///tmp/out.json",
      "--font",
      "/fonts/a.ttf",
      "--per-class",
    ]);
    let urls = args.output_urls();
    assert_eq!(urls[0].as_str(), "image:///tmp/out.png?font=%2Ffonts%2Fa.ttf");
    assert_eq!(urls[1].as_str(), "json:///tmp/out.json");
    assert_eq!(args.detect_config().policy, SuppressionPolicy::PerClass);
  }
}

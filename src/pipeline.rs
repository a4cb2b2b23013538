// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pipeline.rs - 单张图像检测流程
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

use std::time::Instant;

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  config::{ConfigError, DetectConfig},
  detect::{DecodeError, Detection, DetectionDecoder, NonMaxSuppressor},
  input::{ImageSource, InputError, normalize},
  model::{ClassTable, InferenceAdapter, RawTensor},
  output::{DetectionSummary, summarize},
};

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("配置错误: {0}")]
  ConfigError(#[from] ConfigError),
  #[error("输入无效: {0}")]
  InvalidInput(#[from] InputError),
  #[error("推理错误: {0}")]
  InferenceError(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("{0}")]
  ModelContractViolation(#[from] DecodeError),
}

/// 各阶段耗时（毫秒）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageTimings {
  pub preprocess_ms: f64,
  pub inference_ms: f64,
  pub postprocess_ms: f64,
}

/// 一次检测的结果。没有检测到目标时 `detections` 为空，并非错误。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
  pub detections: Vec<Detection>,
  pub summary: DetectionSummary,
  /// NMS 之前的候选框数量
  pub candidates_before_nms: usize,
  pub timings: StageTimings,
}

impl DetectionReport {
  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 检测器：归一化、推理、解码、抑制、统计
///
/// 所有方法只借用 `&self`，推理后端满足 `Send + Sync` 时可在线程间共享。
pub struct Detector<A> {
  adapter: A,
  classes: ClassTable,
  config: DetectConfig,
}

impl<A: InferenceAdapter> Detector<A> {
  pub fn new(adapter: A, classes: ClassTable, config: DetectConfig) -> Result<Self, DetectError> {
    config.validate()?;
    Ok(Self {
      adapter,
      classes,
      config,
    })
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  pub fn classes(&self) -> &ClassTable {
    &self.classes
  }

  pub fn adapter(&self) -> &A {
    &self.adapter
  }

  /// 对推理输出做后处理，返回检测结果与 NMS 前的候选框数量
  pub fn postprocess(
    &self,
    outputs: &[RawTensor],
    original_size: (u32, u32),
  ) -> Result<(Vec<Detection>, usize), DetectError> {
    let predictions = outputs
      .first()
      .ok_or_else(|| DecodeError::contract("推理后端没有返回任何输出张量"))?;

    let decoder = DetectionDecoder::new(self.classes.len(), self.config.confidence_threshold);
    let candidates = decoder.decode(predictions, original_size, self.adapter.input_size())?;

    let suppressor = NonMaxSuppressor::new(
      self.config.confidence_threshold,
      self.config.iou_threshold,
      self.config.policy,
    );
    let detections = suppressor
      .survivors(&candidates)
      .into_iter()
      .map(|idx| Detection::from_candidate(&candidates[idx], &self.classes))
      .collect::<Result<Vec<_>, _>>()?;

    Ok((detections, candidates.len()))
  }

  /// 检测单张图像，返回规范化后的 RGB 原图与检测结果
  pub fn detect(&self, source: &ImageSource) -> Result<(RgbImage, DetectionReport), DetectError> {
    let (input_width, input_height) = self.adapter.input_size();

    let now = Instant::now();
    let (blob, image) = normalize(source, input_width, input_height)?;
    let preprocess_ms = now.elapsed().as_secs_f64() * 1000.0;

    let now = Instant::now();
    let outputs = self.adapter.infer(&blob).map_err(|e| {
      error!("推理失败: {}", e);
      DetectError::InferenceError(Box::new(e))
    })?;
    let inference_ms = now.elapsed().as_secs_f64() * 1000.0;
    debug!("推理返回 {} 个输出张量", outputs.len());

    let now = Instant::now();
    let (detections, candidates_before_nms) = self
      .postprocess(&outputs, image.dimensions())
      .inspect_err(|e| error!("后处理失败: {}", e))?;
    let summary = summarize(&detections);
    let postprocess_ms = now.elapsed().as_secs_f64() * 1000.0;

    info!(
      "检测完成: {} 个候选框, 保留 {} 个, 耗时 {:.2}/{:.2}/{:.2} ms",
      candidates_before_nms,
      detections.len(),
      preprocess_ms,
      inference_ms,
      postprocess_ms
    );

    Ok((
      image,
      DetectionReport {
        detections,
        summary,
        candidates_before_nms,
        timings: StageTimings {
          preprocess_ms,
          inference_ms,
          postprocess_ms,
        },
      },
    ))
  }
}

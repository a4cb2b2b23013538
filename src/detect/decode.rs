// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detect/decode.rs - 模型输出解码
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

use tracing::{debug, error};

use crate::{
  detect::{BBox, Candidate, DecodeError},
  model::RawTensor,
};

/// 每行预测的前缀: cx, cy, w, h, objectness
pub const PREDICTION_HEADER_LEN: usize = 5;

/// 将预测表解析为 (行数, 行宽)，接受 [N, D] 或 [1, N, D]
fn prediction_rows(raw: &RawTensor, num_classes: usize) -> Result<(usize, usize), DecodeError> {
  let row_len = PREDICTION_HEADER_LEN + num_classes;

  let (rows, cols) = match raw.shape.as_slice() {
    [rows, cols] => (*rows, *cols),
    [1, rows, cols] => (*rows, *cols),
    shape => {
      error!("预测张量形状无效: {:?}", shape);
      return Err(DecodeError::contract(format!(
        "预测张量形状应为 [N, {}] 或 [1, N, {}], 实际为 {:?}",
        row_len, row_len, shape
      )));
    }
  };

  if cols != row_len {
    error!("预测行宽 {} 与类别数 {} 不匹配", cols, num_classes);
    return Err(DecodeError::contract(format!(
      "预测行宽应为 {} (4 + 1 + {} 类), 实际为 {}",
      row_len, num_classes, cols
    )));
  }

  if raw.data.len() != rows * cols {
    error!(
      "预测张量数据长度不匹配: 期望 {}, 实际 {}",
      rows * cols,
      raw.data.len()
    );
    return Err(DecodeError::contract(format!(
      "预测张量数据长度应为 {}, 实际为 {}",
      rows * cols,
      raw.data.len()
    )));
  }

  Ok((rows, cols))
}

/// 第一个最大值的索引
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for (idx, &score) in scores.iter().enumerate() {
    // NaN 视为最大值，由后续阈值检查拒绝
    if score.is_nan() {
      return Some((idx, score));
    }
    match best {
      Some((_, max)) if score <= max => {}
      _ => best = Some((idx, score)),
    }
  }
  best
}

/// 解码预测表为候选框，坐标缩放回原图
///
/// objectness 需不小于阈值，最高类别分数需严格大于阈值。
pub fn decode(
  raw: &RawTensor,
  num_classes: usize,
  original_size: (u32, u32),
  input_size: (u32, u32),
  confidence_threshold: f32,
) -> Result<Vec<Candidate>, DecodeError> {
  if input_size.0 == 0 || input_size.1 == 0 {
    return Err(DecodeError::contract(format!(
      "网络输入尺寸无效: {}x{}",
      input_size.0, input_size.1
    )));
  }

  let (rows, row_len) = prediction_rows(raw, num_classes)?;

  let x_factor = original_size.0 as f32 / input_size.0 as f32;
  let y_factor = original_size.1 as f32 / input_size.1 as f32;

  let mut candidates = Vec::new();
  for row in raw.data.chunks_exact(row_len) {
    let objectness = row[4];
    if objectness.is_nan() || objectness < confidence_threshold {
      continue;
    }

    let Some((class_id, class_score)) = argmax(&row[PREDICTION_HEADER_LEN..]) else {
      continue;
    };
    if class_score.is_nan() || class_score <= confidence_threshold {
      continue;
    }

    let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
    // as 转换向零截断
    let bbox = BBox {
      left: ((cx - w / 2.0) * x_factor) as i32,
      top: ((cy - h / 2.0) * y_factor) as i32,
      width: (w * x_factor) as i32,
      height: (h * y_factor) as i32,
    };

    candidates.push(Candidate {
      bbox,
      confidence: objectness,
      class_id,
    });
  }

  debug!("{} 行预测中 {} 个候选框通过阈值", rows, candidates.len());
  Ok(candidates)
}

/// 绑定类别数与阈值的解码器
#[derive(Debug, Clone, Copy)]
pub struct DetectionDecoder {
  pub num_classes: usize,
  pub confidence_threshold: f32,
}

impl DetectionDecoder {
  pub fn new(num_classes: usize, confidence_threshold: f32) -> Self {
    Self {
      num_classes,
      confidence_threshold,
    }
  }

  pub fn decode(
    &self,
    raw: &RawTensor,
    original_size: (u32, u32),
    input_size: (u32, u32),
  ) -> Result<Vec<Candidate>, DecodeError> {
    decode(
      raw,
      self.num_classes,
      original_size,
      input_size,
      self.confidence_threshold,
    )
  }
}

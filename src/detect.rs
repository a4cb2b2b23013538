// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detect.rs - 检测结果解码与非极大值抑制
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

use serde::Serialize;
use thiserror::Error;

use crate::model::ClassTable;

mod decode;
mod nms;

pub use self::decode::{DetectionDecoder, PREDICTION_HEADER_LEN, decode};
pub use self::nms::{NonMaxSuppressor, SuppressionPolicy, iou, suppress};

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
  #[error("模型输出不符合约定: {0}")]
  ModelContractViolation(String),
}

impl DecodeError {
  pub fn contract(msg: impl Into<String>) -> Self {
    DecodeError::ModelContractViolation(msg.into())
  }
}

/// 原图像素坐标下的边界框
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BBox {
  pub left: i32,
  pub top: i32,
  pub width: i32,
  pub height: i32,
}

impl BBox {
  pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
    Self {
      left,
      top,
      width,
      height,
    }
  }

  /// 右边界，溢出时饱和
  pub fn right(&self) -> i32 {
    self.left.saturating_add(self.width)
  }

  pub fn bottom(&self) -> i32 {
    self.top.saturating_add(self.height)
  }

  pub fn area(&self) -> f32 {
    self.width.max(0) as f32 * self.height.max(0) as f32
  }
}

/// 抑制前的候选检测
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
  pub bbox: BBox,
  /// 目标置信度（objectness）
  pub confidence: f32,
  pub class_id: usize,
}

/// 最终检测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub class_id: usize,
  pub class_name: String,
  pub bbox: BBox,
  pub confidence: f32,
}

impl Detection {
  /// 查找类别名称，索引越界说明模型与类别表不匹配
  pub fn from_candidate(candidate: &Candidate, classes: &ClassTable) -> Result<Self, DecodeError> {
    let class_name = classes.get(candidate.class_id).ok_or_else(|| {
      DecodeError::contract(format!(
        "类别索引 {} 超出类别表范围 (共 {} 类)",
        candidate.class_id,
        classes.len()
      ))
    })?;

    Ok(Self {
      class_id: candidate.class_id,
      class_name: class_name.to_string(),
      bbox: candidate.bbox,
      confidence: candidate.confidence,
    })
  }

  /// 标签文本，如 `person 0.90`
  pub fn label(&self) -> String {
    format!("{} {:.2}", self.class_name, self.confidence)
  }
}

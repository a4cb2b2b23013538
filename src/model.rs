// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Blob};

/// 推理后端。实现者需保证可在多个线程中同时调用 `infer`。
pub trait InferenceAdapter: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 网络输入尺寸 (宽, 高)
  fn input_size(&self) -> (u32, u32);

  /// 第一个输出张量为预测表
  fn infer(&self, blob: &Blob) -> Result<Vec<RawTensor>, Self::Error>;
}

/// 推理输出的原始张量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTensor {
  pub shape: Vec<usize>,
  pub data: Vec<f32>,
}

impl RawTensor {
  pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
    Self { shape, data }
  }

  /// 由若干行预测构造 [1, N, D] 张量
  pub fn from_rows<R: AsRef<[f32]>>(rows: &[R], row_len: usize) -> Self {
    let mut data = Vec::with_capacity(rows.len() * row_len);
    for row in rows {
      data.extend_from_slice(row.as_ref());
    }
    Self {
      shape: vec![1, rows.len(), row_len],
      data,
    }
  }
}

mod fixed;
mod labels;
#[cfg(feature = "onnx_runtime")]
mod onnx;

pub use self::fixed::{FixedOutputAdapter, FixedOutputError};
pub use self::labels::{COCO_CLASSES, ClassTable, ClassTableError};
#[cfg(feature = "onnx_runtime")]
pub use self::onnx::{OnnxAdapter, OnnxAdapterBuilder, OnnxAdapterError};

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("固定输出模型错误: {0}")]
  FixedOutputError(#[from] FixedOutputError),
  #[cfg(feature = "onnx_runtime")]
  #[error("ONNX 模型错误: {0}")]
  OnnxAdapterError(#[from] OnnxAdapterError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 按 URL 方案选择推理后端
pub enum ModelWrapper {
  Fixed(FixedOutputAdapter),
  #[cfg(feature = "onnx_runtime")]
  Onnx(OnnxAdapter),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      FixedOutputAdapter::SCHEME => Ok(ModelWrapper::Fixed(FixedOutputAdapter::from_url(url)?)),
      #[cfg(feature = "onnx_runtime")]
      OnnxAdapterBuilder::SCHEME => Ok(ModelWrapper::Onnx(
        OnnxAdapterBuilder::from_url(url)?.build()?,
      )),
      scheme => Err(ModelError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl InferenceAdapter for ModelWrapper {
  type Error = ModelError;

  fn input_size(&self) -> (u32, u32) {
    match self {
      ModelWrapper::Fixed(model) => model.input_size(),
      #[cfg(feature = "onnx_runtime")]
      ModelWrapper::Onnx(model) => model.input_size(),
    }
  }

  fn infer(&self, blob: &Blob) -> Result<Vec<RawTensor>, Self::Error> {
    match self {
      ModelWrapper::Fixed(model) => model.infer(blob).map_err(ModelError::from),
      #[cfg(feature = "onnx_runtime")]
      ModelWrapper::Onnx(model) => model.infer(blob).map_err(ModelError::from),
    }
  }
}

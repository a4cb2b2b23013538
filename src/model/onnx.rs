// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理后端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Mutex;

use ort::{session::Session, value::Value};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Blob,
  model::{InferenceAdapter, RawTensor},
};

const ONNX_NUM_INPUTS: usize = 1;
const ONNX_DEFAULT_INPUT_W: u32 = 640;
const ONNX_DEFAULT_INPUT_H: u32 = 640;

#[derive(Error, Debug)]
pub enum OnnxAdapterError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("推理会话锁已损坏")]
  SessionPoisoned,
  #[error("输入张量形状不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  InputShapeMismatch {
    expected: [usize; 4],
    actual: [usize; 4],
  },
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

pub struct OnnxAdapterBuilder {
  model_path: String,
  intra_threads: usize,
}

impl FromUrlWithScheme for OnnxAdapterBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxAdapterBuilder {
  type Error = OnnxAdapterError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxAdapterError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let intra_threads = url
      .query_pairs()
      .find(|(k, _)| k == "threads")
      .and_then(|(_, v)| v.parse().ok())
      .unwrap_or(1);

    Ok(OnnxAdapterBuilder {
      model_path: url.path().to_string(),
      intra_threads,
    })
  }
}

impl OnnxAdapterBuilder {
  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = threads;
    self
  }

  pub fn build(self) -> Result<OnnxAdapter, OnnxAdapterError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let session = Session::builder()?
      .with_intra_threads(self.intra_threads)?
      .commit_from_memory(&model_data)?;
    info!("模型加载完成");

    if session.inputs.len() != ONNX_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS,
        session.inputs.len()
      );
      return Err(OnnxAdapterError::ModelInvalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS,
        session.inputs.len()
      )));
    }
    if session.outputs.is_empty() {
      return Err(OnnxAdapterError::ModelInvalid("模型没有输出".to_string()));
    }

    // 动态维度（-1）时使用默认输入尺寸
    let (input_width, input_height) = session.inputs[0]
      .input_type
      .tensor_dimensions()
      .map(|dims| dims.iter().copied().collect::<Vec<i64>>())
      .filter(|dims| dims.len() == 4 && dims[2] > 0 && dims[3] > 0)
      .map(|dims| (dims[3] as u32, dims[2] as u32))
      .unwrap_or((ONNX_DEFAULT_INPUT_W, ONNX_DEFAULT_INPUT_H));

    debug!("模型输入尺寸: {}x{}", input_width, input_height);
    debug!("模型输出数量: {}", session.outputs.len());

    Ok(OnnxAdapter {
      session: Mutex::new(session),
      input_width,
      input_height,
    })
  }
}

/// 基于 ONNX Runtime 的推理后端，会话以互斥锁保护
pub struct OnnxAdapter {
  session: Mutex<Session>,
  input_width: u32,
  input_height: u32,
}

impl InferenceAdapter for OnnxAdapter {
  type Error = OnnxAdapterError;

  fn input_size(&self) -> (u32, u32) {
    (self.input_width, self.input_height)
  }

  fn infer(&self, blob: &Blob) -> Result<Vec<RawTensor>, Self::Error> {
    let expected = [1, 3, self.input_height as usize, self.input_width as usize];
    if blob.shape() != expected {
      return Err(OnnxAdapterError::InputShapeMismatch {
        expected,
        actual: blob.shape(),
      });
    }

    let shape: Vec<i64> = blob.shape().iter().map(|&d| d as i64).collect();
    let input = Value::from_array((shape, blob.as_nchw().to_vec()))?;

    let mut session = self
      .session
      .lock()
      .map_err(|_| OnnxAdapterError::SessionPoisoned)?;

    debug!("执行模型推理");
    let outputs = session.run(ort::inputs![input])?;

    let mut tensors = Vec::with_capacity(outputs.len());
    for (_, value) in outputs.iter() {
      let (shape, data) = value.try_extract_tensor::<f32>()?;
      tensors.push(RawTensor {
        shape: shape.iter().map(|&d| d as usize).collect(),
        data: data.to_vec(),
      });
    }
    debug!("获取 {} 个输出张量", tensors.len());

    Ok(tensors)
  }
}

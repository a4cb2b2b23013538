// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/fixed.rs - 固定输出的推理后端
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Blob,
  model::{InferenceAdapter, RawTensor},
};

const DEFAULT_INPUT_W: u32 = 640;
const DEFAULT_INPUT_H: u32 = 640;

#[derive(Error, Debug)]
pub enum FixedOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输入张量形状不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  InputShapeMismatch {
    expected: [usize; 4],
    actual: [usize; 4],
  },
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 总是返回同一组输出张量，用于测试或回放已保存的推理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedOutputAdapter {
  #[serde(default = "default_input_w")]
  input_width: u32,
  #[serde(default = "default_input_h")]
  input_height: u32,
  outputs: Vec<RawTensor>,
}

fn default_input_w() -> u32 {
  DEFAULT_INPUT_W
}

fn default_input_h() -> u32 {
  DEFAULT_INPUT_H
}

impl FixedOutputAdapter {
  pub fn new(input_size: (u32, u32), outputs: Vec<RawTensor>) -> Self {
    Self {
      input_width: input_size.0,
      input_height: input_size.1,
      outputs,
    }
  }

  pub fn from_json(json: &str) -> Result<Self, FixedOutputError> {
    Ok(serde_json::from_str(json)?)
  }
}

impl FromUrlWithScheme for FixedOutputAdapter {
  const SCHEME: &'static str = "fixed";
}

impl FromUrl for FixedOutputAdapter {
  type Error = FixedOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(FixedOutputError::SchemeMismatch(url.scheme().to_string()));
    }

    info!("加载固定输出文件: {}", url.path());
    let json = std::fs::read_to_string(url.path())?;
    let adapter = Self::from_json(&json)?;
    debug!(
      "输入尺寸: {}x{}, 输出张量数量: {}",
      adapter.input_width,
      adapter.input_height,
      adapter.outputs.len()
    );
    Ok(adapter)
  }
}

impl InferenceAdapter for FixedOutputAdapter {
  type Error = FixedOutputError;

  fn input_size(&self) -> (u32, u32) {
    (self.input_width, self.input_height)
  }

  fn infer(&self, blob: &Blob) -> Result<Vec<RawTensor>, Self::Error> {
    let expected = [1, 3, self.input_height as usize, self.input_width as usize];
    if blob.shape() != expected {
      return Err(FixedOutputError::InputShapeMismatch {
        expected,
        actual: blob.shape(),
      });
    }
    Ok(self.outputs.clone())
  }
}

// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detect/nms.rs - 非极大值抑制
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

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detect::{BBox, Candidate};

/// 哪些候选框之间会相互抑制
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuppressionPolicy {
  /// 所有类别放在同一个池中抑制
  #[default]
  SinglePool,
  /// 只在同类别之间抑制
  PerClass,
}

impl SuppressionPolicy {
  fn competes(&self, a: &Candidate, b: &Candidate) -> bool {
    match self {
      SuppressionPolicy::SinglePool => true,
      SuppressionPolicy::PerClass => a.class_id == b.class_id,
    }
  }
}

/// 计算两个边界框的 IoU，两个框面积均为零时视为完全重叠
pub fn iou(a: &BBox, b: &BBox) -> f32 {
  let area_a = a.area();
  let area_b = b.area();
  if area_a + area_b <= f32::EPSILON {
    return 1.0;
  }

  // i64 下计算边界，避免大坐标溢出
  let x1 = (a.left as i64).max(b.left as i64);
  let y1 = (a.top as i64).max(b.top as i64);
  let x2 = (a.left as i64 + a.width as i64).min(b.left as i64 + b.width as i64);
  let y2 = (a.top as i64 + a.height as i64).min(b.top as i64 + b.height as i64);

  let intersection = (x2 - x1).max(0) as f32 * (y2 - y1).max(0) as f32;
  let union = area_a + area_b - intersection;

  intersection / union
}

/// 贪心非极大值抑制，返回保留下来的候选框索引（按置信度降序）
///
/// 只有置信度严格大于 `confidence_threshold` 的候选框参与；
/// 置信度相同时先出现者优先。
pub fn suppress(
  candidates: &[Candidate],
  confidence_threshold: f32,
  iou_threshold: f32,
  policy: SuppressionPolicy,
) -> Vec<usize> {
  let mut order: Vec<usize> = (0..candidates.len())
    .filter(|&i| candidates[i].confidence > confidence_threshold)
    .collect();
  // sort_by 是稳定排序
  order.sort_by(|&a, &b| {
    candidates[b]
      .confidence
      .total_cmp(&candidates[a].confidence)
  });

  let mut keep: Vec<usize> = Vec::new();
  for idx in order {
    let candidate = &candidates[idx];
    let suppressed = keep.iter().any(|&kept| {
      let best = &candidates[kept];
      policy.competes(best, candidate) && iou(&best.bbox, &candidate.bbox) > iou_threshold
    });
    if !suppressed {
      keep.push(idx);
    }
  }

  debug!("NMS: {} 个候选框保留 {} 个", candidates.len(), keep.len());
  keep
}

#[derive(Debug, Clone, Copy)]
pub struct NonMaxSuppressor {
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  pub policy: SuppressionPolicy,
}

impl NonMaxSuppressor {
  pub fn new(confidence_threshold: f32, iou_threshold: f32, policy: SuppressionPolicy) -> Self {
    Self {
      confidence_threshold,
      iou_threshold,
      policy,
    }
  }

  pub fn survivors(&self, candidates: &[Candidate]) -> Vec<usize> {
    suppress(
      candidates,
      self.confidence_threshold,
      self.iou_threshold,
      self.policy,
    )
  }

  /// 保留下来的候选框
  pub fn apply(&self, candidates: &[Candidate]) -> Vec<Candidate> {
    self
      .survivors(candidates)
      .into_iter()
      .map(|idx| candidates[idx].clone())
      .collect()
  }
}

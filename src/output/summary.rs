// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/summary.rs - 检测结果统计
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

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::{
  detect::{Candidate, DecodeError, Detection},
  model::ClassTable,
};

/// 单个类别的统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassStats {
  pub count: usize,
  pub confidences: Vec<f32>,
}

impl ClassStats {
  fn push(&mut self, confidence: f32) {
    self.count += 1;
    self.confidences.push(confidence);
  }

  /// 平均值在 f64 下累加
  pub fn average(&self) -> Option<f64> {
    if self.confidences.is_empty() {
      return None;
    }
    let sum: f64 = self.confidences.iter().map(|&c| f64::from(c)).sum();
    Some(sum / self.confidences.len() as f64)
  }

  pub fn min(&self) -> Option<f32> {
    self.confidences.iter().copied().reduce(f32::min)
  }

  pub fn max(&self) -> Option<f32> {
    self.confidences.iter().copied().reduce(f32::max)
  }
}

/// 按类别名称分组的检测统计，类别按首次出现的顺序排列
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionSummary {
  classes: Vec<(String, ClassStats)>,
}

impl DetectionSummary {
  fn push(&mut self, class_name: &str, confidence: f32) {
    match self.classes.iter_mut().find(|(name, _)| name == class_name) {
      Some((_, stats)) => stats.push(confidence),
      None => {
        let mut stats = ClassStats::default();
        stats.push(confidence);
        self.classes.push((class_name.to_string(), stats));
      }
    }
  }

  pub fn is_empty(&self) -> bool {
    self.classes.is_empty()
  }

  /// 检测总数
  pub fn total(&self) -> usize {
    self.classes.iter().map(|(_, stats)| stats.count).sum()
  }

  pub fn get(&self, class_name: &str) -> Option<&ClassStats> {
    self
      .classes
      .iter()
      .find(|(name, _)| name == class_name)
      .map(|(_, stats)| stats)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &ClassStats)> {
    self.classes.iter().map(|(name, stats)| (name.as_str(), stats))
  }

  /// 类别名称到数量的映射
  pub fn counts(&self) -> BTreeMap<String, usize> {
    self
      .classes
      .iter()
      .map(|(name, stats)| (name.clone(), stats.count))
      .collect()
  }

  /// 类别名称到置信度列表的映射
  pub fn confidences(&self) -> BTreeMap<String, Vec<f32>> {
    self
      .classes
      .iter()
      .map(|(name, stats)| (name.clone(), stats.confidences.clone()))
      .collect()
  }

  /// 面向用户展示的 JSON 摘要，类别按数量降序，统计值保留两位小数
  pub fn to_report_json(&self) -> Value {
    if self.is_empty() {
      return json!({ "Notice": "No objects detected" });
    }

    let mut sorted: Vec<_> = self.classes.iter().collect();
    sorted.sort_by(|a, b| b.1.count.cmp(&a.1.count));

    let mut objects = Map::new();
    for (name, stats) in sorted {
      objects.insert(
        name.clone(),
        json!({
          "Count": stats.count,
          "Confidence Stats": {
            "Average": round2(stats.average()),
            "Min": round2(stats.min().map(f64::from)),
            "Max": round2(stats.max().map(f64::from)),
          }
        }),
      );
    }

    json!({
      "Total Objects Detected": self.total(),
      "Detected Objects List": objects,
    })
  }
}

/// 保留两位小数，恰好居中时取偶数
fn round2(value: Option<f64>) -> Option<f64> {
  value.map(|v| (v * 100.0).round_ties_even() / 100.0)
}

/// 统计已命名的检测结果
pub fn summarize(detections: &[Detection]) -> DetectionSummary {
  let mut summary = DetectionSummary::default();
  for detection in detections {
    summary.push(&detection.class_name, detection.confidence);
  }
  summary
}

/// 统计抑制后的候选框，类别索引越界时报错
pub fn summarize_candidates(
  survivors: &[Candidate],
  classes: &ClassTable,
) -> Result<DetectionSummary, DecodeError> {
  let mut summary = DetectionSummary::default();
  for candidate in survivors {
    let detection = Detection::from_candidate(candidate, classes)?;
    summary.push(&detection.class_name, detection.confidence);
  }
  Ok(summary)
}

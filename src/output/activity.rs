// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/activity.rs - 检测活动记录
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

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::output::DetectionSummary;

/// 一次检测的活动记录，交给外部日志系统持久化
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
  pub username: String,
  pub timestamp: DateTime<Local>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_detected_objects: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detected_objects: Option<BTreeMap<String, usize>>,
}

impl ActivityRecord {
  pub fn new(actor: impl Into<String>, summary: &DetectionSummary) -> Self {
    Self::at(actor, summary, Local::now())
  }

  pub fn at(actor: impl Into<String>, summary: &DetectionSummary, timestamp: DateTime<Local>) -> Self {
    // 没有检测结果时只记录用户与时间
    let (total, objects) = if summary.is_empty() {
      (None, None)
    } else {
      (Some(summary.total()), Some(summary.counts()))
    };

    Self {
      username: actor.into(),
      timestamp,
      total_detected_objects: total,
      detected_objects: objects,
    }
  }
}

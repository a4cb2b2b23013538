// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 检测任务
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

use std::time::{Duration, Instant};

use image::RgbImage;
use tracing::{info, warn};

use crate::{
  input::ImageSource,
  model::InferenceAdapter,
  output::Render,
  pipeline::{DetectionReport, Detector},
};

pub trait Task<A, O>: Sized {
  type Output;
  type Error;
  fn run_task(
    self,
    source: &ImageSource,
    detector: &Detector<A>,
    output: &O,
  ) -> Result<Self::Output, Self::Error>;
}

/// 检测一次并渲染输出
pub struct OneShotTask;

impl<
  A: InferenceAdapter,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<RgbImage, DetectionReport, Error = RE>,
> Task<A, O> for OneShotTask
{
  type Output = DetectionReport;
  type Error = anyhow::Error;

  fn run_task(
    self,
    source: &ImageSource,
    detector: &Detector<A>,
    output: &O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let now = Instant::now();
    let (image, report) = detector.detect(source)?;
    info!("检测完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&image, &report)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(report)
  }
}

/// 重复检测同一张图像，统计平均耗时
pub struct RepeatShotTask {
  repeat_times: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat_times: 100,
      warmup: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times;
    self
  }

  pub fn with_warmup(mut self, warmup: usize) -> Self {
    self.warmup = warmup;
    self
  }
}

#[derive(Debug, Clone)]
pub struct RepeatShotStats {
  pub report: DetectionReport,
  pub times: Vec<Duration>,
  /// 去掉预热轮次后的平均耗时
  pub average: Duration,
}

impl<
  A: InferenceAdapter,
  RE: std::error::Error + Sync + Send + 'static,
  O: Render<RgbImage, DetectionReport, Error = RE>,
> Task<A, O> for RepeatShotTask
{
  type Output = RepeatShotStats;
  type Error = anyhow::Error;

  fn run_task(
    self,
    source: &ImageSource,
    detector: &Detector<A>,
    output: &O,
  ) -> Result<Self::Output, Self::Error> {
    if self.repeat_times == 0 {
      anyhow::bail!("重复次数必须大于 0");
    }

    info!("开始任务...");
    let mut times = Vec::with_capacity(self.repeat_times);
    let mut last = None;
    for i in 0..self.repeat_times {
      let now = Instant::now();
      let (image, report) = detector.detect(source)?;
      let elapsed = now.elapsed();
      info!("({})检测完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some((image, report));
    }

    let (image, report) = last.ok_or_else(|| anyhow::anyhow!("没有检测结果"))?;
    output.render_result(&image, &report)?;

    let measured = if times.len() > self.warmup {
      &times[self.warmup..]
    } else {
      &times[..]
    };
    let average = measured.iter().sum::<Duration>() / measured.len() as u32;
    warn!("平均检测时间: {:.2?}", average);

    Ok(RepeatShotStats {
      report,
      times,
      average,
    })
  }
}

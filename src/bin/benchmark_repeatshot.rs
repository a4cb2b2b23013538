// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复检测同一张图像，统计耗时
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use shanan_detect::{
  DetectConfig, Detector, FromUrl,
  input::ImageSource,
  model::{ClassTable, ModelWrapper},
  output::OutputWrapper,
  task::{RepeatShotTask, Task},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<Url>,
  /// 重复次数
  #[arg(long, default_value_t = 100)]
  pub times: usize,
  /// 不计入平均值的预热次数
  #[arg(long, default_value_t = 2)]
  pub warmup: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);

  let source = ImageSource::from_url(&args.input)?;
  let model = ModelWrapper::from_url(&args.model)?;
  let detector = Detector::new(model, ClassTable::coco(), DetectConfig::default())?;
  let outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let stats = RepeatShotTask::default()
    .with_repeat_times(args.times)
    .with_warmup(args.warmup)
    .run_task(&source, &detector, &outputs)?;

  info!(
    "共 {} 次, 平均 {:.2?}, 检测到 {} 个目标",
    stats.times.len(),
    stats.average,
    stats.report.detections.len()
  );

  Ok(())
}

// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shanan_detect::{
  Detector, FromUrl,
  input::ImageSource,
  model::{ClassTable, ModelWrapper},
  output::{ActivityRecord, OutputWrapper},
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);

  let classes = match &args.classes {
    Some(path) => ClassTable::from_file(path)?,
    None => ClassTable::coco(),
  };
  info!("类别数: {}", classes.len());

  let model = ModelWrapper::from_url(&args.model)?;
  let detector = Detector::new(model, classes, args.detect_config())?;
  let source = ImageSource::from_url(&args.input)?;
  let outputs = args
    .output_urls()
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;

  let report = OneShotTask.run_task(&source, &detector, &outputs)?;

  println!("{}", serde_json::to_string_pretty(&report.summary.to_report_json())?);

  if let Some(actor) = &args.actor {
    let record = ActivityRecord::new(actor.as_str(), &report.summary);
    info!("活动记录: {}", serde_json::to_string(&record)?);
  }

  Ok(())
}

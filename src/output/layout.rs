// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/layout.rs - 标注颜色与标签布局
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::Rgb;

use crate::detect::BBox;

/// 标签与边框之间的间距
pub const LABEL_MARGIN: i32 = 5;
/// 文本基线以下保留的高度
pub const LABEL_BASELINE: i32 = 3;

/// 每个类别的固定颜色
pub fn color_for(class_id: usize) -> Rgb<u8> {
  // 黄金分割步进色相，相邻类别颜色差异明显
  const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_895;
  let hue = ((class_id as f64 * GOLDEN_RATIO_CONJUGATE).fract() * 360.0) as f32;
  hsv_to_rgb(hue, 0.8, 0.9)
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPlacement {
  Above,
  Below,
}

/// 标签背景与文本的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
  pub placement: LabelPlacement,
  pub rect_left: i32,
  pub rect_top: i32,
  pub rect_width: u32,
  pub rect_height: u32,
  /// 文本左上角
  pub text_x: i32,
  pub text_y: i32,
}

/// 默认将标签放在框上方；框顶部离图像上边缘太近时放到框下方
pub fn label_layout(bbox: &BBox, text_width: u32, text_height: u32) -> LabelLayout {
  let text_h = text_height as i32;

  // 坐标运算均饱和，超大框不会溢出
  let (placement, baseline_y) =
    if bbox.top < text_h.saturating_add(LABEL_BASELINE + LABEL_MARGIN) {
      (
        LabelPlacement::Below,
        bbox
          .bottom()
          .saturating_add(text_h)
          .saturating_add(LABEL_MARGIN),
      )
    } else {
      (LabelPlacement::Above, bbox.top.saturating_sub(LABEL_MARGIN))
    };

  LabelLayout {
    placement,
    rect_left: bbox.left,
    rect_top: baseline_y
      .saturating_sub(text_h)
      .saturating_sub(LABEL_BASELINE),
    rect_width: text_width,
    rect_height: text_height.saturating_add(2 * LABEL_BASELINE as u32),
    text_x: bbox.left,
    text_y: baseline_y.saturating_sub(text_h),
  }
}

// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  detect::Detection,
  output::layout::{color_for, label_layout},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_CHAR_WIDTH: f32 = 0.55; // 无字体时按字号估算字符宽度
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 在图像副本上绘制检测框与标签。未加载字体时只绘制框和标签底色。
pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
    }
  }
}

impl Draw {
  pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    self.font = Some(FontVec::try_from_vec(data)?);
    info!("加载标签字体: {}", path.display());
    Ok(self)
  }

  pub fn with_font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  fn text_size(&self, label: &str) -> (u32, u32) {
    let scale = PxScale::from(self.font_size);
    match &self.font {
      Some(font) => text_size(scale, font, label),
      None => (
        (label.chars().count() as f32 * self.font_size * LABEL_CHAR_WIDTH) as u32,
        (self.font_size * 0.75) as u32,
      ),
    }
  }

  fn draw_detection(&self, image: &mut RgbImage, detection: &Detection) {
    let bbox = &detection.bbox;
    if bbox.width <= 0 || bbox.height <= 0 {
      debug!("跳过空边界框: {:?}", bbox);
      return;
    }

    let color = color_for(detection.class_id);

    // 绘制边框（加粗为2像素）
    for t in 0..BOX_THICKNESS as i64 {
      let width = bbox.width as i64 - 2 * t;
      let height = bbox.height as i64 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let ring = clip_to_canvas(
        image.dimensions(),
        bbox.left as i64 + t,
        bbox.top as i64 + t,
        width,
        height,
      );
      if let Some(rect) = ring {
        draw_hollow_rect_mut(image, rect, color);
      }
    }

    let label = detection.label();
    let (text_width, text_height) = self.text_size(&label);
    if text_width == 0 || text_height == 0 {
      return;
    }

    let layout = label_layout(bbox, text_width, text_height);
    let Some(background) = clip_to_canvas(
      image.dimensions(),
      layout.rect_left as i64,
      layout.rect_top as i64,
      layout.rect_width as i64,
      layout.rect_height as i64,
    ) else {
      debug!("标签位于图像之外: {:?}", bbox);
      return;
    };
    draw_filled_rect_mut(image, background, color);

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        LABEL_TEXT_COLOR,
        layout.text_x,
        layout.text_y,
        PxScale::from(self.font_size),
        font,
        &label,
      );
    }
  }

  /// 返回绘制后的新图像，不修改输入
  pub fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.clone();
    for detection in detections {
      self.draw_detection(&mut canvas, detection);
    }
    canvas
  }
}

/// 将矩形裁剪到画布附近。被裁掉的边落在画布之外，不会画出；与画布不相交时返回 `None`。
fn clip_to_canvas(
  (canvas_width, canvas_height): (u32, u32),
  left: i64,
  top: i64,
  width: i64,
  height: i64,
) -> Option<Rect> {
  let (right, bottom) = (left + width, top + height);
  let (canvas_width, canvas_height) = (canvas_width as i64, canvas_height as i64);
  if width <= 0 || height <= 0 {
    return None;
  }
  if right <= 0 || bottom <= 0 || left >= canvas_width || top >= canvas_height {
    return None;
  }

  let margin = BOX_THICKNESS as i64 + 1;
  let x0 = left.max(-margin);
  let y0 = top.max(-margin);
  let x1 = right.min(canvas_width + margin);
  let y1 = bottom.min(canvas_height + margin);
  Some(Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::BBox;

  fn detection(left: i32, top: i32, width: i32, height: i32, class_id: usize) -> Detection {
    Detection {
      class_id,
      class_name: "person".to_string(),
      bbox: BBox::new(left, top, width, height),
      confidence: 0.9,
    }
  }

  #[test]
  fn annotate_leaves_input_untouched() {
    let image = RgbImage::new(64, 64);
    let draw = Draw::default();
    let annotated = draw.annotate(&image, &[detection(10, 30, 20, 20, 0)]);

    assert!(image.pixels().all(|p| p == &Rgb([0, 0, 0])));
    assert_eq!(annotated.dimensions(), (64, 64));
    let color = color_for(0);
    // 左上角与内圈边框
    assert_eq!(annotated.get_pixel(10, 30), &color);
    assert_eq!(annotated.get_pixel(11, 31), &color);
    // 框内部不填充
    assert_eq!(annotated.get_pixel(20, 40), &Rgb([0, 0, 0]));
  }

  #[test]
  fn label_background_is_drawn_below_near_top() {
    let image = RgbImage::new(128, 128);
    let draw = Draw::default();
    let annotated = draw.annotate(&image, &[detection(10, 0, 40, 20, 3)]);
    let color = color_for(3);
    // 框下方出现标签底色
    let below = (21..60).any(|y| annotated.get_pixel(12, y) == &color);
    assert!(below);
  }

  #[test]
  fn boxes_outside_the_image_are_clipped() {
    let image = RgbImage::new(16, 16);
    let draw = Draw::default();
    let annotated = draw.annotate(
      &image,
      &[detection(-20, -20, 100, 100, 1), detection(5, 5, 0, 3, 1)],
    );
    assert_eq!(annotated.dimensions(), (16, 16));
  }

  #[test]
  fn saturated_boxes_are_drawn_without_overflow() {
    let image = RgbImage::new(32, 32);
    let draw = Draw::default();
    let annotated = draw.annotate(
      &image,
      &[
        detection(1_500_000_000, 10, i32::MAX, 4, 0),
        detection(i32::MIN, i32::MIN, i32::MAX, i32::MAX, 1),
        detection(-10, 8, i32::MAX, 10, 2),
      ],
    );
    assert_eq!(annotated.dimensions(), (32, 32));
    // 只有第三个框与画布相交：上边线可见，右边线在画布外
    let color = color_for(2);
    assert_eq!(annotated.get_pixel(0, 8), &color);
    assert_eq!(annotated.get_pixel(31, 8), &color);
    assert_ne!(annotated.get_pixel(31, 12), &color);
  }

  #[test]
  fn clipped_rects_keep_outside_edges_off_canvas() {
    let rect = clip_to_canvas((16, 16), -100, 4, 1000, 4).unwrap();
    assert!(rect.left() < 0);
    assert!(rect.right() >= 16);
    assert_eq!((rect.top(), rect.height()), (4, 4));
    assert!(clip_to_canvas((16, 16), 16, 0, 4, 4).is_none());
    assert!(clip_to_canvas((16, 16), -8, 0, 8, 4).is_none());
  }

  #[test]
  fn missing_font_file_is_an_error() {
    assert!(matches!(
      Draw::default().with_font_file("/no/such/font.ttf"),
      Err(DrawError::IoError(_))
    ));
  }
}

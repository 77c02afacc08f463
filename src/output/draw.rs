// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Detection;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_OFFSET_Y: i32 = 25;
const LABEL_CHAR_WIDTH: f32 = 8.0; // 无字体时估算每字符宽度
const LABEL_TEXT_HEIGHT: u32 = 18;
const BOX_LINE_WIDTH: i32 = 3;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// 按检测结果在列表中的位置循环取色
pub const PALETTE: [[u8; 3]; 8] = [
  [255, 0, 0],   // red
  [0, 0, 255],   // blue
  [0, 128, 0],   // green
  [255, 255, 0], // yellow
  [128, 0, 128], // purple
  [255, 165, 0], // orange
  [0, 255, 255], // cyan
  [255, 0, 255], // magenta
];

/// 常见系统字体位置
const SYSTEM_FONT_PATHS: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
  "/Library/Fonts/Arial.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("无法读取字体文件 {0}: {1}")]
  FontIo(PathBuf, std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(PathBuf),
  #[error("未找到可用的系统字体")]
  NoFontFound,
}

pub fn load_font(path: &Path) -> Result<FontArc, RenderError> {
  let data = std::fs::read(path).map_err(|e| RenderError::FontIo(path.to_path_buf(), e))?;
  FontArc::try_from_vec(data).map_err(|_| RenderError::InvalidFont(path.to_path_buf()))
}

fn find_system_font() -> Result<FontArc, RenderError> {
  SYSTEM_FONT_PATHS
    .iter()
    .map(Path::new)
    .filter(|path| path.exists())
    .find_map(|path| match load_font(path) {
      Ok(font) => {
        debug!("使用系统字体: {}", path.display());
        Some(font)
      }
      Err(e) => {
        debug!("{}", e);
        None
      }
    })
    .ok_or(RenderError::NoFontFound)
}

/// 内置字体，系统字体都不可用时使用
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

fn embedded_font() -> Result<FontArc, RenderError> {
  FontArc::try_from_slice(EMBEDDED_FONT).map_err(|_| RenderError::InvalidFont(PathBuf::from("<embedded>")))
}

/// 检测结果绘制器
///
/// 依次尝试指定字体、系统字体和内置字体；都不可用时仍绘制边框和标签底色，只是不写文字。
#[derive(Clone)]
pub struct Draw {
  font: Option<FontArc>,
}

impl Default for Draw {
  fn default() -> Self {
    let font = find_system_font()
      .or_else(|e| {
        debug!("{}，使用内置字体", e);
        embedded_font()
      })
      .inspect_err(|e| warn!("{}，标签将不绘制文字", e))
      .ok();
    Self::with_font(font)
  }
}

impl Draw {
  pub fn with_font(font: Option<FontArc>) -> Self {
    Self { font }
  }

  /// 使用指定字体文件，加载失败时退回系统字体
  pub fn with_font_file(path: &Path) -> Self {
    match load_font(path) {
      Ok(font) => Self::with_font(Some(font)),
      Err(e) => {
        warn!("{}，改用系统字体", e);
        Self::default()
      }
    }
  }

  pub fn without_font() -> Self {
    Self::with_font(None)
  }

  pub fn color_for(index: usize) -> Rgb<u8> {
    Rgb(PALETTE[index % PALETTE.len()])
  }

  /// 在图像副本上绘制检测结果，原图不变
  pub fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.clone();
    self.draw_detections_on_image(&mut canvas, detections);
    canvas
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, detections: &[Detection]) {
    if image.width() == 0 || image.height() == 0 {
      return;
    }

    for (index, detection) in detections.iter().enumerate() {
      self.draw_bbox_with_label(image, detection, Self::color_for(index));
    }
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection, color: Rgb<u8>) {
    let bbox = &detection.bbox;
    let (w, h) = ((image.width() - 1) as f32, (image.height() - 1) as f32);

    // 先限制在图像范围内，避免超大坐标在整数运算中溢出
    let x_min = bbox.x_min.clamp(0.0, w).round() as i32;
    let y_min = bbox.y_min.clamp(0.0, h).round() as i32;
    let x_max = bbox.x_max.clamp(0.0, w).round() as i32;
    let y_max = bbox.y_max.clamp(0.0, h).round() as i32;

    // 边框向内加粗
    for thickness in 0..BOX_LINE_WIDTH {
      let width = x_max - x_min - 2 * thickness + 1;
      let height = y_max - y_min - 2 * thickness + 1;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + thickness, y_min + thickness).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let label = detection.label_text();
    let label_x = x_min;
    let label_y = y_min - LABEL_OFFSET_Y;

    match &self.font {
      Some(font) => {
        let scale = PxScale::from(LABEL_FONT_SIZE);
        let (text_width, text_height) = text_size(scale, font, &label);
        if text_width > 0 && text_height > 0 {
          let rect = Rect::at(label_x, label_y).of_size(text_width, text_height);
          draw_filled_rect_mut(image, rect, color);
        }
        draw_text_mut(image, TEXT_COLOR, label_x, label_y, scale, font, &label);
      }
      None => {
        let text_width = ((label.chars().count() as f32) * LABEL_CHAR_WIDTH).ceil() as u32;
        if text_width > 0 {
          let rect = Rect::at(label_x, label_y).of_size(text_width, LABEL_TEXT_HEIGHT);
          draw_filled_rect_mut(image, rect, color);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::BoundingBox;

  fn detection(bbox: [f32; 4], score: f32) -> Detection {
    Detection {
      bbox: BoundingBox::from(bbox),
      score,
      label: 0,
      query: "cat".to_string(),
    }
  }

  #[test]
  fn annotate_leaves_input_untouched() {
    let image = RgbImage::new(64, 64);
    let draw = Draw::without_font();
    let annotated = draw.annotate(&image, &[detection([10.0, 30.0, 40.0, 60.0], 0.9)]);
    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    assert_ne!(annotated, image);
  }

  #[test]
  fn colors_follow_list_position() {
    let image = RgbImage::new(100, 100);
    let draw = Draw::without_font();
    let annotated = draw.annotate(
      &image,
      &[
        detection([30.0, 30.0, 40.0, 40.0], 0.9),
        detection([60.0, 60.0, 80.0, 80.0], 0.8),
      ],
    );
    assert_eq!(*annotated.get_pixel(30, 35), Draw::color_for(0));
    assert_eq!(*annotated.get_pixel(60, 70), Draw::color_for(1));
    assert_eq!(Draw::color_for(0), Rgb([255, 0, 0]));
    assert_eq!(Draw::color_for(1), Rgb([0, 0, 255]));
    assert_eq!(Draw::color_for(8), Draw::color_for(0));
  }

  #[test]
  fn outline_is_three_pixels_wide() {
    let image = RgbImage::new(100, 100);
    let annotated = Draw::without_font().annotate(&image, &[detection([40.0, 40.0, 90.0, 90.0], 0.5)]);
    let red = Rgb([255, 0, 0]);
    assert_eq!(*annotated.get_pixel(40, 60), red);
    assert_eq!(*annotated.get_pixel(42, 60), red);
    assert_eq!(*annotated.get_pixel(43, 60), Rgb([0, 0, 0]));
  }

  #[test]
  fn label_background_is_drawn_without_font() {
    let image = RgbImage::new(100, 100);
    let annotated = Draw::without_font().annotate(&image, &[detection([10.0, 50.0, 40.0, 90.0], 0.5)]);
    // 标签底色位于框上方 25 像素处
    assert_eq!(*annotated.get_pixel(12, 27), Rgb([255, 0, 0]));
  }

  #[test]
  fn degenerate_and_out_of_bounds_boxes_do_not_panic() {
    let image = RgbImage::new(20, 20);
    let draw = Draw::without_font();
    let annotated = draw.annotate(
      &image,
      &[
        detection([5.0, 5.0, 5.0, 5.0], 0.9),
        detection([-30.0, -30.0, 100.0, 100.0], 0.8),
        detection([15.0, 15.0, 10.0, 10.0], 0.7),
      ],
    );
    assert_eq!(annotated.dimensions(), (20, 20));
    assert!(draw.annotate(&RgbImage::new(0, 0), &[detection([0.0, 0.0, 1.0, 1.0], 0.1)]).is_empty());
  }

  #[test]
  fn huge_boxes_are_clamped() {
    let image = RgbImage::new(20, 20);
    let draw = Draw::without_font();
    let annotated = draw.annotate(
      &image,
      &[
        detection([-3e9, 0.0, 3e9, 10.0], 0.9),
        detection([12.0, -3e9, 18.0, 3e9], 0.8),
      ],
    );
    assert_eq!(*annotated.get_pixel(0, 5), Rgb([255, 0, 0]));
    assert_eq!(*annotated.get_pixel(19, 5), Rgb([255, 0, 0]));
    assert_eq!(*annotated.get_pixel(15, 19), Rgb([0, 0, 255]));
  }

  #[test]
  fn embedded_font_draws_label_text() {
    let font = embedded_font().unwrap();
    assert!(Draw::default().font.is_some());

    let image = RgbImage::new(100, 100);
    let annotated = Draw::with_font(Some(font)).annotate(&image, &[detection([10.0, 40.0, 90.0, 90.0], 0.5)]);
    // 标签区域内出现白色文字像素
    let has_text = (15..40)
      .flat_map(|y| (10..90).map(move |x| (x, y)))
      .any(|(x, y)| annotated.get_pixel(x, y)[1] > 128);
    assert!(has_text);
  }

  #[test]
  fn missing_font_file_falls_back() {
    let draw = Draw::with_font_file(Path::new("/nonexistent/font.ttf"));
    let image = RgbImage::new(32, 32);
    let annotated = draw.annotate(&image, &[detection([2.0, 2.0, 20.0, 20.0], 0.4)]);
    assert_eq!(*annotated.get_pixel(2, 10), Rgb([255, 0, 0]));
  }

  #[test]
  fn invalid_font_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ttf");
    std::fs::write(&path, b"not a font").unwrap();
    assert!(matches!(load_font(&path), Err(RenderError::InvalidFont(_))));
  }
}

//! Multipart form for `POST /generate`.

use image::Rgba;

use super::prelude::*;
use crate::banner::{ImageSize, UploadedSketch, UserInstructions};
use crate::config::OverlaySettings;
use crate::constants::MAX_FONT_SIZE;
use crate::overlay::{DEFAULT_TEXT_COLOR, OverlayText, font_size_in_range};
use crate::pipeline::GenerationRequest;

/// Raw field values, as submitted.
#[derive(Debug, Default)]
pub(crate) struct GenerateForm {
    pub(crate) sketch: Vec<u8>,
    pub(crate) impression: String,
    pub(crate) details: String,
    pub(crate) size: String,
    pub(crate) overlay_text: String,
    pub(crate) overlay_x: String,
    pub(crate) overlay_y: String,
    pub(crate) font_size: String,
    pub(crate) overlay_color: String,
}

impl GenerateForm {
    /// Reads every known field, ignoring the rest.
    pub(crate) async fn from_multipart(mut multipart: Multipart) -> Result<Self, BannerError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_string();
            if field_name == "sketch" {
                form.sketch = field.bytes().await?.to_vec();
                continue;
            }
            let target = match field_name.as_str() {
                "impression" => &mut form.impression,
                "details" => &mut form.details,
                "size" => &mut form.size,
                "overlay_text" => &mut form.overlay_text,
                "overlay_x" => &mut form.overlay_x,
                "overlay_y" => &mut form.overlay_y,
                "font_size" => &mut form.font_size,
                "overlay_color" => &mut form.overlay_color,
                _ => {
                    debug!("Ignoring unknown form field {field_name:?}");
                    continue;
                }
            };
            *target = field.text().await?;
        }
        Ok(form)
    }

    /// Validates the parts that can be wrong in a way the pipeline can't report.
    ///
    /// A missing sketch or empty details are not errors here, the pipeline
    /// turns those into a warning.
    pub(crate) fn into_request(
        self,
        overlay_settings: &OverlaySettings,
    ) -> Result<GenerationRequest, BannerError> {
        let size = match self.size.trim() {
            "" => ImageSize::default(),
            value => value.parse()?,
        };

        let overlay = if self.overlay_text.trim().is_empty() {
            None
        } else {
            Some(OverlayText {
                // browsers submit textarea line breaks as CRLF
                text: self.overlay_text.replace("\r\n", "\n"),
                position: (
                    parse_or(&self.overlay_x, "overlay_x", 0)?,
                    parse_or(&self.overlay_y, "overlay_y", 0)?,
                ),
                font_size: parse_font_size(&self.font_size, overlay_settings.font_size)?,
                color: parse_color(&self.overlay_color)?,
            })
        };

        Ok(GenerationRequest {
            sketch: UploadedSketch::new(self.sketch),
            instructions: UserInstructions {
                impression: self.impression.replace("\r\n", "\n"),
                details: self.details.replace("\r\n", "\n"),
                size,
            },
            overlay,
        })
    }
}

fn parse_or(value: &str, field: &str, default: i32) -> Result<i32, BannerError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(default);
    }
    value
        .parse()
        .map_err(|_| BannerError::BadRequest(format!("{field} must be a whole number")))
}

fn parse_font_size(value: &str, default: f32) -> Result<f32, BannerError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(default);
    }
    match value.parse::<f32>() {
        Ok(size) if font_size_in_range(size) => Ok(size),
        _ => Err(BannerError::BadRequest(format!(
            "font_size must be a number above 0 and at most {MAX_FONT_SIZE}"
        ))),
    }
}

/// Parses `#rrggbb` as an opaque colour, empty means the default.
fn parse_color(value: &str) -> Result<Rgba<u8>, BannerError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(DEFAULT_TEXT_COLOR);
    }
    let invalid = || BannerError::BadRequest(format!("overlay_color {value:?} is not #rrggbb"));
    let hex = value.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).map_err(|_| invalid());
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> OverlaySettings {
        OverlaySettings {
            font_path: None,
            font_size: 40.0,
        }
    }

    #[test]
    fn blank_fields_fall_back_to_defaults() {
        let form = GenerateForm {
            details: "A: logo\r\nB: headline".to_string(),
            overlay_text: "Sale\r\nToday".to_string(),
            ..Default::default()
        };
        let request = form.into_request(&settings()).expect("request");
        assert!(request.sketch.is_none());
        assert_eq!(request.instructions.size, ImageSize::Square);
        assert_eq!(request.instructions.details, "A: logo\nB: headline");
        let overlay = request.overlay.expect("overlay");
        assert_eq!(overlay.text, "Sale\nToday");
        assert_eq!(overlay.position, (0, 0));
        assert_eq!(overlay.font_size, 40.0);
        assert_eq!(overlay.color, DEFAULT_TEXT_COLOR);
    }

    #[test]
    fn overlay_fields_are_parsed() {
        let form = GenerateForm {
            details: "A".to_string(),
            size: "1024x1792".to_string(),
            overlay_text: "Hi".to_string(),
            overlay_x: " 12 ".to_string(),
            overlay_y: "-4".to_string(),
            font_size: "72".to_string(),
            overlay_color: "#FF8000".to_string(),
            ..Default::default()
        };
        let request = form.into_request(&settings()).expect("request");
        assert_eq!(request.instructions.size, ImageSize::Portrait);
        let overlay = request.overlay.expect("overlay");
        assert_eq!(overlay.position, (12, -4));
        assert_eq!(overlay.font_size, 72.0);
        assert_eq!(overlay.color, Rgba([255, 128, 0, 255]));
    }

    #[test]
    fn blank_overlay_text_means_no_overlay() {
        let form = GenerateForm {
            overlay_text: " \r\n ".to_string(),
            overlay_x: "not checked".to_string(),
            ..Default::default()
        };
        assert!(form.into_request(&settings()).expect("request").overlay.is_none());
    }

    #[test]
    fn bad_values_are_bad_requests() {
        for form in [
            GenerateForm {
                size: "800x600".to_string(),
                ..Default::default()
            },
            GenerateForm {
                overlay_text: "x".to_string(),
                overlay_x: "1.5".to_string(),
                ..Default::default()
            },
            GenerateForm {
                overlay_text: "x".to_string(),
                font_size: "0".to_string(),
                ..Default::default()
            },
            GenerateForm {
                overlay_text: "x".to_string(),
                font_size: "1000000".to_string(),
                ..Default::default()
            },
            GenerateForm {
                overlay_text: "x".to_string(),
                font_size: "NaN".to_string(),
                ..Default::default()
            },
            GenerateForm {
                overlay_text: "x".to_string(),
                overlay_x: "99999999999".to_string(),
                ..Default::default()
            },
            GenerateForm {
                overlay_text: "x".to_string(),
                overlay_color: "red".to_string(),
                ..Default::default()
            },
            GenerateForm {
                overlay_text: "x".to_string(),
                overlay_color: "#12345g".to_string(),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                form.into_request(&settings()),
                Err(BannerError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn font_size_is_capped() {
        let at_cap = GenerateForm {
            overlay_text: "W".to_string(),
            font_size: "512".to_string(),
            ..Default::default()
        };
        let overlay = at_cap.into_request(&settings()).expect("request").overlay;
        assert_eq!(overlay.expect("overlay").font_size, MAX_FONT_SIZE);

        let huge = GenerateForm {
            overlay_text: "W".to_string(),
            font_size: "1000000".to_string(),
            ..Default::default()
        };
        let err = huge.into_request(&settings()).expect_err("too big");
        assert!(matches!(err, BannerError::BadRequest(_)));
        assert!(err.to_string().contains("512"));
    }

    #[test]
    fn far_away_anchors_are_accepted() {
        // drawing clips them, so the form has no reason to refuse
        let form = GenerateForm {
            overlay_text: "W".to_string(),
            overlay_x: "2147483647".to_string(),
            overlay_y: "-2147483648".to_string(),
            ..Default::default()
        };
        let overlay = form.into_request(&settings()).expect("request").overlay;
        assert_eq!(overlay.expect("overlay").position, (i32::MAX, i32::MIN));
    }

    #[test]
    fn user_text_keeps_its_whitespace() {
        let form = GenerateForm {
            impression: "  bright\r\n and modern  ".to_string(),
            details: "\tA: logo \r\nB: headline  ".to_string(),
            ..Default::default()
        };
        let request = form.into_request(&settings()).expect("request");
        assert_eq!(request.instructions.impression, "  bright\n and modern  ");
        assert_eq!(request.instructions.details, "\tA: logo \nB: headline  ");
    }
}

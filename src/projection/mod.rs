//! Mapping detections from network space into view space.
//!
//! The camera delivers landscape images (long side is the width) while the
//! view is portrait (short side is the width). Before inference the image is
//! either center-cropped to the network input size or scaled so its long side
//! fits; detection coordinates are normalized to that input, and projecting
//! back undoes the same transform.

use crate::decode::INPUT_WIDTH;
use crate::geometry::{Rect, ScreenPoint};
use crate::util::{ArLabelError, ArLabelResult};

/// Default horizontal correction applied in scale-fit mode, in view points.
pub const DEFAULT_SCALE_FIT_X_BIAS: f32 = 20.0;

/// How the camera image was fitted to the network input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProcessingMode {
    /// A centered `input x input` crop; smaller field of view.
    Crop,
    /// The whole image scaled down; lower resolution.
    #[default]
    ScaleFit,
}

/// Geometry of the view, the camera image and the network input.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewProjection {
    /// View width (short side) in points.
    pub view_width: f32,
    /// View height (long side) in points.
    pub view_height: f32,
    /// Camera image long side in pixels.
    pub image_long: usize,
    /// Camera image short side in pixels.
    pub image_short: usize,
    /// Square network input side in pixels.
    pub input_size: usize,
    pub mode: ProcessingMode,
    /// Subtracted from x in scale-fit mode.
    pub scale_fit_x_bias: f32,
}

impl ViewProjection {
    /// Creates a scale-fit projection for the default network input size.
    pub fn new(
        view_width: f32,
        view_height: f32,
        image_long: usize,
        image_short: usize,
    ) -> ArLabelResult<Self> {
        let projection = Self {
            view_width,
            view_height,
            image_long,
            image_short,
            input_size: INPUT_WIDTH,
            mode: ProcessingMode::ScaleFit,
            scale_fit_x_bias: DEFAULT_SCALE_FIT_X_BIAS,
        };
        projection.validate()?;
        Ok(projection)
    }

    /// Switches the processing mode, revalidating the geometry.
    pub fn with_mode(mut self, mode: ProcessingMode) -> ArLabelResult<Self> {
        self.mode = mode;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ArLabelResult<()> {
        let view_ok = self.view_width.is_finite()
            && self.view_height.is_finite()
            && self.view_width > 0.0
            && self.view_height > 0.0;
        if !view_ok {
            return Err(ArLabelError::InvalidParameter(
                "view dimensions must be positive",
            ));
        }
        if self.image_long == 0 || self.image_short == 0 || self.input_size == 0 {
            return Err(ArLabelError::InvalidParameter(
                "image and input dimensions must be positive",
            ));
        }
        if !self.scale_fit_x_bias.is_finite() {
            return Err(ArLabelError::InvalidParameter(
                "scale_fit_x_bias must be finite",
            ));
        }
        if self.mode == ProcessingMode::Crop
            && (self.image_short < self.input_size || self.image_long < self.input_size)
        {
            return Err(ArLabelError::InvalidParameter(
                "crop mode needs an image at least as large as the network input",
            ));
        }
        Ok(())
    }

    /// Projects a normalized network-space point into view space.
    pub fn to_view(&self, x: f32, y: f32) -> ScreenPoint {
        let input = self.input_size as f32;
        let short = self.image_short as f32;
        let long = self.image_long as f32;
        match self.mode {
            ProcessingMode::Crop => {
                // Margins are whole pixels, as the crop rectangle was.
                let margin_short = (self.image_short.saturating_sub(self.input_size) / 2) as f32;
                let margin_long = (self.image_long.saturating_sub(self.input_size) / 2) as f32;
                ScreenPoint::new(
                    self.view_width / short * (x * input + margin_short),
                    self.view_height / long * (y * input + margin_long),
                )
            }
            ProcessingMode::ScaleFit => ScreenPoint::new(
                x * self.view_width * long / short - self.scale_fit_x_bias,
                y * self.view_height,
            ),
        }
    }

    /// View-space point to hit test for a detection box.
    ///
    /// Boxes at least as wide as tall anchor at their origin; taller boxes
    /// anchor half a box height further down, closer to where the object
    /// meets the ground.
    pub fn anchor_point(&self, rect: &Rect) -> ScreenPoint {
        if rect.height <= rect.width {
            self.to_view(rect.x, rect.y)
        } else {
            self.to_view(rect.x, rect.y + rect.height / 2.0)
        }
    }
}

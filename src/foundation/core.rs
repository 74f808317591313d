use crate::foundation::error::{StoryreelError, StoryreelResult};

/// Output frame size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 1280x720, the default episode resolution.
    pub const HD: Self = Self {
        width: 1280,
        height: 720,
    };

    pub fn new(width: u32, height: u32) -> StoryreelResult<Self> {
        let r = Self { width, height };
        r.validate()?;
        Ok(r)
    }

    pub fn validate(self) -> StoryreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StoryreelError::validation(
                "resolution width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p needs even dimensions.
            return Err(StoryreelError::validation(format!(
                "resolution must be even in both dimensions, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Both dimensions multiplied by `factor`.
    pub fn scaled(self, factor: u32) -> Self {
        Self {
            width: self.width.saturating_mul(factor),
            height: self.height.saturating_mul(factor),
        }
    }

    /// `W:H`, the form taken by the `scale` filter.
    pub fn scale_arg(self) -> String {
        format!("{}:{}", self.width, self.height)
    }

    /// `WxH`, the form taken by `s=` options.
    pub fn size_arg(self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::HD
    }
}

/// Display aspect ratio as a reduced fraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AspectRatio {
    pub num: u32,
    pub den: u32,
}

impl AspectRatio {
    pub const WIDESCREEN: Self = Self { num: 16, den: 9 };

    pub fn new(num: u32, den: u32) -> StoryreelResult<Self> {
        if num == 0 || den == 0 {
            return Err(StoryreelError::validation(
                "aspect ratio terms must be non-zero",
            ));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// `N/D`, the form taken by `setdar`.
    pub fn filter_arg(self) -> String {
        format!("{}/{}", self.num, self.den)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::WIDESCREEN
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// Format a number for a filter expression.
///
/// Fixed nine decimals with trailing zeros trimmed, so the same value always renders to the
/// same text and no locale or exponent notation leaks into the graph.
pub fn fmt_num(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_owned();
    }
    let s = format!("{value:.9}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_owned() } else { s.to_owned() }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

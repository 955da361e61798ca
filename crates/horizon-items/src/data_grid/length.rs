//! Column width values.

use std::fmt;
use std::str::FromStr;

use super::error::DataGridError;

/// How a column width is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataGridLengthUnit {
    /// Fits both the header and the cells.
    Auto,
    /// A fixed width in pixels.
    Pixel,
    /// Fits the cells.
    SizeToCells,
    /// Fits the header.
    SizeToHeader,
    /// A weighted share of the remaining space.
    Star,
}

/// A column width: the requested length plus the desired and display widths
/// worked out for it.
///
/// # Example
///
/// ```
/// use horizon_items::data_grid::{DataGridLength, DataGridLengthUnit};
///
/// let width: DataGridLength = "2*".parse().unwrap();
/// assert_eq!(width.unit(), DataGridLengthUnit::Star);
/// assert_eq!(width.value(), 2.0);
/// assert_eq!(DataGridLength::pixel(80.0).to_string(), "80");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataGridLength {
    value: f32,
    unit: DataGridLengthUnit,
    desired_value: Option<f32>,
    display_value: Option<f32>,
}

impl DataGridLength {
    const fn of(value: f32, unit: DataGridLengthUnit) -> Self {
        Self {
            value,
            unit,
            desired_value: None,
            display_value: None,
        }
    }

    pub const fn auto() -> Self {
        Self::of(1.0, DataGridLengthUnit::Auto)
    }

    pub const fn pixel(width: f32) -> Self {
        Self::of(width, DataGridLengthUnit::Pixel)
    }

    pub const fn size_to_cells() -> Self {
        Self::of(1.0, DataGridLengthUnit::SizeToCells)
    }

    pub const fn size_to_header() -> Self {
        Self::of(1.0, DataGridLengthUnit::SizeToHeader)
    }

    /// A star length with the given weight.
    pub const fn star(weight: f32) -> Self {
        Self::of(weight, DataGridLengthUnit::Star)
    }

    /// Pixels for `Pixel`, the weight for `Star`, `1.0` otherwise.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn unit(&self) -> DataGridLengthUnit {
        self.unit
    }

    /// Width the column would like, measured from its content.
    pub fn desired_value(&self) -> Option<f32> {
        self.desired_value
    }

    /// Width the column is shown at.
    pub fn display_value(&self) -> Option<f32> {
        self.display_value
    }

    pub fn with_desired_value(mut self, desired: Option<f32>) -> Self {
        self.desired_value = desired;
        self
    }

    pub fn with_display_value(mut self, display: Option<f32>) -> Self {
        self.display_value = display;
        self
    }

    pub fn is_absolute(&self) -> bool {
        self.unit == DataGridLengthUnit::Pixel
    }

    pub fn is_star(&self) -> bool {
        self.unit == DataGridLengthUnit::Star
    }

    /// Whether the width follows the measured content.
    pub fn is_content_sized(&self) -> bool {
        matches!(
            self.unit,
            DataGridLengthUnit::Auto | DataGridLengthUnit::SizeToCells | DataGridLengthUnit::SizeToHeader
        )
    }

    /// Same requested length, ignoring desired and display widths.
    pub fn same_length(&self, other: &Self) -> bool {
        self.unit == other.unit && self.value == other.value
    }

    pub(crate) fn validate(&self) -> Result<(), DataGridError> {
        let valid = match self.unit {
            DataGridLengthUnit::Pixel => self.value.is_finite() && self.value >= 0.0,
            DataGridLengthUnit::Star => self.value.is_finite() && self.value > 0.0,
            _ => true,
        };
        if valid {
            Ok(())
        } else {
            Err(DataGridError::InvalidWidth { value: self.value })
        }
    }
}

impl fmt::Display for DataGridLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            DataGridLengthUnit::Auto => f.write_str("Auto"),
            DataGridLengthUnit::Pixel => write!(f, "{}", self.value),
            DataGridLengthUnit::SizeToCells => f.write_str("SizeToCells"),
            DataGridLengthUnit::SizeToHeader => f.write_str("SizeToHeader"),
            DataGridLengthUnit::Star if self.value == 1.0 => f.write_str("*"),
            DataGridLengthUnit::Star => write!(f, "{}*", self.value),
        }
    }
}

impl FromStr for DataGridLength {
    type Err = DataGridError;

    /// Parses `Auto`, `SizeToCells`, `SizeToHeader`, `*`, `2.5*`, `120` or
    /// `120px`. Keywords are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || DataGridError::InvalidLength(s.to_string());
        let length = match text.to_ascii_lowercase().as_str() {
            "auto" => Self::auto(),
            "sizetocells" => Self::size_to_cells(),
            "sizetoheader" => Self::size_to_header(),
            "*" => Self::star(1.0),
            lower => {
                if let Some(weight) = lower.strip_suffix('*') {
                    Self::star(weight.trim().parse().map_err(|_| invalid())?)
                } else {
                    let pixels = lower.strip_suffix("px").unwrap_or(lower);
                    Self::pixel(pixels.trim().parse().map_err(|_| invalid())?)
                }
            }
        };
        length.validate().map_err(|_| invalid())?;
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("auto".parse::<DataGridLength>().unwrap(), DataGridLength::auto());
        assert_eq!("SizeToCells".parse::<DataGridLength>().unwrap(), DataGridLength::size_to_cells());
        assert_eq!("*".parse::<DataGridLength>().unwrap(), DataGridLength::star(1.0));
        assert_eq!(" 1.5* ".parse::<DataGridLength>().unwrap(), DataGridLength::star(1.5));
        assert_eq!("120px".parse::<DataGridLength>().unwrap(), DataGridLength::pixel(120.0));
        assert!("wide".parse::<DataGridLength>().is_err());
        assert!("-4".parse::<DataGridLength>().is_err());
        assert!("0*".parse::<DataGridLength>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataGridLength::auto().to_string(), "Auto");
        assert_eq!(DataGridLength::star(1.0).to_string(), "*");
        assert_eq!(DataGridLength::star(3.0).to_string(), "3*");
        assert_eq!(DataGridLength::size_to_header().to_string(), "SizeToHeader");
    }

    #[test]
    fn test_same_length_ignores_measured_values() {
        let measured = DataGridLength::auto()
            .with_desired_value(Some(40.0))
            .with_display_value(Some(40.0));
        assert!(measured.same_length(&DataGridLength::auto()));
        assert_ne!(measured, DataGridLength::auto());
        assert!(measured.is_content_sized());
        assert!(!DataGridLength::pixel(3.0).is_content_sized());
    }
}

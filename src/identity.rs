//! Parsing of the `*IDN?` reply.

use core::{fmt, str::FromStr};

/// The identity a DP700 PSU reports about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    /// E.g. `DP711`.
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
}

/// The reply did not hold exactly four comma separated fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedIdentification;

impl FromStr for DeviceIdentity {
    type Err = MalformedIdentification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.trim().split(',');
        let (Some(manufacturer), Some(model), Some(serial_number), Some(firmware_version), None) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            return Err(MalformedIdentification);
        };

        Ok(Self {
            manufacturer: manufacturer.to_owned(),
            model: model.to_owned(),
            serial_number: serial_number.to_owned(),
            firmware_version: firmware_version.to_owned(),
        })
    }
}

/// Formats as `"{manufacturer} {model} {firmware_version}"`.
impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.manufacturer, self.model, self.firmware_version
        )
    }
}

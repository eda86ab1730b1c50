//! Request validation for configure calls.
//!
//! A request that fails validation is rejected as permanent: retrying the
//! same values cannot succeed.

use regex::Regex;

use crate::error::{GatewayError, Result};
use crate::wire::ConfigureRequest;

const BANDWIDTH_PATTERN: &str = r"^\d+(\.\d+)?(Mbps|Gbps|Tbps)$";
const LASER_POWER_PATTERN: &str = r"^-?\d+(\.\d+)?dBm$";

/// Validate a bandwidth token such as `100Gbps`.
///
/// # Errors
///
/// Returns `GatewayError::Rejected` if the token is malformed.
pub fn validate_bandwidth(bandwidth: &str) -> Result<()> {
    validate_token("bandwidth", bandwidth, BANDWIDTH_PATTERN)
}

/// Validate a laser power token such as `14.5dBm`.
///
/// # Errors
///
/// Returns `GatewayError::Rejected` if the token is malformed.
pub fn validate_laser_power(laser_power: &str) -> Result<()> {
    validate_token("laserPower", laser_power, LASER_POWER_PATTERN)
}

/// Validate a full configure request.
///
/// # Errors
///
/// Returns `GatewayError::Rejected` naming the first invalid field.
pub fn validate_request(request: &ConfigureRequest) -> Result<()> {
    if request.identifier.as_str().trim().is_empty() {
        return Err(GatewayError::rejected("identifier cannot be empty"));
    }
    if request.port == 0 {
        return Err(GatewayError::rejected("port must be between 1 and 65535"));
    }
    validate_bandwidth(&request.bandwidth)?;
    validate_laser_power(&request.laser_power)
}

fn validate_token(field: &str, value: &str, pattern: &str) -> Result<()> {
    let regex = Regex::new(pattern)
        .map_err(|e| GatewayError::invalid_response(format!("{field} pattern: {e}")))?;

    if regex.is_match(value) {
        Ok(())
    } else {
        Err(GatewayError::rejected(format!("invalid {field}: '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::DeviceId;

    fn request() -> ConfigureRequest {
        ConfigureRequest {
            identifier: DeviceId::new("laser-a1.site1"),
            port: 830,
            bandwidth: "100Gbps".to_string(),
            laser_power: "15dBm".to_string(),
            channel: None,
        }
    }

    #[test]
    fn test_valid_tokens() {
        for bandwidth in ["100Gbps", "400Gbps", "1.6Tbps", "10Mbps"] {
            assert!(validate_bandwidth(bandwidth).is_ok(), "{bandwidth}");
        }
        for power in ["15dBm", "14.5dBm", "-3dBm", "0dBm"] {
            assert!(validate_laser_power(power).is_ok(), "{power}");
        }
    }

    #[test]
    fn test_invalid_tokens() {
        for bandwidth in ["", "fast", "100", "100gbps", "100 Gbps", "-1Gbps"] {
            assert!(validate_bandwidth(bandwidth).is_err(), "{bandwidth}");
        }
        for power in ["", "15", "15dbm", "15mW"] {
            assert!(validate_laser_power(power).is_err(), "{power}");
        }
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request(&request()).is_ok());

        let mut no_port = request();
        no_port.port = 0;
        assert!(matches!(
            validate_request(&no_port),
            Err(GatewayError::Rejected { .. })
        ));

        let mut blank = request();
        blank.identifier = DeviceId::new("  ");
        assert!(validate_request(&blank).is_err());

        let mut bad_power = request();
        bad_power.laser_power = "loud".to_string();
        let err = validate_request(&bad_power).err();
        assert!(err.is_some_and(|e| e.to_string().contains("laserPower")));
    }
}

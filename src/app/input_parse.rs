use std::str::FromStr;

use rust_decimal::Decimal;

use crate::portfolio::csv_common::Platform;
use crate::portfolio::tax::{ChurchTaxMode, TaxRates};
use crate::util::decimal::GreaterEqualZeroDecimal;

pub type Error = String;

pub fn parse_decimal_arg(value: &str, arg_name: &str) -> Result<Decimal, Error> {
    Decimal::from_str(value.trim())
        .map_err(|e| format!("Invalid number for --{arg_name} '{value}': {e}"))
}

/// Exemption amounts must be non-negative.
pub fn parse_exemption_used_arg(
    value: &str,
) -> Result<GreaterEqualZeroDecimal, Error> {
    let d = parse_decimal_arg(value, "exemption-used")?;
    GreaterEqualZeroDecimal::try_from(d)
        .map_err(|_| format!("--exemption-used {d} was negative"))
}

/// "auto" defers to header detection; anything else must name a platform.
pub fn parse_platform_arg(value: &str) -> Result<Option<Platform>, Error> {
    if value.trim().to_lowercase() == "auto" {
        return Ok(None);
    }
    match Platform::parse(value) {
        Some(p) => Ok(Some(p)),
        None => Err(format!(
            "Invalid platform '{value}' (expected auto, scalable or generic)"
        )),
    }
}

pub fn parse_delimiter_arg(value: &str) -> Result<u8, Error> {
    let bytes = value.as_bytes();
    if bytes.len() != 1 || !bytes[0].is_ascii() {
        return Err(format!(
            "Invalid delimiter '{value}' (expected a single ascii character)"
        ));
    }
    Ok(bytes[0])
}

pub fn parse_preset_arg(value: &str) -> Result<TaxRates, Error> {
    match value.trim().to_lowercase().as_str() {
        "flat" => Ok(TaxRates::flat_withholding()),
        "composed" => Ok(TaxRates::composed_statutory()),
        _ => Err(format!(
            "Invalid rate preset '{value}' (expected flat or composed)"
        )),
    }
}

/// Formatted as MODE:VALUE. Eg. differential:0.375 or percent:9
pub fn parse_church_mode_arg(value: &str) -> Result<ChurchTaxMode, Error> {
    let (mode, num_str) = match value.split_once(':') {
        Some(pair) => pair,
        None => {
            return Err(format!(
                "Invalid church tax mode '{value}' (expected MODE:VALUE, \
                 eg. differential:0.375 or percent:9)"
            ))
        }
    };
    let num = Decimal::from_str(num_str.trim())
        .map_err(|e| format!("Invalid church tax value '{num_str}': {e}"))?;
    match mode.trim().to_lowercase().as_str() {
        "differential" => Ok(ChurchTaxMode::RateDifferential(num)),
        "percent" => Ok(ChurchTaxMode::PercentOfBaseTax(num)),
        _ => Err(format!(
            "Invalid church tax mode '{mode}' (expected differential or percent)"
        )),
    }
}

// MARK: Tests
#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::gezdec;
    use crate::portfolio::csv_common::Platform;
    use crate::portfolio::tax::{ChurchTaxMode, TaxRates};

    use super::{
        parse_church_mode_arg, parse_delimiter_arg, parse_exemption_used_arg,
        parse_platform_arg, parse_preset_arg,
    };

    #[test]
    fn test_parse_exemption_used() {
        assert_eq!(parse_exemption_used_arg("500.50").unwrap(), gezdec!(500.50));
        assert_eq!(parse_exemption_used_arg("0").unwrap(), gezdec!(0));
        let _ = parse_exemption_used_arg("-1").unwrap_err();
        let _ = parse_exemption_used_arg("abc").unwrap_err();
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!(parse_platform_arg("auto").unwrap(), None);
        assert_eq!(
            parse_platform_arg("scalable").unwrap(),
            Some(Platform::Scalable)
        );
        assert_eq!(
            parse_platform_arg("generic").unwrap(),
            Some(Platform::Generic)
        );
        let _ = parse_platform_arg("trade212").unwrap_err();
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter_arg(";").unwrap(), b';');
        assert_eq!(parse_delimiter_arg(",").unwrap(), b',');
        let _ = parse_delimiter_arg("").unwrap_err();
        let _ = parse_delimiter_arg(";;").unwrap_err();
    }

    #[test]
    fn test_parse_preset() {
        assert_eq!(
            parse_preset_arg("flat").unwrap(),
            TaxRates::flat_withholding()
        );
        assert_eq!(
            parse_preset_arg("Composed").unwrap(),
            TaxRates::composed_statutory()
        );
        let _ = parse_preset_arg("fancy").unwrap_err();
    }

    #[test]
    fn test_parse_church_mode() {
        assert_eq!(
            parse_church_mode_arg("differential:0.375").unwrap(),
            ChurchTaxMode::RateDifferential(dec!(0.375))
        );
        assert_eq!(
            parse_church_mode_arg("percent:9").unwrap(),
            ChurchTaxMode::PercentOfBaseTax(dec!(9))
        );
        let _ = parse_church_mode_arg("percent").unwrap_err();
        let _ = parse_church_mode_arg("tithe:10").unwrap_err();
        let _ = parse_church_mode_arg("percent:x").unwrap_err();
    }
}

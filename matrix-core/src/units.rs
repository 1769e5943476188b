//! Energy-unit conversion, grounded on `original_source/util/units.py`'s
//! custom pint unit registry. Canonical internal scale is kWh.

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyUnit {
    Kwh,
    Mwh,
    Therm,
    Ccf,
    Mcf,
    Btu,
    MMBtu,
}

impl EnergyUnit {
    /// How many kWh one unit of `self` is worth.
    fn kwh_factor(self) -> f64 {
        match self {
            EnergyUnit::Kwh => 1.0,
            EnergyUnit::Mwh => 1000.0,
            // 1 therm = 100,000 BTU
            EnergyUnit::Therm => 29.300_111,
            // centumcubicfoot ≡ therm in the source registry
            EnergyUnit::Ccf => 29.300_111,
            EnergyUnit::Mcf => 10.0 * 29.300_111,
            EnergyUnit::Btu => 0.000_293_071,
            EnergyUnit::MMBtu => 1_000_000.0 * 0.000_293_071,
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "kwh" | "kilowatthour" => Ok(EnergyUnit::Kwh),
            "mwh" | "megawatthour" => Ok(EnergyUnit::Mwh),
            "therm" | "thm" | "thms" => Ok(EnergyUnit::Therm),
            "ccf" | "centumcubicfoot" => Ok(EnergyUnit::Ccf),
            "mcf" => Ok(EnergyUnit::Mcf),
            "btu" => Ok(EnergyUnit::Btu),
            "mmbtu" => Ok(EnergyUnit::MMBtu),
            other => Err(CoreError::unit(format!("unknown energy unit: {other}"))),
        }
    }
}

/// Converts `value` expressed in `from` into the equivalent quantity in `to`.
pub fn convert(value: f64, from: EnergyUnit, to: EnergyUnit) -> f64 {
    value * from.kwh_factor() / to.kwh_factor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_identity() {
        for unit in [
            EnergyUnit::Kwh,
            EnergyUnit::Mwh,
            EnergyUnit::Therm,
            EnergyUnit::Ccf,
            EnergyUnit::Mcf,
            EnergyUnit::Btu,
            EnergyUnit::MMBtu,
        ] {
            let there = convert(1.0, unit, EnergyUnit::Kwh);
            let back = convert(there, EnergyUnit::Kwh, unit);
            assert!((back - 1.0).abs() < 1e-9, "unit {unit:?} failed round trip");
        }
    }

    #[test]
    fn mwh_is_a_thousand_kwh() {
        assert_eq!(convert(1.0, EnergyUnit::Mwh, EnergyUnit::Kwh), 1000.0);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(EnergyUnit::parse("KWH").unwrap(), EnergyUnit::Kwh);
        assert_eq!(EnergyUnit::parse("Therm").unwrap(), EnergyUnit::Therm);
    }
}

//! Target IR specifications.
//!
//! A specification names the IR dialect, its version and the numeric profile
//! (integer-only or floating point) a graph is lowered for. It is half of the
//! key visitors are registered under, so it is `Copy` and compared by value.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::LoweringError;
use crate::graph::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    Tosa,
    Qnn,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Tosa => "TOSA",
            Dialect::Qnn => "QNN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrVersion {
    pub major: u16,
    pub minor: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Profile {
    /// Integer-only inference (`INT`, or `BI` in TOSA 0.80).
    Int,
    /// Floating-point inference (`FP`, or `MI` in TOSA 0.80).
    Fp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetSpecification {
    pub dialect: Dialect,
    pub version: IrVersion,
    pub profile: Profile,
}

pub const TOSA_0_80_BI: TargetSpecification = TargetSpecification::tosa(0, 80, Profile::Int);
pub const TOSA_0_80_MI: TargetSpecification = TargetSpecification::tosa(0, 80, Profile::Fp);
pub const TOSA_1_0_INT: TargetSpecification = TargetSpecification::tosa(1, 0, Profile::Int);
pub const TOSA_1_0_FP: TargetSpecification = TargetSpecification::tosa(1, 0, Profile::Fp);
pub const QNN_2_0_INT: TargetSpecification = TargetSpecification::qnn(2, 0, Profile::Int);
pub const QNN_2_0_FP: TargetSpecification = TargetSpecification::qnn(2, 0, Profile::Fp);

impl TargetSpecification {
    pub const fn tosa(major: u16, minor: u16, profile: Profile) -> Self {
        Self {
            dialect: Dialect::Tosa,
            version: IrVersion { major, minor },
            profile,
        }
    }

    pub const fn qnn(major: u16, minor: u16, profile: Profile) -> Self {
        Self {
            dialect: Dialect::Qnn,
            version: IrVersion { major, minor },
            profile,
        }
    }

    /// TOSA 0.x names its profiles BI/MI and treats MI as a superset of BI.
    fn uses_legacy_profiles(&self) -> bool {
        self.dialect == Dialect::Tosa && self.version.major == 0
    }

    pub fn profile_name(&self) -> &'static str {
        match (self.profile, self.uses_legacy_profiles()) {
            (Profile::Int, true) => "BI",
            (Profile::Fp, true) => "MI",
            (Profile::Int, false) => "INT",
            (Profile::Fp, false) => "FP",
        }
    }

    /// Whether tensors of `dtype` may appear in a graph lowered for this target.
    pub fn supports_dtype(&self, dtype: DataType) -> bool {
        match self.profile {
            Profile::Int => dtype.is_integer() || dtype == DataType::Bool,
            Profile::Fp if self.uses_legacy_profiles() => true,
            Profile::Fp => dtype.is_float() || matches!(dtype, DataType::Bool | DataType::Int32),
        }
    }
}

impl fmt::Display for TargetSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}.{}+{}",
            self.dialect.as_str(),
            self.version.major,
            self.version.minor,
            self.profile_name()
        )
    }
}

impl FromStr for TargetSpecification {
    type Err = LoweringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^(?i)(TOSA|QNN)-(\d+)\.(\d+)\+([A-Z]+)$").unwrap()
        });

        let invalid = |reason: &str| LoweringError::InvalidTargetSpec {
            spec: s.to_string(),
            reason: reason.to_string(),
        };

        let caps = pattern
            .captures(s.trim())
            .ok_or_else(|| invalid("expected `<TOSA|QNN>-<major>.<minor>+<PROFILE>`"))?;

        let dialect = if caps[1].eq_ignore_ascii_case("tosa") {
            Dialect::Tosa
        } else {
            Dialect::Qnn
        };
        let major = caps[2]
            .parse::<u16>()
            .map_err(|_| invalid("major version out of range"))?;
        let minor = caps[3]
            .parse::<u16>()
            .map_err(|_| invalid("minor version out of range"))?;
        let profile = match caps[4].to_ascii_uppercase().as_str() {
            "INT" | "BI" => Profile::Int,
            "FP" | "MI" => Profile::Fp,
            other => return Err(invalid(&format!("unknown profile `{}`", other))),
        };

        Ok(Self {
            dialect,
            version: IrVersion { major, minor },
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_tosa_specs() {
        for text in ["TOSA-0.80+BI", "TOSA-0.80+MI", "TOSA-1.0+INT", "TOSA-1.0+FP"] {
            let spec: TargetSpecification = text.parse().unwrap();
            assert_eq!(spec.to_string(), text);
        }
        assert_eq!("tosa-1.0+fp".parse::<TargetSpecification>().unwrap(), TOSA_1_0_FP);
        assert_eq!("TOSA-0.80+INT".parse::<TargetSpecification>().unwrap(), TOSA_0_80_BI);
    }

    #[test]
    fn parses_qnn_specs() {
        let spec: TargetSpecification = "QNN-2.0+INT".parse().unwrap();
        assert_eq!(spec, QNN_2_0_INT);
        assert_eq!(QNN_2_0_FP.to_string(), "QNN-2.0+FP");
    }

    #[test]
    fn rejects_malformed_specs() {
        for text in ["TOSA", "TOSA-1+FP", "TOSA-1.0", "TOSA-1.0+XYZ", "ONNX-1.0+FP"] {
            let err = text.parse::<TargetSpecification>().unwrap_err();
            assert!(matches!(err, LoweringError::InvalidTargetSpec { .. }), "{text}");
        }
    }

    #[test]
    fn profiles_gate_dtypes() {
        assert!(!TOSA_1_0_INT.supports_dtype(DataType::Float32));
        assert!(TOSA_1_0_INT.supports_dtype(DataType::Int8));
        assert!(TOSA_1_0_FP.supports_dtype(DataType::Float32));
        assert!(!TOSA_1_0_FP.supports_dtype(DataType::Int8));
        assert!(TOSA_0_80_MI.supports_dtype(DataType::Int8));
        assert!(!TOSA_0_80_BI.supports_dtype(DataType::Float32));
    }
}

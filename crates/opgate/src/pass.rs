//! Pass names and pass-list parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::GateError;

/// The fixed set of verification passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassName {
    /// Generated-code verification, formatting, vet, analyzers, license headers.
    Fmt,

    /// Operator binaries plus container image build-and-push.
    Build,

    /// Main end-to-end suite.
    E2e,

    /// Slow end-to-end suite.
    E2eSlow,

    /// Self-hosted end-to-end suite.
    E2eSh,

    /// Operator upgrade test.
    Upgrade,

    /// Per-package unit tests with coverage.
    Unit,
}

impl PassName {
    pub const ALL: [PassName; 7] = [
        PassName::Fmt,
        PassName::Build,
        PassName::E2e,
        PassName::E2eSlow,
        PassName::E2eSh,
        PassName::Upgrade,
        PassName::Unit,
    ];

    /// Passes run when nothing is requested.
    pub const DEFAULT: [PassName; 5] = [
        PassName::Fmt,
        PassName::Build,
        PassName::E2e,
        PassName::E2eSlow,
        PassName::Unit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PassName::Fmt => "fmt",
            PassName::Build => "build",
            PassName::E2e => "e2e",
            PassName::E2eSlow => "e2eslow",
            PassName::E2eSh => "e2esh",
            PassName::Upgrade => "upgrade",
            PassName::Unit => "unit",
        }
    }
}

impl fmt::Display for PassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassName {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PassName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| GateError::UnknownPass(s.to_string()))
    }
}

/// Parse requested pass names, keeping the first occurrence of each.
///
/// An empty request resolves to [`PassName::DEFAULT`]. Any unknown name
/// rejects the whole request.
pub fn parse_passes<I, S>(names: I) -> Result<Vec<PassName>, GateError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut passes = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        let pass: PassName = name.parse()?;
        if !passes.contains(&pass) {
            passes.push(pass);
        }
    }

    if passes.is_empty() {
        passes.extend(PassName::DEFAULT);
    }
    Ok(passes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for pass in PassName::ALL {
            assert_eq!(pass.as_str().parse::<PassName>().unwrap(), pass);
        }
    }

    #[test]
    fn empty_request_uses_default_order() {
        let passes = parse_passes(Vec::<String>::new()).unwrap();
        assert_eq!(
            passes,
            vec![
                PassName::Fmt,
                PassName::Build,
                PassName::E2e,
                PassName::E2eSlow,
                PassName::Unit
            ]
        );
    }

    #[test]
    fn order_is_preserved_and_duplicates_dropped() {
        let passes = parse_passes(["unit", "fmt", "unit", "build", "fmt"]).unwrap();
        assert_eq!(passes, vec![PassName::Unit, PassName::Fmt, PassName::Build]);
    }

    #[test]
    fn unknown_name_rejects_whole_request() {
        let err = parse_passes(["fmt", "lint", "unit"]).unwrap_err();
        assert!(matches!(err, GateError::UnknownPass(ref n) if n == "lint"));
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!("FMT".parse::<PassName>().is_err());
    }
}

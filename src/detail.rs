//! Detail levels, assemblies and construction directives.
//!
//! A detail level selects one column of the detail table in the base config.
//! Resolving it (optionally against an explicit assembly allow-list) yields a
//! [`ResolvedDetail`]: one directive per known assembly.

use crate::error::{GeometryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Requested level of geometric detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    /// Coarse shapes only
    Simple,
    /// Everything relevant for background (radiogenic) simulations
    #[default]
    Radiogenic,
    /// All available detail
    Full,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 3] = [Self::Simple, Self::Radiogenic, Self::Full];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Radiogenic => "radiogenic",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s.trim())
            .ok_or_else(|| {
                GeometryError::config(format!(
                    "unknown detail level '{}' (expected one of simple, radiogenic, full)",
                    s
                ))
            })
    }
}

/// Independently includable group of volumes.
///
/// Variants are listed in nesting order: an assembly never nests inside one
/// that comes after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assembly {
    Cavern,
    Watertank,
    WatertankInstrumentation,
    Cryo,
    Wlsr,
    HpgeStrings,
    Calibration,
}

impl Assembly {
    pub const ALL: [Assembly; 7] = [
        Self::Cavern,
        Self::Watertank,
        Self::WatertankInstrumentation,
        Self::Cryo,
        Self::Wlsr,
        Self::HpgeStrings,
        Self::Calibration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cavern => "cavern",
            Self::Watertank => "watertank",
            Self::WatertankInstrumentation => "watertank_instrumentation",
            Self::Cryo => "cryo",
            Self::Wlsr => "wlsr",
            Self::HpgeStrings => "hpge_strings",
            Self::Calibration => "calibration",
        }
    }
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Assembly {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|assembly| assembly.as_str() == s.trim())
            .ok_or_else(|| GeometryError::config(format!("unknown assembly '{}'", s.trim())))
    }
}

/// Construction directive for one assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    Omit,
    Simple,
    #[serde(alias = "place", alias = "stl")]
    Detailed,
    Metadata,
}

impl Directive {
    /// The directive for an assembly that is constructed, or `None` for `omit`
    pub fn build(self) -> Option<BuildDirective> {
        match self {
            Self::Omit => None,
            Self::Simple => Some(BuildDirective::Simple),
            Self::Detailed => Some(BuildDirective::Detailed),
            Self::Metadata => Some(BuildDirective::Metadata),
        }
    }
}

/// Directive of an assembly that is actually built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildDirective {
    Simple,
    Detailed,
    Metadata,
}

impl BuildDirective {
    /// Whether anything beyond the coarse shapes should be constructed
    pub fn is_detailed(self) -> bool {
        !matches!(self, Self::Simple)
    }
}

impl From<BuildDirective> for Directive {
    fn from(d: BuildDirective) -> Self {
        match d {
            BuildDirective::Simple => Self::Simple,
            BuildDirective::Detailed => Self::Detailed,
            BuildDirective::Metadata => Self::Metadata,
        }
    }
}

/// Detail table of the base config: level -> assembly -> directive
pub type DetailTable = BTreeMap<DetailLevel, BTreeMap<Assembly, Directive>>;

/// Per-assembly directives for one build.
///
/// The cryostat is stored apart as a [`BuildDirective`], which has no `omit`
/// variant: every other internal volume is placed in its frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDetail {
    cryostat: BuildDirective,
    directives: BTreeMap<Assembly, Directive>,
}

impl ResolvedDetail {
    pub fn directive(&self, assembly: Assembly) -> Directive {
        match assembly {
            Assembly::Cryo => self.cryostat.into(),
            other => self.directives.get(&other).copied().unwrap_or(Directive::Omit),
        }
    }

    /// Directive of a constructed assembly, `None` when it is omitted
    pub fn build(&self, assembly: Assembly) -> Option<BuildDirective> {
        self.directive(assembly).build()
    }

    pub fn cryostat(&self) -> BuildDirective {
        self.cryostat
    }

    /// All assemblies with their directive, in nesting order
    pub fn iter(&self) -> impl Iterator<Item = (Assembly, Directive)> + '_ {
        Assembly::ALL.into_iter().map(|a| (a, self.directive(a)))
    }
}

/// Parse a comma separated assembly allow-list such as `"hpge_strings,wlsr"`
pub fn parse_assembly_list(list: &str) -> Result<Vec<Assembly>> {
    let assemblies = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Assembly::from_str)
        .collect::<Result<Vec<_>>>()?;

    if assemblies.is_empty() {
        return Err(GeometryError::config("assembly list is empty"));
    }
    Ok(assemblies)
}

/// Resolve the directive of every known assembly.
///
/// With an allow-list, assemblies missing from it are omitted; the others take
/// the level's table entry, defaulting to omit. The cryostat is always built:
/// an omit from either source is corrected to its table directive (or
/// `simple`) with a warning.
pub fn resolve(
    table: &DetailTable,
    level: DetailLevel,
    allow_list: Option<&[Assembly]>,
) -> Result<ResolvedDetail> {
    let entries = table.get(&level).ok_or_else(|| {
        GeometryError::config(format!("detail table has no entry for level '{}'", level))
    })?;

    let allowed = |assembly: Assembly| allow_list.map_or(true, |list| list.contains(&assembly));

    let mut directives = BTreeMap::new();
    for assembly in Assembly::ALL {
        if assembly == Assembly::Cryo {
            continue;
        }
        let directive = if allowed(assembly) {
            entries.get(&assembly).copied().unwrap_or(Directive::Omit)
        } else {
            Directive::Omit
        };
        directives.insert(assembly, directive);
    }

    if !allowed(Assembly::Cryo) {
        log::warn!("The cryostat is always constructed; including 'cryo' although the assembly list omits it");
    }
    let cryostat = match entries.get(&Assembly::Cryo).copied() {
        Some(directive) => directive.build().unwrap_or_else(|| {
            log::warn!("Detail level '{}' omits the cryostat; building it with the simple directive", level);
            BuildDirective::Simple
        }),
        None => BuildDirective::Simple,
    };

    for (assembly, directive) in &directives {
        log::debug!("Assembly '{}' resolved to {:?}", assembly, directive);
    }
    log::debug!("Assembly 'cryo' resolved to {:?}", cryostat);

    Ok(ResolvedDetail { cryostat, directives })
}

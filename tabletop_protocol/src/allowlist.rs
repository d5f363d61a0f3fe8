// Deserialization allow-list.
//
// Before any argument payload is turned into a value, every type name it
// references is checked here. Denial is the default: a name is permitted
// only if it is one of the enumerated exact names (primitives, collections,
// the asset key) or lies under one of the enumerated domain prefixes. A
// prefix match requires a non-empty remainder made of well-formed
// identifier segments, so `tabletop.model.` alone, `tabletop.modelX.Token`
// and `tabletop.model.Token;x` are all denied.

use std::collections::BTreeSet;

#[derive(Clone, Debug)]
pub struct AllowList {
    exact: BTreeSet<&'static str>,
    prefixes: Vec<&'static str>,
}

const STANDARD_EXACT: &[&str] = &[
    "lang.Null",
    "lang.Boolean",
    "lang.Integer",
    "lang.Double",
    "lang.String",
    "lang.Bytes",
    "util.Guid",
    "util.GuidSet",
    "util.GuidList",
    "util.StringList",
    "util.List",
    "lib.Md5Key",
];

const STANDARD_PREFIXES: &[&str] = &["tabletop.geom.", "tabletop.model.", "tabletop.transfer."];

impl AllowList {
    /// An allow-list that permits nothing.
    pub fn deny_all() -> Self {
        Self {
            exact: BTreeSet::new(),
            prefixes: Vec::new(),
        }
    }

    /// The allow-list used by the server and clients.
    pub fn standard() -> Self {
        Self {
            exact: STANDARD_EXACT.iter().copied().collect(),
            prefixes: STANDARD_PREFIXES.to_vec(),
        }
    }

    pub fn permits(&self, name: &str) -> bool {
        if self.exact.contains(name) {
            return true;
        }
        self.prefixes.iter().any(|prefix| {
            name.strip_prefix(prefix)
                .is_some_and(|rest| !rest.is_empty() && rest.split('.').all(is_identifier))
        })
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::ArgType;

    #[test]
    fn every_wire_type_is_permitted() {
        let allow = AllowList::standard();
        for ty in ArgType::ALL {
            assert!(allow.permits(ty.name()), "{} should be permitted", ty.name());
        }
    }

    #[test]
    fn unlisted_names_are_denied() {
        let allow = AllowList::standard();
        for name in [
            "",
            "lang.Runtime",
            "lang.ProcessBuilder",
            "lang.Integer2",
            "Lang.Integer",
            "util.HashMap",
            "lib",
            "java.lang.Runtime",
            "tabletop",
            "tabletop.",
            "tabletop.Secret",
        ] {
            assert!(!allow.permits(name), "{name:?} should be denied");
        }
    }

    #[test]
    fn partial_prefix_matches_are_denied() {
        let allow = AllowList::standard();
        for name in [
            "tabletop.model",
            "tabletop.model.",
            "tabletop.modelX.Token",
            "tabletop.model..Token",
            "tabletop.model.Token.",
            "tabletop.model.Token;rm",
            "tabletop.model.9Token",
            "tabletop.model.Tok en",
            "xtabletop.model.Token",
            "tabletop.geometry.Area",
        ] {
            assert!(!allow.permits(name), "{name:?} should be denied");
        }
    }

    #[test]
    fn prefixed_names_are_permitted() {
        let allow = AllowList::standard();
        assert!(allow.permits("tabletop.model.Token"));
        assert!(allow.permits("tabletop.model.walker.Path"));
        assert!(allow.permits("tabletop.geom.Area"));
    }

    #[test]
    fn deny_all_permits_nothing() {
        let allow = AllowList::deny_all();
        assert!(!allow.permits("lang.String"));
        assert!(!allow.permits("tabletop.model.Token"));
    }
}

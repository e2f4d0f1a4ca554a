//! SNODAS product codes and variable identification.
//!
//! Member names inside a daily tarball embed a 4-digit product code, e.g.
//! `us_ssmv11036tS__T0001TTNATS2021010105HP001.dat.gz` carries `1036`
//! (snow depth). Identification is an ordered table lookup over the
//! 4-digit groups of the name, with an explicit substring fallback for
//! names whose code is not aligned on a group boundary.

/// Raw integer reserved for "no measurement".
pub const NODATA_RAW: i16 = -9999;

/// A recognised product code and its archive variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableCode {
    pub code: &'static str,
    pub name: &'static str,
}

/// Recognised product codes.
pub const VARIABLE_CODES: &[VariableCode] = &[
    VariableCode { code: "1036", name: "snow_depth" },
    VariableCode { code: "1034", name: "swe" },
    VariableCode { code: "1038", name: "snow_accumulation" },
    VariableCode { code: "1039", name: "snow_melt" },
    VariableCode { code: "1033", name: "snow_cover" },
    VariableCode { code: "1037", name: "snow_depth_change" },
];

/// Codes checked as plain substrings when no 4-digit group matched.
const FALLBACK_CODES: &[&str] = &["1036", "1034", "1038", "1039", "1033", "1037"];

/// Map a product code to its variable name.
pub fn variable_name(code: &str) -> Option<&'static str> {
    VARIABLE_CODES
        .iter()
        .find(|v| v.code == code)
        .map(|v| v.name)
}

/// Split a name into non-overlapping 4-digit groups, left to right.
///
/// Each maximal run of ASCII digits contributes `len / 4` groups taken from
/// its start; trailing digits that do not fill a group are dropped.
pub fn four_digit_groups(name: &str) -> Vec<&str> {
    let bytes = name.as_bytes();
    let mut groups = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        let mut pos = start;
        while pos + 4 <= i {
            groups.push(&name[pos..pos + 4]);
            pos += 4;
        }
    }

    groups
}

/// Identify the archive variable carried by a tar member name.
///
/// The first 4-digit group found in the code table wins. Only when no group
/// matches is the fallback substring list consulted.
pub fn identify_variable(member_name: &str) -> Option<&'static str> {
    if let Some(name) = four_digit_groups(member_name)
        .into_iter()
        .find_map(variable_name)
    {
        return Some(name);
    }

    FALLBACK_CODES
        .iter()
        .find(|code| member_name.contains(*code))
        .and_then(|code| variable_name(code))
}

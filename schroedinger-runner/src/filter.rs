// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Substring-based filtering of the configured groups.
//!
//! The whitelist and blacklist are comma-separated lists of substrings,
//! matched against a group's name and its declared case names. The
//! blacklist takes precedence: exclusion wins. An empty whitelist matches
//! everything.

use crate::config::GroupConfig;

/// Whitelist/blacklist criteria applied to groups before a run.
#[derive(Clone, Debug, Default)]
pub struct NameFilter {
    whitelist: Vec<String>,
    blacklist: Vec<String>,
}

impl NameFilter {
    /// Builds a filter from comma-separated pattern lists.
    ///
    /// Empty entries and surrounding whitespace are discarded; an empty
    /// string produces no patterns at all.
    pub fn new(whitelist: &str, blacklist: &str) -> Self {
        Self {
            whitelist: parse_match_list(whitelist),
            blacklist: parse_match_list(blacklist),
        }
    }

    /// The whitelist patterns.
    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    /// The blacklist patterns.
    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    /// Returns true if `group` survives filtering.
    ///
    /// A group is excluded if its name or any declared case name contains
    /// any blacklist substring, and included if the whitelist is empty or
    /// any whitelist substring is contained in any of those names.
    pub fn matches(&self, group: &GroupConfig) -> bool {
        if self
            .blacklist
            .iter()
            .any(|pattern| group_contains(group, pattern))
        {
            return false;
        }
        self.whitelist.is_empty()
            || self
                .whitelist
                .iter()
                .any(|pattern| group_contains(group, pattern))
    }
}

fn group_contains(group: &GroupConfig, pattern: &str) -> bool {
    group.name.contains(pattern) || group.cases.iter().any(|case| case.name.contains(pattern))
}

fn parse_match_list(list: &str) -> Vec<String> {
    // eg. "", "downloader,fetcher", "sync"
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaseConfig;
    use test_case::test_case;

    fn group(name: &str, cases: &[&str]) -> GroupConfig {
        GroupConfig {
            name: name.to_owned(),
            any_failing: false,
            trials: None,
            cases: cases
                .iter()
                .map(|&name| CaseConfig {
                    name: name.to_owned(),
                    trials: None,
                })
                .collect(),
        }
    }

    #[test]
    fn parse_match_list_splits_and_trims() {
        assert_eq!(parse_match_list(""), Vec::<String>::new());
        assert_eq!(parse_match_list("downloader,fetcher"), ["downloader", "fetcher"]);
        assert_eq!(parse_match_list(" sync , ,fetcher "), ["sync", "fetcher"]);
    }

    #[test_case("", "", "pkg/flakytest", &[], true; "no restriction")]
    #[test_case("", "flaky", "pkg/flakytest", &[], false; "blacklisted by name")]
    #[test_case("flaky", "flaky", "pkg/flakytest", &[], false; "blacklist wins over whitelist")]
    #[test_case("core", "", "pkg/flakytest", &[], false; "not whitelisted")]
    #[test_case("core", "", "pkg/core", &[], true; "whitelisted by name")]
    #[test_case("core", "", "pkg/other", &["TestCoreThing"], false; "case names are case sensitive")]
    #[test_case("Core", "", "pkg/other", &["TestCoreThing"], true; "whitelisted by case name")]
    #[test_case("", "Core", "pkg/other", &["TestCoreThing"], false; "blacklisted by case name")]
    #[test_case("zzz,core", "", "pkg/core", &[], true; "any whitelist entry matches")]
    #[test_case("zzz,yyy", "", "pkg/core", &[], false; "no whitelist entry matches")]
    fn matches(whitelist: &str, blacklist: &str, name: &str, cases: &[&str], expected: bool) {
        let filter = NameFilter::new(whitelist, blacklist);
        assert_eq!(filter.matches(&group(name, cases)), expected);
    }
}

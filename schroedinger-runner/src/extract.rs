// Copyright (c) The schroedinger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction of individually failing case names from runner output.

/// Marker the runner prints on the line reporting an individually failing
/// case, e.g. `--- FAIL: TestFastCriticalRestarts64 (12.34s)`.
pub const FAIL_MARKER: &str = "--- FAIL:";

/// Scans captured runner output for individually failing cases.
///
/// The scan is line-oriented and tolerant of interleaved unrelated output:
/// a line either carries [`FAIL_MARKER`] followed by a case name and a
/// parenthesized duration, or it is ignored. Names are returned in order of
/// appearance; a name that appears twice is returned twice, and each
/// occurrence is retried independently.
///
/// An empty result for output that accompanied a failing run means the
/// failure could not be attributed to any case — a reportable condition of
/// its own, not a pass.
pub fn failing_cases(output: &str) -> Vec<String> {
    let mut fails = Vec::new();
    for line in output.lines() {
        let Some((_, rest)) = line.split_once(FAIL_MARKER) else {
            continue;
        };
        let name = rest.split('(').next().unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        fails.push(name.to_owned());
    }
    fails
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_names_in_order() {
        let output = indoc! {"
            === RUN   TestAlpha
            some unrelated log line
            --- FAIL: TestAlpha (1.23s)
            === RUN   TestBeta
            --- FAIL: TestBeta (0.01s)
            FAIL
            exit status 1
        "};
        assert_eq!(failing_cases(output), ["TestAlpha", "TestBeta"]);
    }

    #[test]
    fn no_markers_yield_empty() {
        let output = indoc! {"
            build failed: cannot find package
            exit status 2
        "};
        assert_eq!(failing_cases(output), Vec::<String>::new());
    }

    #[test]
    fn duplicates_are_preserved() {
        let output = indoc! {"
            --- FAIL: TestAlpha (0.10s)
            --- FAIL: TestAlpha (0.20s)
        "};
        assert_eq!(failing_cases(output), ["TestAlpha", "TestAlpha"]);
    }

    #[test]
    fn indented_subtest_markers_are_recognized() {
        let output = indoc! {"
            --- FAIL: TestParent (0.30s)
                --- FAIL: TestParent/child (0.10s)
        "};
        assert_eq!(failing_cases(output), ["TestParent", "TestParent/child"]);
    }

    #[test]
    fn marker_without_a_name_is_ignored() {
        assert_eq!(failing_cases("--- FAIL:\n--- FAIL: (0.1s)\n"), Vec::<String>::new());
    }
}

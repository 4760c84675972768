// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

/// Locations GitHub reads a CODEOWNERS file from, in precedence order.
pub const CODE_OWNERS_PATHS: [&str; 3] = [".github/CODEOWNERS", "CODEOWNERS", "docs/CODEOWNERS"];

/// Individual users named as owners in a CODEOWNERS file.
///
/// Teams (`@org/team`) and e-mail owners are skipped; each login appears once,
/// in order of first mention.
pub fn parse_code_owners(content: &str) -> Vec<String> {
    let mut owners: Vec<String> = Vec::new();
    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default();
        for owner in line.split_whitespace().skip(1) {
            let Some(login) = owner.strip_prefix('@') else {
                continue;
            };
            if login.is_empty() || login.contains('/') {
                continue;
            }
            if !owners.iter().any(|known| known.eq_ignore_ascii_case(login)) {
                owners.push(login.to_string());
            }
        }
    }
    owners
}

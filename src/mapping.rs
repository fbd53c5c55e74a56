/// Canonical profile key -> accepted field name spellings.
///
/// The first alias of each entry is the form server's field id (the "wire
/// name") used by `/submit` and `/get_profile`. Alias lists are not
/// guaranteed disjoint; `resolve` walks the table in declaration order, so
/// the first canonical key whose list contains the name wins. Overlaps are
/// reported by `alias_conflicts`, not removed.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    // Personal information
    ("full_name", &["fullName", "name", "applicant_name", "employee_name"]),
    ("date_of_birth", &["dateOfBirth", "birthdate", "dob"]),
    ("gender", &["gender", "sex"]),
    ("nationality", &["nationality", "citizenship"]),
    // Contact information
    ("email", &["email", "email_address", "contact_email"]),
    ("phone", &["phone", "phone_number", "contact_number", "mobile"]),
    ("alternate_phone", &["alternatePhone", "alternate_contact", "secondary_phone"]),
    ("address", &["address", "complete_address", "residential_address", "home_address"]),
    // Educational background
    ("education", &["educationLevel", "highest_education", "education_level"]),
    ("school", &["school", "university", "institution"]),
    ("course", &["course", "program", "degree", "major"]),
    ("year_graduated", &["yearGraduated", "graduation_year", "year_of_graduation"]),
    // Employment information
    ("employer", &["employer", "company", "current_employer"]),
    ("position", &["position", "job_title", "designation"]),
    ("experience", &["experience", "years_of_experience", "work_experience"]),
    ("salary", &["salary", "monthly_salary", "income"]),
    // Government IDs
    ("sss_number", &["sssNumber", "sss", "social_security"]),
    ("tin_number", &["tinNumber", "tin", "tax_id"]),
    ("philhealth_number", &["philhealthNumber", "philhealth", "health_insurance"]),
    ("pagibig_number", &["pagibigNumber", "pagibig", "hdmf"]),
];

/// Canonical keys the server requires non-empty before a profile can be saved.
pub const REQUIRED_KEYS: &[&str] = &["full_name", "email", "phone", "address"];

/// Resolve a raw field name to its canonical key. Case-sensitive exact
/// match, no normalization; `None` means unresolved and is not an error.
pub fn resolve(raw_name: &str) -> Option<&'static str> {
    resolve_in(FIELD_ALIASES, raw_name)
}

fn resolve_in(
    table: &'static [(&'static str, &'static [&'static str])],
    raw_name: &str,
) -> Option<&'static str> {
    for &(key, aliases) in table {
        if aliases.contains(&raw_name) {
            return Some(key);
        }
    }
    None
}

pub fn is_canonical(key: &str) -> bool {
    FIELD_ALIASES.iter().any(|(k, _)| *k == key)
}

/// The field id the form server uses for a canonical key (first alias).
pub fn wire_name(canonical: &str) -> Option<&'static str> {
    FIELD_ALIASES
        .iter()
        .find(|(k, _)| *k == canonical)
        .and_then(|(_, aliases)| aliases.first().copied())
}

/// Aliases claimed by more than one canonical key: (alias, winner, shadowed).
/// The winner is the first-declared key; `resolve` never returns the shadowed one.
pub fn alias_conflicts() -> Vec<(&'static str, &'static str, &'static str)> {
    let mut conflicts = Vec::new();
    for (i, (key, aliases)) in FIELD_ALIASES.iter().enumerate() {
        for alias in *aliases {
            for (later_key, later_aliases) in &FIELD_ALIASES[i + 1..] {
                if later_aliases.contains(alias) {
                    conflicts.push((*alias, *key, *later_key));
                }
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_wire_names_to_canonical_keys() {
        assert_eq!(resolve("fullName"), Some("full_name"));
        assert_eq!(resolve("dob"), Some("date_of_birth"));
        assert_eq!(resolve("job_title"), Some("position"));
        assert_eq!(resolve("hdmf"), Some("pagibig_number"));
    }

    #[test]
    fn resolve_is_deterministic() {
        for raw in ["fullName", "mobile", "tax_id", "not_a_field", ""] {
            let first = resolve(raw);
            for _ in 0..3 {
                assert_eq!(resolve(raw), first);
            }
        }
    }

    #[test]
    fn resolve_is_case_sensitive_and_exact() {
        assert_eq!(resolve("fullname"), None);
        assert_eq!(resolve("FullName"), None);
        assert_eq!(resolve(" fullName"), None);
        assert_eq!(resolve("unknown_field"), None);
    }

    #[test]
    fn first_declared_key_wins_on_overlapping_lists() {
        static OVERLAPPING: &[(&str, &[&str])] = &[
            ("phone", &["phone", "mobile"]),
            ("alternate_phone", &["mobile", "secondary_phone"]),
        ];
        assert_eq!(resolve_in(OVERLAPPING, "mobile"), Some("phone"));
        assert_eq!(resolve_in(OVERLAPPING, "secondary_phone"), Some("alternate_phone"));
    }

    #[test]
    fn wire_name_is_first_alias() {
        assert_eq!(wire_name("full_name"), Some("fullName"));
        assert_eq!(wire_name("email"), Some("email"));
        assert_eq!(wire_name("no_such_key"), None);
    }

    #[test]
    fn wire_names_round_trip_through_resolve() {
        for (key, _) in FIELD_ALIASES {
            let wire = wire_name(key).unwrap();
            assert_eq!(resolve(wire), Some(*key), "wire name of {key} must resolve back");
        }
    }

    #[test]
    fn required_keys_are_canonical() {
        for key in REQUIRED_KEYS {
            assert!(is_canonical(key), "{key} missing from alias table");
        }
    }

    #[test]
    fn shipped_table_conflicts_are_reported_not_hidden() {
        // The observed table happens to be disjoint today; the check exists
        // so any future overlap is visible instead of silently shadowed.
        for (alias, winner, shadowed) in alias_conflicts() {
            assert_eq!(resolve(alias), Some(winner), "{alias} shadowed by {shadowed}");
        }
    }
}

//! Combining per-chunk extractions into one record.

use super::text::unique_id;
use crate::model::BusinessLogic;
use std::collections::HashSet;

fn same_text(a: &str, b: &str) -> bool {
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    normalize(a) == normalize(b)
}

/// Merge records extracted from consecutive chunks of one program.
///
/// Identity fields come from the first part that has them. A rule whose
/// description repeats an earlier one is dropped; a reused identifier with a
/// new description is kept under a suffixed identifier.
pub fn merge_business_logic(parts: Vec<BusinessLogic>) -> BusinessLogic {
    let mut parts = parts.into_iter();
    let Some(mut merged) = parts.next() else {
        return BusinessLogic::default();
    };

    let mut taken: HashSet<String> =
        merged.core_rules.iter().map(|r| r.id.to_lowercase()).collect();

    for part in parts {
        if merged.program_name.trim().is_empty() {
            merged.program_name = part.program_name;
        }
        if merged.program_purpose.trim().is_empty() {
            merged.program_purpose = part.program_purpose;
        }

        for mut rule in part.core_rules {
            let duplicate = merged
                .core_rules
                .iter()
                .any(|r| same_text(&r.description, &rule.description));
            if duplicate {
                continue;
            }
            rule.id = unique_id(&taken, &rule.id);
            taken.insert(rule.id.to_lowercase());
            merged.core_rules.push(rule);
        }

        for validation in part.validations {
            let duplicate = merged.validations.iter().any(|v| {
                v.field.eq_ignore_ascii_case(&validation.field)
                    && same_text(&v.rule, &validation.rule)
            });
            if !duplicate {
                merged.validations.push(validation);
            }
        }

        for case in part.special_cases {
            let duplicate = merged.special_cases.iter().any(|c| {
                same_text(&c.condition, &case.condition) && same_text(&c.handling, &case.handling)
            });
            if !duplicate {
                merged.special_cases.push(case);
            }
        }

        for point in part.integration_points {
            match merged
                .integration_points
                .iter_mut()
                .find(|p| p.name.eq_ignore_ascii_case(&point.name))
            {
                Some(existing) => {
                    if existing.description.trim().is_empty() {
                        existing.description = point.description;
                    }
                }
                None => merged.integration_points.push(point),
            }
        }

        for block in part.additional_notes.split("\n\n") {
            let block = block.trim();
            if block.is_empty() || merged.additional_notes.contains(block) {
                continue;
            }
            if !merged.additional_notes.is_empty() {
                merged.additional_notes.push_str("\n\n");
            }
            merged.additional_notes.push_str(block);
        }
    }

    merged
}

//! Duplicate merge by identity key.

use std::collections::BTreeSet;

use hrsync_types::UnifiedRecord;
use indexmap::IndexMap;

/// How one field is combined when two records merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Keep the accumulator's value; fill only when it is empty.
    FirstNonNull,
    /// Prefer the incoming value when it is present.
    LastNonNull,
    /// Keep the greater of the two values.
    Latest,
}

/// Field-level merge policy. Descriptive fields share one policy; the
/// timestamp has its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    pub fields: FieldPolicy,
    pub processed_at: FieldPolicy,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            fields: FieldPolicy::FirstNonNull,
            processed_at: FieldPolicy::Latest,
        }
    }
}

fn pick<T: Clone + PartialOrd>(policy: FieldPolicy, acc: &Option<T>, next: &Option<T>) -> Option<T> {
    match (policy, acc, next) {
        (_, None, v) | (_, v, None) => v.clone(),
        (FieldPolicy::FirstNonNull, a, _) => a.clone(),
        (FieldPolicy::LastNonNull, _, n) => n.clone(),
        (FieldPolicy::Latest, Some(a), Some(n)) => Some(if n > a { n.clone() } else { a.clone() }),
    }
}

macro_rules! merge_fields {
    ($policy:expr, $acc:expr, $next:expr, $out:ident; $($field:ident),+ $(,)?) => {
        $( $out.$field = pick($policy, &$acc.$field, &$next.$field); )+
    };
}

/// Combine two records into a new one. Inputs are not modified.
///
/// Provenance (`source_system`, `record_id`, `data_version`, `is_active`)
/// comes from `acc`. `merged_records_count` and `source_systems` are
/// recomputed from both sides.
#[must_use]
pub fn merge_pair(acc: &UnifiedRecord, next: &UnifiedRecord, policy: &MergePolicy) -> UnifiedRecord {
    let mut out = acc.clone();
    merge_fields!(policy.fields, acc, next, out;
        employee_id, first_name, last_name, full_name, email, department, position,
        hire_date, birth_date, gender, employment_type, working_hours, break_time,
        annual_salary, monthly_salary, hourly_wage, basic_salary, allowances, deductions,
        net_salary, fixed_premium_wage, employment_insurance, social_insurance,
        spouse_info, work_schedule, holidays,
    );

    out.processed_at = pick(
        policy.processed_at,
        &Some(acc.processed_at),
        &Some(next.processed_at),
    )
    .unwrap_or(acc.processed_at);

    out.merged_records_count = acc.merged_records_count + next.merged_records_count;
    out.source_systems = Some(join_sources([acc, next]));
    out
}

/// Every source a record stands for: its own plus any it absorbed.
fn sources_of(record: &UnifiedRecord) -> impl Iterator<Item = &str> {
    std::iter::once(record.source_system.as_str()).chain(
        record
            .source_systems
            .as_deref()
            .into_iter()
            .flat_map(|s| s.split(','))
            .filter(|s| !s.is_empty()),
    )
}

fn join_sources<'a>(records: impl IntoIterator<Item = &'a UnifiedRecord>) -> String {
    let set: BTreeSet<&str> = records.into_iter().flat_map(sources_of).collect();
    set.into_iter().collect::<Vec<_>>().join(",")
}

/// Fold a group left to right. Returns `None` for an empty group; a
/// singleton is returned unchanged.
#[must_use]
pub fn merge_group(group: &[UnifiedRecord], policy: &MergePolicy) -> Option<UnifiedRecord> {
    let (first, rest) = group.split_first()?;
    Some(
        rest.iter()
            .fold(first.clone(), |acc, next| merge_pair(&acc, next, policy)),
    )
}

/// Collapse records sharing an identity key. Groups keep the order of
/// their first appearance. Records without an identity pass through on
/// their own.
#[must_use]
pub fn merge_duplicates(records: Vec<UnifiedRecord>, policy: &MergePolicy) -> Vec<UnifiedRecord> {
    let mut groups: IndexMap<String, Vec<UnifiedRecord>> = IndexMap::new();
    let mut keyless = Vec::new();

    for record in records {
        match record.identity().map(str::to_string) {
            Some(id) => groups.entry(id).or_default().push(record),
            None => keyless.push(record),
        }
    }

    let mut merged: Vec<UnifiedRecord> = groups
        .into_values()
        .filter_map(|group| {
            if group.len() > 1 {
                tracing::debug!(
                    employee_id = group[0].identity().unwrap_or_default(),
                    duplicates = group.len(),
                    "merging duplicate records"
                );
            }
            merge_group(&group, policy)
        })
        .collect();
    merged.extend(keyless);
    merged
}

//! Planning the time axis of a merged archive.

use chrono::NaiveDate;

/// Where the data for one output time step comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceSource {
    /// Index into the existing archive's time axis.
    Existing(usize),
    /// Index into the newly decoded dataset.
    New(usize),
}

/// Sorted, duplicate-free union of existing and new time steps.
///
/// When a date appears in both, the existing time step is kept; within one
/// side, the first occurrence is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    steps: Vec<(NaiveDate, SliceSource)>,
}

impl MergePlan {
    pub fn new(existing: &[NaiveDate], new: &[NaiveDate]) -> Self {
        let mut steps: Vec<(NaiveDate, SliceSource)> = existing
            .iter()
            .enumerate()
            .map(|(i, d)| (*d, SliceSource::Existing(i)))
            .chain(new.iter().enumerate().map(|(i, d)| (*d, SliceSource::New(i))))
            .collect();

        // Stable: for equal dates, existing entries stay ahead of new ones.
        steps.sort_by_key(|(date, _)| *date);
        steps.dedup_by_key(|(date, _)| *date);

        Self { steps }
    }

    /// Plan for a fresh archive made only of new time steps.
    pub fn fresh(new: &[NaiveDate]) -> Self {
        Self::new(&[], new)
    }

    pub fn steps(&self) -> &[(NaiveDate, SliceSource)] {
        &self.steps
    }

    pub fn times(&self) -> Vec<NaiveDate> {
        self.steps.iter().map(|(d, _)| *d).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Time steps taken from the new dataset.
    pub fn added(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, s)| matches!(s, SliceSource::New(_)))
            .count()
    }

    /// Whether the plan reads from an existing archive.
    pub fn uses_existing(&self) -> bool {
        self.steps
            .iter()
            .any(|(_, s)| matches!(s, SliceSource::Existing(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    #[test]
    fn test_union_is_sorted() {
        let plan = MergePlan::new(&[day(1), day(2), day(5)], &[day(4), day(3)]);
        assert_eq!(plan.times(), vec![day(1), day(2), day(3), day(4), day(5)]);
        assert_eq!(plan.steps()[2], (day(3), SliceSource::New(1)));
        assert_eq!(plan.steps()[4], (day(5), SliceSource::Existing(2)));
        assert_eq!(plan.added(), 2);
    }

    #[test]
    fn test_existing_wins_on_duplicates() {
        let plan = MergePlan::new(&[day(1), day(2)], &[day(2), day(3)]);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.steps()[1], (day(2), SliceSource::Existing(1)));
        assert_eq!(plan.added(), 1);
    }

    #[test]
    fn test_fresh_plan() {
        let plan = MergePlan::fresh(&[day(2), day(1), day(2)]);
        assert_eq!(plan.times(), vec![day(1), day(2)]);
        assert_eq!(plan.steps()[1], (day(2), SliceSource::New(0)));
        assert!(!plan.uses_existing());
        assert!(MergePlan::fresh(&[]).is_empty());
    }
}

//! Data carried between the pipeline stages.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Catalog metadata for one course code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseInfo {
    pub name: String,
    pub department_id: String,
}

/// Course code → metadata for the student's current term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogMap(HashMap<String, CourseInfo>);

impl CatalogMap {
    pub fn get(&self, code: &str) -> Option<&CourseInfo> {
        self.0.get(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, CourseInfo)> for CatalogMap {
    fn from_iter<I: IntoIterator<Item = (String, CourseInfo)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Course codes being watched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetCourseSet(BTreeSet<String>);

impl TargetCourseSet {
    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TargetCourseSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .map(|code: String| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),
        )
    }
}

/// A section with an enabled selection checkbox in one poll response.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AvailableCourse {
    pub section_id: String,
    pub capacity_label: String,
}

impl fmt::Display for AvailableCourse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.section_id, self.capacity_label)
    }
}

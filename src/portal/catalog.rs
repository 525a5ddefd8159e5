//! Loading the student's term schedule into a [`CatalogMap`].

use std::collections::HashMap;
use tracing::{info, warn};

use crate::portal::auth::EnrollmentEntry;
use crate::portal::errors::PortalError;
use crate::portal::html::Document;
use crate::portal::models::{CatalogMap, CourseInfo};
use crate::portal::session::PortalSession;

/// Visible text of the enrollment-page link to the term schedule.
pub const SCHEDULE_LINK_TEXT: &str = "学期课表";
/// `name` of the department filter `<select>` on the schedule page.
pub const DEPARTMENT_SELECT_NAME: &str = "deptId";

/// Minimum cell count of a schedule table row describing a course.
const MIN_CATALOG_CELLS: usize = 9;

/// Parse the schedule page into a catalog.
///
/// Course rows are numbered from 1 in their first cell. A row counts only if
/// its number is the next one expected, so unrelated tables with numeric
/// first cells do not leak in.
pub fn parse_schedule(body: &str) -> Result<CatalogMap, PortalError> {
    let doc = Document::parse(body);
    let departments: HashMap<String, String> = doc
        .select_options(DEPARTMENT_SELECT_NAME)
        .ok_or_else(|| PortalError::missing(format!("select[name={DEPARTMENT_SELECT_NAME}]")))?
        .into_iter()
        .collect();

    let mut expected = 1usize;
    let mut entries = Vec::new();
    let rows = doc.rows_matching(|row| row.len() >= MIN_CATALOG_CELLS);

    for row in rows {
        let cells = row.texts();
        if cells[0] != expected.to_string() {
            continue;
        }
        expected += 1;

        let (department, code, name) = (&cells[1], &cells[2], &cells[3]);
        match departments.get(department) {
            Some(department_id) => entries.push((
                code.clone(),
                CourseInfo {
                    name: name.clone(),
                    department_id: department_id.clone(),
                },
            )),
            None => warn!(
                code = code.as_str(),
                department = department.as_str(),
                "Course department not in department list, skipping"
            ),
        }
    }

    if entries.is_empty() {
        return Err(PortalError::CatalogEmpty);
    }

    Ok(entries.into_iter().collect())
}

/// Follow the schedule link from the enrollment page and load the catalog.
pub async fn load_catalog(
    session: &PortalSession,
    entry: &EnrollmentEntry,
) -> Result<CatalogMap, PortalError> {
    let schedule_url = entry.link(session, SCHEDULE_LINK_TEXT)?;
    let body = session.get(&schedule_url).await?;
    let catalog = parse_schedule(&body)?;
    info!(count = catalog.len(), "Loaded course catalog");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> String {
        let mut html = String::from("<tr>");
        for cell in cells {
            html.push_str(&format!("<td>{cell}</td>"));
        }
        html.push_str("</tr>");
        html
    }

    fn course_row(n: &str, dept: &str, code: &str, name: &str) -> String {
        row(&[n, dept, code, name, "3", "40", "Prof", "Mon", "A101"])
    }

    fn schedule(rows: &[String]) -> String {
        format!(
            r#"<html><body>
            <select name="deptId">
                <option value="10">Computer Science</option>
                <option value="20">Mathematics</option>
            </select>
            <table>{}</table>
            </body></html>"#,
            rows.concat()
        )
    }

    #[test]
    fn test_parse_single_course() {
        let body = schedule(&[course_row("1", "Computer Science", "CS101", "Intro to CS")]);
        let catalog = parse_schedule(&body).unwrap();
        let expected: CatalogMap = [(
            "CS101".to_string(),
            CourseInfo {
                name: "Intro to CS".to_string(),
                department_id: "10".to_string(),
            },
        )]
        .into_iter()
        .collect();
        assert_eq!(catalog, expected);
    }

    #[test]
    fn test_sequence_break_stops_matching() {
        let body = schedule(&[
            course_row("1", "Computer Science", "CS101", "Intro to CS"),
            course_row("2", "Mathematics", "MA201", "Linear Algebra"),
            course_row("3", "Mathematics", "MA202", "Analysis"),
            course_row("5", "Computer Science", "CS500", "Compilers"),
            course_row("6", "Computer Science", "CS600", "Databases"),
        ]);
        let catalog = parse_schedule(&body).unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("CS500").is_none());
        assert!(catalog.get("CS600").is_none());
        assert_eq!(catalog.get("MA202").unwrap().department_id, "20");
    }

    #[test]
    fn test_short_rows_ignored() {
        let body = schedule(&[
            row(&["1", "Computer Science", "CS999", "Short"]),
            course_row("1", "Computer Science", "CS101", "Intro to CS"),
        ]);
        let catalog = parse_schedule(&body).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("CS101").is_some());
    }

    #[test]
    fn test_unknown_department_skipped_but_sequence_advances() {
        let body = schedule(&[
            course_row("1", "Physics", "PH101", "Mechanics"),
            course_row("2", "Computer Science", "CS101", "Intro to CS"),
        ]);
        let catalog = parse_schedule(&body).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("PH101").is_none());
        assert!(catalog.get("CS101").is_some());
    }

    #[test]
    fn test_no_numbered_rows_is_empty_catalog() {
        let body = schedule(&[course_row("序号", "院系", "课程编码", "课程名称")]);
        assert!(matches!(
            parse_schedule(&body),
            Err(PortalError::CatalogEmpty)
        ));
    }

    #[test]
    fn test_missing_department_select() {
        let body = format!("<table>{}</table>", course_row("1", "Computer Science", "CS101", "x"));
        assert!(matches!(
            parse_schedule(&body),
            Err(PortalError::ElementNotFound(_))
        ));
    }
}

//! Typed queries over a parsed portal page.
//!
//! Every lookup returns an `Option` so callers decide what a missing element
//! means for them. Parsing is synchronous and owns nothing network-related;
//! callers fetch a body, parse it here, and extract owned data before the next
//! request.

use html_scraper::{ElementRef, Html, Selector};
use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static FORM_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static INPUT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name]").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static SELECT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("select").unwrap());
static OPTION_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static CHECKBOX_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"input[type="checkbox"]"#).unwrap());

/// Collapsed, trimmed text content of an element.
fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Named form inputs in document order.
///
/// The portal expects every default field round-tripped on submit, so order
/// and duplicates are preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    /// Value of the first field with `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite the first field with `name`, or append it if absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.0.iter_mut().find(|(n, _)| n == name) {
            existing.1 = value;
        } else {
            self.0.push((name.to_string(), value));
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

/// A `<form>` element's submit target and its named inputs.
#[derive(Debug, Clone)]
pub struct Form {
    pub action: Option<String>,
    pub fields: FormFields,
}

/// A checkbox input found inside a table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkbox {
    pub value: String,
    pub disabled: bool,
}

/// One `<tr>` and its `<td>` cells.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    cells: Vec<ElementRef<'a>>,
}

impl<'a> Row<'a> {
    fn from_element(tr: ElementRef<'a>) -> Self {
        Self {
            cells: tr.select(&CELL_SEL).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Trimmed text of the cell at `index`.
    pub fn text(&self, index: usize) -> Option<String> {
        self.cells.get(index).map(|cell| element_text(*cell))
    }

    /// Trimmed text of every cell.
    pub fn texts(&self) -> Vec<String> {
        self.cells.iter().map(|cell| element_text(*cell)).collect()
    }

    /// First checkbox named `name` inside the cell at `index`.
    pub fn checkbox(&self, index: usize, name: &str) -> Option<Checkbox> {
        let cell = self.cells.get(index)?;
        cell.select(&CHECKBOX_SEL)
            .find(|input| input.attr("name") == Some(name))
            .map(|input| Checkbox {
                value: input.attr("value").unwrap_or_default().to_string(),
                disabled: input.attr("disabled").is_some(),
            })
    }
}

/// A parsed HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// First capture group of `pattern` in the first inline script it matches.
    pub fn script_capture(&self, pattern: &Regex) -> Option<String> {
        self.html.select(&SCRIPT_SEL).find_map(|script| {
            let text = script.text().collect::<String>();
            pattern
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    }

    /// The form with the given `id` attribute.
    pub fn form(&self, id: &str) -> Option<Form> {
        let form = self
            .html
            .select(&FORM_SEL)
            .find(|form| form.attr("id") == Some(id))?;

        let fields = form
            .select(&INPUT_SEL)
            .filter_map(|input| {
                let name = input.attr("name")?;
                let value = input.attr("value").unwrap_or_default();
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        Some(Form {
            action: form.attr("action").map(str::to_string),
            fields: FormFields(fields),
        })
    }

    /// Named inputs of the form with the given `id`.
    pub fn form_fields(&self, id: &str) -> Option<FormFields> {
        self.form(id).map(|form| form.fields)
    }

    /// `href` of the first link whose visible text is exactly `text`.
    pub fn link_by_text(&self, text: &str) -> Option<String> {
        self.html
            .select(&LINK_SEL)
            .find(|a| element_text(*a) == text)
            .and_then(|a| a.attr("href"))
            .map(str::to_string)
    }

    /// `href` of the first link whose `title` attribute is exactly `title`.
    pub fn link_by_title(&self, title: &str) -> Option<String> {
        self.html
            .select(&LINK_SEL)
            .find(|a| a.attr("title") == Some(title))
            .and_then(|a| a.attr("href"))
            .map(str::to_string)
    }

    /// `(text, value)` pairs of the `<select name=...>` options. Options
    /// without a `value` attribute are skipped.
    pub fn select_options(&self, name: &str) -> Option<Vec<(String, String)>> {
        let select = self
            .html
            .select(&SELECT_SEL)
            .find(|select| select.attr("name") == Some(name))?;

        Some(
            select
                .select(&OPTION_SEL)
                .filter_map(|option| {
                    let value = option.attr("value")?;
                    Some((element_text(option), value.to_string()))
                })
                .collect(),
        )
    }

    /// Every table row in document order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.html.select(&ROW_SEL).map(Row::from_element)
    }

    /// Table rows accepted by `predicate`, lazily.
    pub fn rows_matching<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = Row<'a>>
    where
        P: FnMut(&Row<'a>) -> bool + 'a,
    {
        self.rows().filter(move |row| predicate(row))
    }
}

//! The course-search form, modeled as an explicit value.
//!
//! Banner's schedule search is a stateful two-step form: the server-side
//! procedure validates that the full set of filter fields from the rendered
//! form is round-tripped, including a leading `dummy` sentinel for every
//! multi-select and a trailing `%` wildcard for each unused filter. Building
//! the parameter list from a value (rather than scraping the form each time)
//! keeps the coupling visible: if the upstream form gains a field, this is
//! the one place to add it.

/// One course-search request: a term plus the subject codes to query.
///
/// Subject lists are batched by the caller; the server rejects oversized
/// query strings well before any documented limit, so batches stay small.
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub term_id: String,
    pub subjects: Vec<String>,
}

impl SearchSession {
    pub fn new(term_id: impl Into<String>, subjects: Vec<String>) -> Self {
        Self {
            term_id: term_id.into(),
            subjects,
        }
    }

    /// Render the full POST body as ordered key/value pairs.
    ///
    /// Order matters: `sel_subj` appears once as the `dummy` sentinel, then
    /// once per requested subject, and the wildcard fields come last.
    pub fn form_params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = vec![
            ("term_in", self.term_id.clone()),
            ("sel_subj", "dummy".into()),
            ("sel_day", "dummy".into()),
            ("sel_schd", "dummy".into()),
            ("sel_insm", "dummy".into()),
            ("sel_camp", "dummy".into()),
            ("sel_levl", "dummy".into()),
            ("sel_sess", "dummy".into()),
            ("sel_instr", "dummy".into()),
            ("sel_ptrm", "dummy".into()),
            ("sel_attr", "dummy".into()),
        ];

        for code in &self.subjects {
            params.push(("sel_subj", code.clone()));
        }

        params.extend([
            ("sel_crse", String::new()),
            ("sel_title", String::new()),
            ("sel_from_cred", String::new()),
            ("sel_to_cred", String::new()),
            ("sel_levl", "%".into()),
            ("sel_schd", "%".into()),
            ("sel_camp", "%".into()),
            ("sel_insm", "%".into()),
            ("sel_ptrm", "%".into()),
            ("sel_instr", "%".into()),
            ("sel_attr", "%".into()),
            ("begin_hh", "0".into()),
            ("begin_mi", "0".into()),
            ("begin_ap", "a".into()),
            ("end_hh", "0".into()),
            ("end_mi", "0".into()),
            ("end_ap", "a".into()),
        ]);

        params
    }
}

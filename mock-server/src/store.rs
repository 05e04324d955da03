//! In-memory TestRail data and the handlers for every supported API call.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::StatusCode;
use serde_json::{json, Map, Value};

pub type JsonObject = Map<String, Value>;
pub type Params = HashMap<String, String>;

/// An error answered as `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
}

impl ApiFailure {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn invalid(field: &str, entity: &str) -> Self {
        Self::bad_request(format!("Field :{field} is not a valid {entity}."))
    }

    fn required(field: &str) -> Self {
        Self::bad_request(format!("Field :{field} is a required field."))
    }
}

type Outcome = Result<Option<Value>, ApiFailure>;

/// Rows of one resource kind, with their own ID sequence.
#[derive(Debug, Default)]
pub struct Table {
    next_id: u64,
    rows: BTreeMap<u64, Value>,
}

impl Table {
    fn insert(&mut self, fields: JsonObject) -> Value {
        self.next_id += 1;
        let mut row = JsonObject::new();
        row.insert("id".to_string(), self.next_id.into());
        row.extend(fields);
        let row = Value::Object(row);
        self.rows.insert(self.next_id, row.clone());
        row
    }

    pub fn get(&self, id: u64) -> Option<&Value> {
        self.rows.get(&id)
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut Value> {
        self.rows.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn filter(&self, pred: impl Fn(&Value) -> bool) -> Vec<Value> {
        self.rows.values().filter(|row| pred(*row)).cloned().collect()
    }

    fn retain(&mut self, pred: impl Fn(&Value) -> bool) {
        self.rows.retain(|_, row| pred(row));
    }
}

#[derive(Debug, Default)]
pub struct Store {
    pub projects: Table,
    pub suites: Table,
    pub sections: Table,
    pub cases: Table,
    pub runs: Table,
    pub datasets: Table,
    pub results: Table,
}

impl Store {
    /// Execute one API call. `Ok(None)` is answered with an empty body.
    pub fn call(&mut self, action: &str, id: Option<u64>, params: &Params, body: JsonObject) -> Outcome {
        match action {
            "get_projects" => Ok(Some(page("projects", self.projects.filter(|_| true)))),
            "get_project" => self.get_project(id),
            "add_project" => self.add_project(body),
            "update_project" => self.update_project(id, body),
            "delete_project" => self.delete_project(id),

            "get_suite" => self.get_suite(id),
            "get_suites" => self.get_suites(id),

            "get_section" => self.get_section(id),
            "get_sections" => self.get_sections(id, params),
            "add_section" => self.add_section(id, body),
            "update_section" => self.update_section(id, body),
            "delete_section" => self.delete_section(id, params),
            "move_section" => self.move_section(id, body),

            "get_case" => self.get_case(id),
            "get_cases" => self.get_cases(id, params),
            "add_case" => self.add_case(id, body),
            "update_case" => self.update_case(id, body),
            "delete_case" => self.delete_case(id),

            "get_run" => self.get_run(id),
            "get_runs" => self.get_runs(id),
            "add_run" => self.add_run(id, body),
            "update_run" => self.update_run(id, body),
            "close_run" => self.close_run(id),
            "delete_run" => self.delete_run(id),

            "get_results" => self.get_results(id),
            "add_result" => self.add_result(id, body),

            "get_dataset" => self.get_dataset(id),
            "get_datasets" => self.get_datasets(id),
            "add_dataset" => self.add_dataset(id, body),
            "update_dataset" => self.update_dataset(id, body),
            "delete_dataset" => self.delete_dataset(id),

            other => Err(ApiFailure::bad_request(format!("Unknown method '{other}'"))),
        }
    }

    // --- projects ---

    fn project_id(&self, id: Option<u64>) -> Result<u64, ApiFailure> {
        let id = id.ok_or_else(|| ApiFailure::required("project_id"))?;
        match self.projects.get(id) {
            Some(_) => Ok(id),
            None => Err(ApiFailure::invalid("project_id", "or accessible project")),
        }
    }

    fn get_project(&self, id: Option<u64>) -> Outcome {
        let id = self.project_id(id)?;
        Ok(self.projects.get(id).cloned())
    }

    fn add_project(&mut self, body: JsonObject) -> Outcome {
        let name = required_str(&body, "name")?;
        let mut fields = object(json!({
            "name": name,
            "announcement": null,
            "show_announcement": false,
            "is_completed": false,
            "completed_on": null,
            "suite_mode": 1,
        }));
        merge_into(&mut fields, body, &["id", "is_completed", "completed_on"]);
        let project = self.projects.insert(fields);
        let project_id = id_of(&project);
        self.suites.insert(object(json!({
            "name": "Master",
            "description": null,
            "project_id": project_id,
            "is_master": true,
            "is_baseline": false,
            "is_completed": false,
        })));
        Ok(Some(project))
    }

    fn update_project(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let id = self.project_id(id)?;
        let project = self.projects.get_mut(id).map(|row| {
            merge(row, body, &["id"]);
            row.clone()
        });
        Ok(project)
    }

    fn delete_project(&mut self, id: Option<u64>) -> Outcome {
        let id = self.project_id(id)?;
        let suites: Vec<u64> = self
            .suites
            .filter(|s| field(s, "project_id") == Some(id))
            .iter()
            .map(id_of)
            .collect();
        self.projects.retain(|p| id_of(p) != id);
        self.suites.retain(|s| field(s, "project_id") != Some(id));
        self.sections.retain(|s| !in_suites(s, &suites));
        self.cases.retain(|c| !in_suites(c, &suites));
        self.runs.retain(|r| field(r, "project_id") != Some(id));
        self.datasets.retain(|d| field(d, "project_id") != Some(id));
        Ok(None)
    }

    // --- suites ---

    fn suite_id(&self, id: Option<u64>) -> Result<u64, ApiFailure> {
        let id = id.ok_or_else(|| ApiFailure::required("suite_id"))?;
        match self.suites.get(id) {
            Some(_) => Ok(id),
            None => Err(ApiFailure::invalid("suite_id", "test suite")),
        }
    }

    fn get_suite(&self, id: Option<u64>) -> Outcome {
        let id = self.suite_id(id)?;
        Ok(self.suites.get(id).cloned())
    }

    fn get_suites(&self, id: Option<u64>) -> Outcome {
        let project_id = self.project_id(id)?;
        Ok(Some(Value::Array(
            self.suites.filter(|s| field(s, "project_id") == Some(project_id)),
        )))
    }

    fn master_suite(&self, project_id: u64) -> Option<u64> {
        self.suites
            .filter(|s| field(s, "project_id") == Some(project_id))
            .first()
            .map(id_of)
    }

    /// Suite named in `body`/`params`, or the project's master suite.
    fn suite_for_project(&self, project_id: u64, requested: Option<u64>) -> Result<u64, ApiFailure> {
        match requested {
            Some(suite_id) => {
                let suite = self.suites.get(suite_id);
                match suite.and_then(|s| field(s, "project_id")) {
                    Some(owner) if owner == project_id => Ok(suite_id),
                    _ => Err(ApiFailure::invalid("suite_id", "test suite")),
                }
            }
            None => self
                .master_suite(project_id)
                .ok_or_else(|| ApiFailure::required("suite_id")),
        }
    }

    // --- sections ---

    fn section_id(&self, id: Option<u64>) -> Result<u64, ApiFailure> {
        let id = id.ok_or_else(|| ApiFailure::required("section_id"))?;
        match self.sections.get(id) {
            Some(_) => Ok(id),
            None => Err(ApiFailure::invalid("section_id", "section")),
        }
    }

    fn get_section(&self, id: Option<u64>) -> Outcome {
        let id = self.section_id(id)?;
        Ok(self.sections.get(id).cloned())
    }

    fn get_sections(&self, id: Option<u64>, params: &Params) -> Outcome {
        let project_id = self.project_id(id)?;
        let suite_id = param_u64(params, "suite_id", "test suite")?;
        let suite_id = self.suite_for_project(project_id, suite_id)?;
        Ok(Some(page(
            "sections",
            self.sections.filter(|s| field(s, "suite_id") == Some(suite_id)),
        )))
    }

    fn add_section(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let project_id = self.project_id(id)?;
        let name = required_str(&body, "name")?;
        let suite_id = self.suite_for_project(project_id, body_u64(&body, "suite_id"))?;
        let parent_id = body_u64(&body, "parent_id");
        let depth = match parent_id {
            Some(parent_id) => {
                let parent = self
                    .sections
                    .get(parent_id)
                    .filter(|p| field(p, "suite_id") == Some(suite_id))
                    .ok_or_else(|| ApiFailure::invalid("parent_id", "section"))?;
                field(parent, "depth").unwrap_or(0) + 1
            }
            None => 0,
        };
        let display_order = self.children(suite_id, parent_id).len() as u64 + 1;
        let section = self.sections.insert(object(json!({
            "suite_id": suite_id,
            "name": name,
            "description": body.get("description").cloned().unwrap_or(Value::Null),
            "parent_id": parent_id,
            "display_order": display_order,
            "depth": depth,
        })));
        Ok(Some(section))
    }

    fn update_section(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let id = self.section_id(id)?;
        let editable: JsonObject = body
            .into_iter()
            .filter(|(k, _)| k == "name" || k == "description")
            .collect();
        Ok(self.sections.get_mut(id).map(|row| {
            merge(row, editable, &[]);
            row.clone()
        }))
    }

    fn delete_section(&mut self, id: Option<u64>, params: &Params) -> Outcome {
        let id = self.section_id(id)?;
        let doomed = self.subtree(id);
        if params.get("soft").map(String::as_str) == Some("1") {
            let cases = self.cases.filter(|c| in_sections(c, &doomed)).len();
            return Ok(Some(json!({
                "deleted": false,
                "sections": doomed.len(),
                "cases": cases,
            })));
        }
        self.sections.retain(|s| !doomed.contains(&id_of(s)));
        self.cases.retain(|c| !in_sections(c, &doomed));
        Ok(None)
    }

    fn move_section(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let id = self.section_id(id)?;
        let (suite_id, old_parent, old_depth) = match self.sections.get(id) {
            Some(s) => (
                field(s, "suite_id").unwrap_or(0),
                parent_of(s),
                field(s, "depth").unwrap_or(0),
            ),
            None => return Err(ApiFailure::invalid("section_id", "section")),
        };
        let parent_id = body_u64(&body, "parent_id");
        let after_id = body_u64(&body, "after_id");

        let depth = match parent_id {
            Some(parent_id) => {
                if self.subtree(id).contains(&parent_id) {
                    return Err(ApiFailure::bad_request(
                        "Field :parent_id cannot be the section itself or one of its subsections.",
                    ));
                }
                let parent = self
                    .sections
                    .get(parent_id)
                    .filter(|p| field(p, "suite_id") == Some(suite_id))
                    .ok_or_else(|| ApiFailure::invalid("parent_id", "section"))?;
                field(parent, "depth").unwrap_or(0) + 1
            }
            None => 0,
        };

        let mut siblings = self.sibling_order(suite_id, parent_id, id);
        let position = match after_id {
            Some(after_id) => siblings
                .iter()
                .position(|s| *s == after_id)
                .map(|i| i + 1)
                .ok_or_else(|| ApiFailure::invalid("after_id", "section"))?,
            None => 0,
        };
        siblings.insert(position, id);

        for section_id in self.subtree(id) {
            if let Some(row) = self.sections.get_mut(section_id) {
                let below = field(row, "depth").unwrap_or(old_depth).saturating_sub(old_depth);
                row["depth"] = (depth + below).into();
            }
        }
        if let Some(row) = self.sections.get_mut(id) {
            row["parent_id"] = parent_id.map_or(Value::Null, Value::from);
        }
        if old_parent != parent_id {
            let left_behind = self.sibling_order(suite_id, old_parent, id);
            self.renumber(&left_behind);
        }
        self.renumber(&siblings);

        Ok(self.sections.get(id).cloned())
    }

    /// Sections under `parent_id` in display order, leaving out `except`.
    fn sibling_order(&self, suite_id: u64, parent_id: Option<u64>, except: u64) -> Vec<u64> {
        let mut siblings = self.children(suite_id, parent_id);
        siblings.retain(|s| id_of(s) != except);
        siblings.sort_by_key(|s| field(s, "display_order").unwrap_or(0));
        siblings.iter().map(id_of).collect()
    }

    fn renumber(&mut self, ordered: &[u64]) {
        for (index, section_id) in ordered.iter().enumerate() {
            if let Some(row) = self.sections.get_mut(*section_id) {
                row["display_order"] = (index as u64 + 1).into();
            }
        }
    }

    fn children(&self, suite_id: u64, parent_id: Option<u64>) -> Vec<Value> {
        self.sections
            .filter(|s| field(s, "suite_id") == Some(suite_id) && parent_of(s) == parent_id)
    }

    /// `root` and every section below it.
    fn subtree(&self, root: u64) -> Vec<u64> {
        let mut ids = vec![root];
        let mut cursor = 0;
        while cursor < ids.len() {
            let parent = ids[cursor];
            ids.extend(
                self.sections
                    .filter(|s| parent_of(s) == Some(parent))
                    .iter()
                    .map(id_of),
            );
            cursor += 1;
        }
        ids
    }

    // --- cases ---

    fn case_id(&self, id: Option<u64>) -> Result<u64, ApiFailure> {
        let id = id.ok_or_else(|| ApiFailure::required("case_id"))?;
        match self.cases.get(id) {
            Some(_) => Ok(id),
            None => Err(ApiFailure::invalid("case_id", "test case")),
        }
    }

    fn get_case(&self, id: Option<u64>) -> Outcome {
        let id = self.case_id(id)?;
        Ok(self.cases.get(id).cloned())
    }

    fn get_cases(&self, id: Option<u64>, params: &Params) -> Outcome {
        let project_id = self.project_id(id)?;
        let suite_id = param_u64(params, "suite_id", "test suite")?;
        let suite_id = self.suite_for_project(project_id, suite_id)?;
        Ok(Some(page(
            "cases",
            self.cases.filter(|c| field(c, "suite_id") == Some(suite_id)),
        )))
    }

    fn add_case(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let section_id = self.section_id(id)?;
        let title = required_str(&body, "title")?;
        let suite_id = self.sections.get(section_id).and_then(|s| field(s, "suite_id"));
        let mut fields = object(json!({
            "title": title,
            "section_id": section_id,
            "suite_id": suite_id,
            "template_id": 1,
            "type_id": 7,
            "priority_id": 2,
            "refs": null,
            "created_on": now(),
        }));
        merge_into(&mut fields, body, &["id", "section_id", "suite_id", "created_on"]);
        Ok(Some(self.cases.insert(fields)))
    }

    fn update_case(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let id = self.case_id(id)?;
        Ok(self.cases.get_mut(id).map(|row| {
            merge(row, body, &["id", "suite_id", "created_on"]);
            row["updated_on"] = now().into();
            row.clone()
        }))
    }

    fn delete_case(&mut self, id: Option<u64>) -> Outcome {
        let id = self.case_id(id)?;
        self.cases.retain(|c| id_of(c) != id);
        Ok(None)
    }

    // --- runs ---

    fn run_id(&self, id: Option<u64>) -> Result<u64, ApiFailure> {
        let id = id.ok_or_else(|| ApiFailure::required("run_id"))?;
        match self.runs.get(id) {
            Some(_) => Ok(id),
            None => Err(ApiFailure::invalid("run_id", "test run")),
        }
    }

    fn open_run(&mut self, id: Option<u64>) -> Result<&mut Value, ApiFailure> {
        let id = self.run_id(id)?;
        match self.runs.get_mut(id) {
            Some(run) if run["is_completed"] != Value::Bool(true) => Ok(run),
            _ => Err(ApiFailure::bad_request(
                "Field :run_id refers to a completed test run and cannot be edited.",
            )),
        }
    }

    fn get_run(&self, id: Option<u64>) -> Outcome {
        let id = self.run_id(id)?;
        Ok(self.runs.get(id).cloned())
    }

    fn get_runs(&self, id: Option<u64>) -> Outcome {
        let project_id = self.project_id(id)?;
        Ok(Some(page(
            "runs",
            self.runs.filter(|r| field(r, "project_id") == Some(project_id)),
        )))
    }

    fn add_run(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let project_id = self.project_id(id)?;
        let suite_id = self.suite_for_project(project_id, body_u64(&body, "suite_id"))?;
        let mut fields = object(json!({
            "suite_id": suite_id,
            "project_id": project_id,
            "name": "Test Run",
            "description": null,
            "include_all": true,
            "is_completed": false,
            "completed_on": null,
            "created_on": now(),
        }));
        merge_into(
            &mut fields,
            body,
            &["id", "suite_id", "project_id", "is_completed", "completed_on", "created_on"],
        );
        Ok(Some(self.runs.insert(fields)))
    }

    fn update_run(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let run = self.open_run(id)?;
        merge(
            run,
            body,
            &["id", "suite_id", "project_id", "is_completed", "completed_on", "created_on"],
        );
        Ok(Some(run.clone()))
    }

    fn close_run(&mut self, id: Option<u64>) -> Outcome {
        let run = self.open_run(id)?;
        run["is_completed"] = true.into();
        run["completed_on"] = now().into();
        Ok(Some(run.clone()))
    }

    fn delete_run(&mut self, id: Option<u64>) -> Outcome {
        let id = self.run_id(id)?;
        self.runs.retain(|r| id_of(r) != id);
        Ok(None)
    }

    // --- results ---

    fn get_results(&self, id: Option<u64>) -> Outcome {
        let test_id = id.ok_or_else(|| ApiFailure::required("test_id"))?;
        let mut results = self.results.filter(|r| field(r, "test_id") == Some(test_id));
        results.reverse();
        Ok(Some(page("results", results)))
    }

    fn add_result(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let test_id = id.ok_or_else(|| ApiFailure::required("test_id"))?;
        if !["status_id", "comment", "elapsed", "defects"]
            .iter()
            .any(|key| body.get(*key).is_some_and(|v| !v.is_null()))
        {
            return Err(ApiFailure::bad_request(
                "Field :status_id, :comment, :elapsed or :defects must be specified.",
            ));
        }
        let mut fields = object(json!({
            "test_id": test_id,
            "status_id": null,
            "comment": null,
            "created_on": now(),
        }));
        merge_into(&mut fields, body, &["id", "test_id", "created_on"]);
        Ok(Some(self.results.insert(fields)))
    }

    // --- datasets ---

    fn dataset_id(&self, id: Option<u64>) -> Result<u64, ApiFailure> {
        let id = id.ok_or_else(|| ApiFailure::required("dataset_id"))?;
        match self.datasets.get(id) {
            Some(_) => Ok(id),
            None => Err(ApiFailure::invalid("dataset_id", "dataset")),
        }
    }

    fn get_dataset(&self, id: Option<u64>) -> Outcome {
        let id = self.dataset_id(id)?;
        Ok(self.datasets.get(id).cloned())
    }

    fn get_datasets(&self, id: Option<u64>) -> Outcome {
        let project_id = self.project_id(id)?;
        Ok(Some(page(
            "datasets",
            self.datasets.filter(|d| field(d, "project_id") == Some(project_id)),
        )))
    }

    fn add_dataset(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let project_id = self.project_id(id)?;
        let name = required_str(&body, "name")?;
        let mut fields = object(json!({
            "project_id": project_id,
            "name": name,
            "variables": [],
        }));
        merge_into(&mut fields, body, &["id", "project_id"]);
        Ok(Some(self.datasets.insert(fields)))
    }

    fn update_dataset(&mut self, id: Option<u64>, body: JsonObject) -> Outcome {
        let id = self.dataset_id(id)?;
        Ok(self.datasets.get_mut(id).map(|row| {
            merge(row, body, &["id", "project_id"]);
            row.clone()
        }))
    }

    fn delete_dataset(&mut self, id: Option<u64>) -> Outcome {
        let id = self.dataset_id(id)?;
        self.datasets.retain(|d| id_of(d) != id);
        Ok(None)
    }
}

/// Paginated list envelope used by the bulk endpoints.
fn page(key: &str, items: Vec<Value>) -> Value {
    let mut envelope = object(json!({
        "offset": 0,
        "limit": 250,
        "size": items.len(),
        "_links": {"next": null, "prev": null},
    }));
    envelope.insert(key.to_string(), Value::Array(items));
    Value::Object(envelope)
}

fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

fn id_of(row: &Value) -> u64 {
    field(row, "id").unwrap_or(0)
}

fn field(row: &Value, key: &str) -> Option<u64> {
    row.get(key).and_then(Value::as_u64)
}

fn parent_of(row: &Value) -> Option<u64> {
    field(row, "parent_id")
}

fn body_u64(body: &JsonObject, key: &str) -> Option<u64> {
    body.get(key).and_then(Value::as_u64)
}

fn in_suites(row: &Value, suites: &[u64]) -> bool {
    field(row, "suite_id").is_some_and(|s| suites.contains(&s))
}

fn in_sections(row: &Value, sections: &[u64]) -> bool {
    field(row, "section_id").is_some_and(|s| sections.contains(&s))
}

fn required_str(body: &JsonObject, key: &str) -> Result<String, ApiFailure> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiFailure::required(key))
}

fn param_u64(params: &Params, key: &str, entity: &str) -> Result<Option<u64>, ApiFailure> {
    params
        .get(key)
        .map(|raw| raw.parse::<u64>().map_err(|_| ApiFailure::invalid(key, entity)))
        .transpose()
}

/// Copy `body` into `row`, skipping `protected` keys.
fn merge(row: &mut Value, body: JsonObject, protected: &[&str]) {
    if let Some(fields) = row.as_object_mut() {
        merge_into(fields, body, protected);
    }
}

fn merge_into(fields: &mut JsonObject, body: JsonObject, protected: &[&str]) {
    for (key, value) in body {
        if !protected.contains(&key.as_str()) {
            fields.insert(key, value);
        }
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

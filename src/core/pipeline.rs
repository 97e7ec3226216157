use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::utils::io;

/// A CI workflow file: triggers plus the job graph.
#[derive(Debug, Clone, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "on")]
    pub triggers: Value,
    #[serde(default)]
    pub jobs: BTreeMap<String, JobSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub runs_on: Option<Value>,
    #[serde(default)]
    pub needs: Needs,
    #[serde(default)]
    pub strategy: Option<Strategy>,
    #[serde(default)]
    pub continue_on_error: Option<Value>,
    #[serde(default, rename = "if")]
    pub condition: Option<String>,
}

/// `needs:` accepts a single job id or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Needs {
    One(String),
    Many(Vec<String>),
}

impl Default for Needs {
    fn default() -> Self {
        Needs::Many(Vec::new())
    }
}

impl Needs {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Needs::One(id) => vec![id.clone()],
            Needs::Many(ids) => ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Strategy {
    #[serde(default)]
    pub matrix: Option<Mapping>,
    #[serde(default)]
    pub fail_fast: Option<bool>,
}

impl JobSpec {
    /// Whether a failure of this job is tolerated (`continue-on-error: true`).
    ///
    /// Expressions are not evaluated and count as not tolerated.
    pub fn tolerates_failure(&self) -> bool {
        match &self.continue_on_error {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => s.trim() == "true",
            _ => false,
        }
    }
}

// =============================================================================
// Plan
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobInstance {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub matrix: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedJob {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    pub tolerates_failure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub instances: Vec<JobInstance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub index: usize,
    pub jobs: Vec<PlannedJob>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    pub triggers: Vec<String>,
    pub stages: Vec<Stage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Workflow {
    pub fn parse(content: &str) -> Result<Self> {
        serde_yml::from_str(content).map_err(|e| Error::pipeline_invalid(None, e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = io::read_file(path, &format!("read {}", path.display()))?;
        serde_yml::from_str(&content).map_err(|e| {
            Error::pipeline_invalid(Some(path.to_string_lossy().to_string()), e.to_string())
        })
    }

    /// Names of the events that trigger the workflow.
    pub fn trigger_names(&self) -> Vec<String> {
        match &self.triggers {
            Value::String(event) => vec![event.clone()],
            Value::Sequence(events) => events.iter().filter_map(scalar_to_string).collect(),
            Value::Mapping(events) => events.keys().filter_map(scalar_to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// One instance per matrix combination, axes in declaration order.
    pub fn expand_job(&self, id: &str) -> Result<(Vec<JobInstance>, Vec<String>)> {
        let job = self
            .jobs
            .get(id)
            .ok_or_else(|| Error::pipeline_unknown_job(id, None))?;
        let display = job.name.clone().unwrap_or_else(|| id.to_string());

        let Some(matrix) = job.strategy.as_ref().and_then(|s| s.matrix.as_ref()) else {
            return Ok((
                vec![JobInstance {
                    name: display,
                    matrix: BTreeMap::new(),
                }],
                Vec::new(),
            ));
        };

        let mut warnings = Vec::new();
        let mut axes: Vec<(String, Vec<String>)> = Vec::new();
        for (key, values) in matrix {
            let Some(key) = scalar_to_string(key) else {
                continue;
            };
            if key == "include" || key == "exclude" {
                warnings.push(format!("Job '{}': matrix {} is not expanded", id, key));
                continue;
            }
            let values = match values {
                Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
                other => {
                    warnings.push(format!(
                        "Job '{}': matrix axis '{}' is not a list; using it as a single value",
                        id, key
                    ));
                    scalar_to_string(other).into_iter().collect()
                }
            };
            axes.push((key, values));
        }

        let combinations = cartesian(&axes);
        let instances = combinations
            .into_iter()
            .map(|combo| {
                let label = combo
                    .iter()
                    .map(|(_, v)| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                JobInstance {
                    name: if label.is_empty() {
                        display.clone()
                    } else {
                        format!("{} ({})", display, label)
                    },
                    matrix: combo.into_iter().collect(),
                }
            })
            .collect();

        Ok((instances, warnings))
    }

    /// Topological layers over `needs`. Jobs in a layer are sorted by id.
    pub fn stages(&self) -> Result<Vec<Vec<String>>> {
        let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for id in self.jobs.keys() {
            indegree.entry(id.as_str()).or_insert(0);
        }

        for (id, job) in &self.jobs {
            for need in job.needs.to_vec() {
                let Some((parent, _)) = self.jobs.get_key_value(&need) else {
                    return Err(Error::pipeline_unknown_job(need, Some(id.clone())));
                };
                *indegree.entry(id.as_str()).or_insert(0) += 1;
                dependents
                    .entry(parent.as_str())
                    .or_default()
                    .push(id.as_str());
            }
        }

        let mut layers = Vec::new();
        let mut ready: Vec<&str> = indegree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut placed = 0usize;

        while !ready.is_empty() {
            ready.sort_unstable();
            let mut next = Vec::new();
            for id in &ready {
                for child in dependents.get(id).into_iter().flatten() {
                    if let Some(count) = indegree.get_mut(child) {
                        *count -= 1;
                        if *count == 0 {
                            next.push(*child);
                        }
                    }
                }
            }
            placed += ready.len();
            layers.push(ready.iter().map(|id| id.to_string()).collect());
            ready = next;
        }

        if placed != self.jobs.len() {
            let pending = indegree
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            return Err(Error::pipeline_cycle(pending));
        }

        Ok(layers)
    }

    pub fn plan(&self) -> Result<Plan> {
        let mut warnings = Vec::new();
        let mut stages = Vec::new();

        for (index, layer) in self.stages()?.into_iter().enumerate() {
            let mut jobs = Vec::with_capacity(layer.len());
            for id in layer {
                let spec = &self.jobs[&id];
                let (instances, job_warnings) = self.expand_job(&id)?;
                warnings.extend(job_warnings);
                jobs.push(PlannedJob {
                    needs: spec.needs.to_vec(),
                    tolerates_failure: spec.tolerates_failure(),
                    condition: spec.condition.clone(),
                    instances,
                    id,
                });
            }
            stages.push(Stage { index, jobs });
        }

        Ok(Plan {
            workflow: self.name.clone(),
            triggers: self.trigger_names(),
            stages,
            warnings,
        })
    }
}

// =============================================================================
// Conclusion
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

impl std::str::FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" | "pass" | "passed" => Ok(Outcome::Success),
            "failure" | "fail" | "failed" => Ok(Outcome::Failure),
            other => Err(Error::validation_invalid_argument(
                "outcome",
                "expected success or failure",
                Some(other.to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failure,
    ToleratedFailure,
    Skipped,
}

impl JobStatus {
    /// Whether dependents may run after this job.
    fn lets_dependents_run(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::ToleratedFailure)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConclusion {
    pub id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conclusion {
    pub success: bool,
    pub jobs: Vec<JobConclusion>,
}

impl Plan {
    fn job(&self, key: &str) -> Option<&PlannedJob> {
        self.stages
            .iter()
            .flat_map(|s| &s.jobs)
            .find(|job| job.id == key || job.instances.iter().any(|i| i.name == key))
    }

    /// Conclude the run from reported outcomes.
    ///
    /// Keys are job ids or instance names. Jobs with no reported outcome are
    /// taken as successful. A job fails if any of its reported outcomes failed.
    pub fn conclude(&self, outcomes: &HashMap<String, Outcome>) -> Result<Conclusion> {
        for key in outcomes.keys() {
            if self.job(key).is_none() {
                return Err(Error::pipeline_unknown_job(key.clone(), None));
            }
        }

        let mut statuses: HashMap<&str, JobStatus> = HashMap::new();
        let mut jobs = Vec::new();

        for job in self.stages.iter().flat_map(|s| &s.jobs) {
            let blocked_by = job
                .needs
                .iter()
                .find(|need| {
                    !statuses
                        .get(need.as_str())
                        .copied()
                        .is_some_and(JobStatus::lets_dependents_run)
                })
                .cloned();

            let (status, reason) = if let Some(need) = blocked_by {
                (
                    JobStatus::Skipped,
                    Some(format!("Skipped because '{}' did not succeed", need)),
                )
            } else {
                let failed = std::iter::once(job.id.as_str())
                    .chain(job.instances.iter().map(|i| i.name.as_str()))
                    .any(|key| outcomes.get(key) == Some(&Outcome::Failure));
                match (failed, job.tolerates_failure) {
                    (false, _) => (JobStatus::Success, None),
                    (true, true) => (
                        JobStatus::ToleratedFailure,
                        Some("Failure tolerated by continue-on-error".to_string()),
                    ),
                    (true, false) => (JobStatus::Failure, None),
                }
            };

            statuses.insert(job.id.as_str(), status);
            jobs.push(JobConclusion {
                id: job.id.clone(),
                status,
                reason,
            });
        }

        let success = !jobs.iter().any(|j| j.status == JobStatus::Failure);
        Ok(Conclusion { success, jobs })
    }
}

fn cartesian(axes: &[(String, Vec<String>)]) -> Vec<Vec<(String, String)>> {
    let mut combos: Vec<Vec<(String, String)>> = vec![Vec::new()];
    for (key, values) in axes {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in values {
                let mut extended = combo.clone();
                extended.push((key.clone(), value.clone()));
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

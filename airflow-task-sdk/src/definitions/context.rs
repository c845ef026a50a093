cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
    } else {
        extern crate alloc;
        use alloc::string::String;
        use alloc::string::ToString;
    }
}

use airflow_common::models::UniqueTaskInstanceId;

/// The context a task instance executes in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    id: UniqueTaskInstanceId,
    dag_id: String,
    task_id: String,
    run_id: String,
    try_number: usize,
    map_index: Option<usize>,
}

impl Context {
    pub fn new(id: UniqueTaskInstanceId, dag_id: &str, task_id: &str, run_id: &str) -> Self {
        Context {
            id,
            dag_id: dag_id.to_string(),
            task_id: task_id.to_string(),
            run_id: run_id.to_string(),
            try_number: 1,
            map_index: None,
        }
    }

    pub fn with_try_number(mut self, try_number: usize) -> Self {
        self.try_number = try_number;
        self
    }

    pub fn with_map_index(mut self, map_index: Option<usize>) -> Self {
        self.map_index = map_index;
        self
    }

    pub fn id(&self) -> &UniqueTaskInstanceId {
        &self.id
    }

    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn try_number(&self) -> usize {
        self.try_number
    }

    /// The map index of a mapped task instance, `None` if the task is not mapped.
    pub fn map_index(&self) -> Option<usize> {
        self.map_index
    }
}

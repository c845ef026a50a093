/// The unique id of a task instance, as assigned by the Airflow API server.
pub type UniqueTaskInstanceId = uuid::Uuid;

use serde::Deserialize;

use crate::store::SortOrder;

#[derive(Deserialize)]
pub struct CreateTask {
    pub text: String,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct ListTasks {
    #[serde(default)]
    pub order: SortOrder,
}

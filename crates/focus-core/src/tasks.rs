//! Task list

use chrono::{DateTime, Local};
use focus_api::Task;
use focus_util::TaskId;

use crate::TransitionError;

#[derive(Debug, Clone, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Append a task. Surrounding whitespace is trimmed; empty text is refused.
    pub fn add(&mut self, text: &str, now: DateTime<Local>) -> Result<Task, TransitionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TransitionError::InvalidInput("task text is empty".into()));
        }

        let last = self.tasks.iter().map(|t| t.id).max();
        let task = Task {
            id: TaskId::allocate(now, last),
            text: text.to_string(),
            completed: false,
            created_at: now,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn toggle(&mut self, id: TaskId) -> Result<Task, TransitionError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TransitionError::TaskNotFound(id))?;
        task.completed = !task.completed;
        Ok(task.clone())
    }

    pub fn remove(&mut self, id: TaskId) -> Result<Task, TransitionError> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TransitionError::TaskNotFound(id))?;
        Ok(self.tasks.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn add_trims_and_rejects_empty() {
        let mut list = TaskList::default();
        let task = list.add("  write report ", now()).unwrap();
        assert_eq!(task.text, "write report");
        assert!(!task.completed);

        assert!(matches!(list.add("   ", now()), Err(TransitionError::InvalidInput(_))));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn ids_are_unique_within_a_millisecond() {
        let mut list = TaskList::default();
        let a = list.add("a", now()).unwrap();
        let b = list.add("b", now()).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn toggle_and_remove() {
        let mut list = TaskList::default();
        let task = list.add("a", now()).unwrap();

        assert!(list.toggle(task.id).unwrap().completed);
        assert!(!list.toggle(task.id).unwrap().completed);

        list.remove(task.id).unwrap();
        assert!(list.is_empty());
        assert!(matches!(
            list.remove(task.id),
            Err(TransitionError::TaskNotFound(_))
        ));
    }
}

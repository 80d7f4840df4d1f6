// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generic to-do tasks at `users/{uid}/tasks`.

use crate::db::{to_document_data, DocumentPath, DocumentStore};
use crate::error::AppError;
use crate::models::{NewTask, Task, TaskUpdate};
use crate::services::scope::OwnerScope;
use crate::services::status::TaskListFilter;
use crate::services::subscription::Subscription;
use crate::time_utils::now_rfc3339;
use std::cmp::Ordering;
use std::sync::Arc;
use validator::Validate;

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn DocumentStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn task_doc(scope: &OwnerScope, id: &str) -> DocumentPath {
        scope.tasks().doc(id)
    }

    pub async fn create(&self, scope: &OwnerScope, new: NewTask) -> Result<Task, AppError> {
        let mut task = new.into_task(&now_rfc3339())?;
        task.id = self
            .store
            .create(&scope.tasks(), to_document_data(&task)?)
            .await?;
        tracing::info!(uid = %scope, task_id = %task.id, "Task created");
        Ok(task)
    }

    pub async fn get(&self, scope: &OwnerScope, id: &str) -> Result<Option<Task>, AppError> {
        self.store
            .get(&Self::task_doc(scope, id))
            .await?
            .map(|doc| doc.into_model())
            .transpose()
    }

    /// Open tasks first by due date (undated last); completed tasks are
    /// included only when the filter asks for them.
    pub async fn list(
        &self,
        scope: &OwnerScope,
        filter: &TaskListFilter,
    ) -> Result<Vec<Task>, AppError> {
        let mut tasks = self
            .store
            .list(&scope.tasks(), None)
            .await?
            .into_iter()
            .map(|doc| doc.into_model::<Task>())
            .collect::<Result<Vec<_>, _>>()?;

        tasks.retain(|task| filter.includes_completed_flag(task.completed));
        tasks.sort_by(task_order);
        Ok(tasks)
    }

    pub async fn update(
        &self,
        scope: &OwnerScope,
        id: &str,
        mut update: TaskUpdate,
    ) -> Result<Task, AppError> {
        update.validate()?;
        update.updated_at = Some(now_rfc3339());

        self.store
            .update(&Self::task_doc(scope, id), to_document_data(&update)?)
            .await?;
        tracing::debug!(uid = %scope, task_id = %id, "Task updated");

        self.get(scope, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {}", id)))
    }

    /// Toggle the completed flag. Unlike maintenance tasks, generic tasks can
    /// be reopened.
    pub async fn set_completed(
        &self,
        scope: &OwnerScope,
        id: &str,
        completed: bool,
    ) -> Result<Task, AppError> {
        let update = TaskUpdate {
            completed: Some(completed),
            ..Default::default()
        };
        self.update(scope, id, update).await
    }

    pub async fn delete(&self, scope: &OwnerScope, id: &str) -> Result<(), AppError> {
        let doc = Self::task_doc(scope, id);
        if self.store.get(&doc).await?.is_none() {
            return Err(AppError::NotFound(format!("Task {}", id)));
        }
        self.store.delete(&doc).await?;
        tracing::info!(uid = %scope, task_id = %id, "Task deleted");
        Ok(())
    }

    /// Live list of all tasks, completed included.
    pub async fn subscribe(&self, scope: &OwnerScope) -> Result<Subscription<Task>, AppError> {
        let feed = self.store.watch(&scope.tasks(), None).await?;
        let service = self.clone();
        let owner = scope.clone();
        Ok(Subscription::spawn(
            format!("tasks:{}", scope),
            feed,
            move || {
                let service = service.clone();
                let owner = owner.clone();
                async move {
                    service
                        .list(&owner, &TaskListFilter::show_completed())
                        .await
                }
            },
        ))
    }
}

fn task_order(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::NaiveDate;

    fn service() -> TaskService {
        TaskService::new(Arc::new(MemoryStore::new()))
    }

    fn new_task(title: &str, due: Option<NaiveDate>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            due_date: due,
            vehicle_id: None,
        }
    }

    #[tokio::test]
    async fn test_set_completed_and_filter() {
        let tasks = service();
        let scope = OwnerScope::new("u1").unwrap();
        let a = tasks
            .create(&scope, new_task("Wash", None))
            .await
            .unwrap();
        tasks
            .create(&scope, new_task("Registration", NaiveDate::from_ymd_opt(2024, 9, 30)))
            .await
            .unwrap();

        let done = tasks.set_completed(&scope, &a.id, true).await.unwrap();
        assert!(done.completed);

        let open = tasks.list(&scope, &TaskListFilter::default()).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].title, "Registration");

        let all = tasks
            .list(&scope, &TaskListFilter::show_completed())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].title, "Wash");

        let reopened = tasks.set_completed(&scope, &a.id, false).await.unwrap();
        assert!(!reopened.completed);
    }

    #[tokio::test]
    async fn test_tasks_are_owner_scoped() {
        let tasks = service();
        let ann = OwnerScope::new("ann").unwrap();
        let bob = OwnerScope::new("bob").unwrap();
        let task = tasks.create(&ann, new_task("Wash", None)).await.unwrap();

        assert!(tasks.get(&bob, &task.id).await.unwrap().is_none());
        assert!(matches!(
            tasks.delete(&bob, &task.id).await,
            Err(AppError::NotFound(_))
        ));
        tasks.delete(&ann, &task.id).await.unwrap();
        assert!(tasks.get(&ann, &task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscription_sees_new_tasks() {
        let tasks = service();
        let scope = OwnerScope::new("u1").unwrap();
        let mut sub = tasks.subscribe(&scope).await.unwrap();

        assert_eq!(sub.next_snapshot().await.unwrap().len(), 0);
        tasks.create(&scope, new_task("Wash", None)).await.unwrap();
        assert_eq!(sub.next_snapshot().await.unwrap().len(), 1);

        sub.unsubscribe();
    }
}

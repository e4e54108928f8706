use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Error, Result};
use taskboard_app::filter_util::parse_visibility;
use taskboard_app::{
    AssigneePatch, AuditLogEntry, CreateTaskRequest, DemoAuthService, DemoBackend, DuePatch, FilterBuildError,
    ProjectConfig, Session, TaskError, TaskFilterBuilder, TaskGateway, TaskQuery, TaskStore, TaskUpdate, parse_due,
};
use taskboard_core::{Task, TaskFilter, TaskId, TaskPriority, TaskSort, TaskStats, TaskStatus, User, UserId};
use taskboard_store_fs::FileStorage;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{Command, LsFormat};

type Storage = Arc<FileStorage>;

/// Everything a command needs, wired from the data directory.
struct App {
    config: ProjectConfig,
    session: Session<DemoAuthService, Storage>,
    gateway: TaskGateway<DemoBackend<Storage>>,
}

impl App {
    fn open(data_dir: &Path) -> Result<Self> {
        let config = ProjectConfig::from_data_dir(data_dir)?;
        let storage = Arc::new(
            FileStorage::open(data_dir)
                .with_context(|| format!("failed to open data directory {}", data_dir.display()))?,
        );
        let options = config.demo_options()?;
        let backend = DemoBackend::open(Arc::clone(&storage), options).context("failed to load demo data")?;
        let store = TaskStore::with_sort(config.view.sort());
        let gateway = TaskGateway::with_store(backend, config.deployment()?, store);
        let session = Session::new(DemoAuthService::new(options.latency), storage);
        Ok(Self {
            config,
            session,
            gateway,
        })
    }

    async fn actor(&self) -> Result<User> {
        self.session.verify().await.map_err(user_facing)
    }

    /// Surface a task operation result, logging out when the backend rejected the session.
    fn checked<T>(&self, result: Result<T, TaskError>) -> Result<T> {
        self.session.guard(result).map_err(user_facing)
    }

    /// Load a task into the store so it can be mutated.
    async fn load(&self, actor: &User, raw: &str) -> Result<TaskId> {
        let id = parse_task_id(raw)?;
        self.checked(self.gateway.fetch(actor, &id).await)?;
        Ok(id)
    }
}

pub async fn run(command: Command, data_dir: &Path) -> Result<()> {
    let app = App::open(data_dir)?;
    match command {
        Command::Login { email, password } => {
            let user = app.session.login(&email, &password).await.map_err(user_facing)?;
            println!("logged in as {} <{}> ({})", user.name, user.email, user.role);
        }
        Command::Logout => {
            app.session.logout().await.map_err(user_facing)?;
            println!("logged out");
        }
        Command::Whoami => {
            let user = app.actor().await?;
            println!("{} <{}> id={} role={}", user.name, user.email, user.id, user.role);
        }
        Command::Ls {
            statuses,
            priorities,
            tags,
            assignee,
            author,
            visibility,
            text,
            sort,
            page,
            limit,
            format,
        } => {
            let actor = app.actor().await?;
            let filter = TaskFilterBuilder::new()
                .with_statuses(&statuses)
                .and_then(|builder| builder.with_priorities(&priorities))
                .and_then(|builder| builder.with_assignee(assignee.as_deref(), Some(&actor.id)))
                .and_then(|builder| builder.with_visibility(visibility.as_deref()))
                .map_err(filter_error)?
                .with_tags(&tags)
                .with_created_by(author.map(UserId::from))
                .with_text(text)
                .build();
            let sort = match sort {
                Some(raw) => TaskSort::from_str(&raw).with_context(|| format!("invalid sort '{raw}'"))?,
                None => app.config.view.sort(),
            };
            handle_ls(&app, &actor, filter, sort, page, limit, format).await?;
        }
        Command::Show { task } => {
            let actor = app.actor().await?;
            let id = parse_task_id(&task)?;
            let task = app.checked(app.gateway.fetch(&actor, &id).await)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        Command::Stats => {
            let actor = app.actor().await?;
            let query = TaskQuery {
                limit: Some(usize::MAX),
                ..TaskQuery::default()
            };
            app.checked(app.gateway.refresh(&actor, &query).await)?;
            let stats = app.gateway.store().stats(OffsetDateTime::now_utc());
            render_stats(&stats, app.gateway.profile().statuses());
        }
        Command::New {
            title,
            description,
            status,
            priority,
            tags,
            due,
            assignee,
            visibility,
        } => {
            let actor = app.actor().await?;
            let mut request = CreateTaskRequest::new(title);
            request.description = description.unwrap_or_default();
            request.status = status.as_deref().map(parse_status).transpose()?;
            if let Some(priority) = priority.as_deref() {
                request.priority = parse_priority(priority)?;
            }
            request.tags = tags;
            request.due_date = due.as_deref().map(|raw| parse_due("due date", raw)).transpose().map_err(filter_error)?;
            request.assignee_id = assignee.map(UserId::from);
            request.visibility = visibility.as_deref().map(parse_visibility).transpose().map_err(filter_error)?;

            let task = app.checked(app.gateway.create(&actor, request).await)?;
            println!("created task: {} ({})", task.id, task.title);
        }
        Command::Edit {
            task,
            title,
            description,
            priority,
            tags,
            clear_tags,
            due,
            clear_due,
            assignee,
            unassign,
            visibility,
        } => {
            let actor = app.actor().await?;
            let id = app.load(&actor, &task).await?;
            let update = TaskUpdate {
                title,
                description,
                status: None,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                tags: if clear_tags {
                    Some(Vec::new())
                } else {
                    (!tags.is_empty()).then_some(tags)
                },
                due_date: if clear_due {
                    Some(DuePatch::Clear)
                } else {
                    due.as_deref()
                        .map(|raw| parse_due("due date", raw).map(DuePatch::Set))
                        .transpose()
                        .map_err(filter_error)?
                },
                assignee: if unassign {
                    Some(AssigneePatch::Clear)
                } else {
                    assignee.map(|user| AssigneePatch::Set(UserId::from(user)))
                },
                visibility: visibility.as_deref().map(parse_visibility).transpose().map_err(filter_error)?,
            };
            let task = app.checked(app.gateway.update(&actor, &id, &update).await)?;
            println!("updated task: {} ({})", task.id, task.title);
        }
        Command::Status { task, status } => {
            let actor = app.actor().await?;
            let status = parse_status(&status)?;
            let id = app.load(&actor, &task).await?;
            let task = app.checked(app.gateway.change_status(&actor, &id, status).await)?;
            println!("task {} is now {}", task.id, task.status.label());
        }
        Command::Rm { task } => {
            let actor = app.actor().await?;
            let id = app.load(&actor, &task).await?;
            app.checked(app.gateway.delete(&actor, &id).await)?;
            println!("deleted task: {id}");
        }
        Command::Audit { format } => {
            let actor = app.actor().await?;
            let entries = app.checked(app.gateway.audit_log(&actor).await)?;
            match format {
                LsFormat::Table => render_audit_table(&entries)?,
                LsFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            }
        }
        Command::Reset => {
            app.gateway.backend().reset().await?;
            println!("demo data reset to defaults");
        }
    }

    Ok(())
}

async fn handle_ls(
    app: &App,
    actor: &User,
    filter: TaskFilter,
    sort: TaskSort,
    page: Option<usize>,
    limit: Option<usize>,
    format: LsFormat,
) -> Result<()> {
    let query = TaskQuery {
        filter: filter.clone(),
        sort: Some(sort),
        page,
        limit: limit.or(Some(app.config.view.page_size)),
    };
    let report = app.checked(app.gateway.refresh(actor, &query).await)?;
    let filter_empty = filter.is_empty();
    let tasks = {
        let mut store = app.gateway.store_mut();
        store.set_filter(filter);
        store.set_sort(sort);
        store.visible()
    };

    if tasks.is_empty() {
        if filter_empty {
            println!("No tasks found");
        } else {
            println!("No tasks matched the provided filters");
        }
        return Ok(());
    }

    match format {
        LsFormat::Table => {
            render_task_table(&tasks, actor);
            println!(
                "page {}/{} ({} tasks)",
                report.page,
                report.total_pages.max(1),
                report.total
            );
        }
        LsFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
    }
    Ok(())
}

fn render_task_table(tasks: &[Task], actor: &User) {
    println!("ID | Status | Priority | Title | Tags | Assignee | Due");
    println!("-- | ------ | -------- | ----- | ---- | -------- | ---");

    let now = OffsetDateTime::now_utc();
    for task in tasks {
        let tags = if task.tags.is_empty() {
            "-".to_owned()
        } else {
            task.tags.join(", ")
        };
        let assignee = match &task.assignee_id {
            Some(id) if *id == actor.id => format!("{id} (me)"),
            Some(id) => id.to_string(),
            None => "-".to_owned(),
        };
        let due = task.due_date.map_or_else(
            || "-".to_owned(),
            |due| {
                if task.is_overdue(now) {
                    format!("{} (overdue)", due.date())
                } else {
                    due.date().to_string()
                }
            },
        );

        println!(
            "{} | {} | {} | {} | {} | {} | {}",
            task.id,
            task.status.label(),
            task.priority,
            task.title,
            tags,
            assignee,
            due
        );
    }
}

fn render_stats(stats: &TaskStats, statuses: &[TaskStatus]) {
    println!("Total: {}", stats.total);
    println!("Overdue: {}", stats.overdue);
    println!();
    for status in statuses {
        println!("{:<12} {}", status.label(), stats.status_count(*status));
    }
    // Tasks stored under a status the profile no longer offers.
    for (status, count) in &stats.by_status {
        if !statuses.contains(status) {
            println!("{:<12} {count}", status.label());
        }
    }
    println!();
    for priority in TaskPriority::ALL.iter().rev() {
        println!("{:<12} {}", priority.as_str(), stats.priority_count(*priority));
    }
}

fn render_audit_table(entries: &[AuditLogEntry]) -> Result<()> {
    if entries.is_empty() {
        println!("Audit log is empty");
        return Ok(());
    }
    println!("Time | Action | Task | User | Changes");
    println!("---- | ------ | ---- | ---- | -------");
    for entry in entries {
        println!(
            "{} | {} | {} | {} | {}",
            entry.timestamp.format(&Rfc3339)?,
            entry.action.as_str(),
            entry.entity_id,
            entry.user_name,
            entry.changes
        );
    }
    Ok(())
}

fn user_facing(err: TaskError) -> Error {
    let message = err.describe_user_facing();
    Error::new(err).context(message)
}

fn filter_error(err: FilterBuildError) -> Error {
    let message = err.describe_user_facing();
    Error::new(err).context(message)
}

fn parse_task_id(raw: &str) -> Result<TaskId> {
    TaskId::from_str(raw.trim()).with_context(|| format!("Invalid task id: {raw}"))
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    TaskStatus::from_str(raw).with_context(|| format!("Invalid status: {raw}"))
}

fn parse_priority(raw: &str) -> Result<TaskPriority> {
    TaskPriority::from_str(raw).with_context(|| format!("Invalid priority: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use taskboard_app::DEMO_PASSWORD;
    use taskboard_store_fs::KeyValueStore;
    use tempfile::{TempDir, tempdir};

    fn data_dir() -> Result<TempDir> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.toml"), "[demo]\nlatency_scale = 0.0\n")?;
        Ok(dir)
    }

    async fn login(dir: &Path, email: &str) -> Result<()> {
        run(
            Command::Login {
                email: email.into(),
                password: DEMO_PASSWORD.into(),
            },
            dir,
        )
        .await
    }

    fn stored_tasks(dir: &Path) -> Result<Vec<Task>> {
        let storage = FileStorage::open(dir)?;
        Ok(storage.get_json("mockTasks")?.unwrap_or_default())
    }

    #[tokio::test]
    async fn commands_require_login() -> Result<()> {
        let dir = data_dir()?;
        let err = run(Command::Whoami, dir.path())
            .await
            .err()
            .unwrap_or_else(|| panic!("whoami without login must fail"));
        assert!(err.to_string().contains("log in again"));
        Ok(())
    }

    #[tokio::test]
    async fn owner_creates_edits_and_deletes() -> Result<()> {
        let dir = data_dir()?;
        login(dir.path(), "owner@example.com").await?;

        run(
            Command::New {
                title: "Write release notes".into(),
                description: None,
                status: None,
                priority: Some("urgent".into()),
                tags: vec!["docs".into()],
                due: Some("2030-01-01".into()),
                assignee: Some("2".into()),
                visibility: None,
            },
            dir.path(),
        )
        .await?;
        let tasks = stored_tasks(dir.path())?;
        assert_eq!(tasks.len(), 7);
        let created = tasks[0].clone();
        assert_eq!(created.priority, TaskPriority::Urgent);

        run(
            Command::Status {
                task: created.id.to_string(),
                status: "in progress".into(),
            },
            dir.path(),
        )
        .await?;
        run(
            Command::Edit {
                task: created.id.to_string(),
                title: None,
                description: Some("Cover the new CLI".into()),
                priority: None,
                tags: Vec::new(),
                clear_tags: false,
                due: None,
                clear_due: true,
                assignee: None,
                unassign: true,
                visibility: None,
            },
            dir.path(),
        )
        .await?;
        let edited = stored_tasks(dir.path())?
            .into_iter()
            .find(|task| task.id == created.id)
            .unwrap_or_else(|| panic!("created task must persist"));
        assert_eq!(edited.status, TaskStatus::InProgress);
        assert_eq!(edited.description, "Cover the new CLI");
        assert!(edited.due_date.is_none());
        assert!(edited.assignee_id.is_none());

        run(
            Command::Rm {
                task: created.id.to_string(),
            },
            dir.path(),
        )
        .await?;
        assert_eq!(stored_tasks(dir.path())?.len(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn viewer_cannot_delete() -> Result<()> {
        let dir = data_dir()?;
        login(dir.path(), "viewer@example.com").await?;
        let err = run(Command::Rm { task: "1".into() }, dir.path())
            .await
            .err()
            .unwrap_or_else(|| panic!("viewer delete must fail"));
        assert!(err.to_string().contains("does not allow you to delete tasks"));
        assert_eq!(stored_tasks(dir.path())?.len(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn logout_forgets_session() -> Result<()> {
        let dir = data_dir()?;
        login(dir.path(), "admin@example.com").await?;
        run(Command::Whoami, dir.path()).await?;
        run(Command::Logout, dir.path()).await?;
        assert!(run(Command::Whoami, dir.path()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn reset_restores_samples() -> Result<()> {
        let dir = data_dir()?;
        login(dir.path(), "owner@example.com").await?;
        run(Command::Rm { task: "1".into() }, dir.path()).await?;
        assert_eq!(stored_tasks(dir.path())?.len(), 5);
        run(Command::Reset, dir.path()).await?;
        assert_eq!(stored_tasks(dir.path())?.len(), 6);
        Ok(())
    }
}
